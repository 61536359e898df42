//! `jrpc` command-line front end

pub mod batch_file;
pub mod cli_app;

pub use batch_file::{parse_batch, BatchEntry};
pub use cli_app::{run_cli, Cli, Command};
