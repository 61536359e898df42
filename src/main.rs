//! jrpc - JSON-RPC 2.0 client
//!
//! Command-line usage:
//!   jrpc -e <uri> call <method> [--params JSON] [--id ID]
//!   jrpc -e <uri> notify <method> [--params JSON]
//!   jrpc -e <uri> batch <file|->

use jrpc::cli::run_cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if !run_cli().await? {
        std::process::exit(1);
    }
    Ok(())
}
