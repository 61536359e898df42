//! Logger collaborator handed to the client at construction time.
//!
//! The engine never logs through an implicit global. It holds a [`Logger`]
//! that is either a no-op (the default), the process-wide `log` backend, or
//! a caller-supplied `log::Log` sink.

use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Record};

/// Log target used for every record the client emits
pub const TARGET: &str = "jrpc";

#[derive(Clone, Default)]
enum Sink {
    #[default]
    Noop,
    Global,
    Custom(Arc<dyn Log>),
}

#[derive(Clone, Default)]
pub struct Logger {
    sink: Sink,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match self.sink {
            Sink::Noop => "noop",
            Sink::Global => "global",
            Sink::Custom(_) => "custom",
        };
        f.debug_struct("Logger").field("sink", &sink).finish()
    }
}

impl Logger {
    /// Discard everything
    pub fn noop() -> Self {
        Self { sink: Sink::Noop }
    }

    /// Forward to whatever backend is installed for the `log` facade
    pub fn global() -> Self {
        Self { sink: Sink::Global }
    }

    /// Forward to `sink`
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self {
            sink: Sink::Custom(sink),
        }
    }

    fn backend(&self) -> Option<&dyn Log> {
        match &self.sink {
            Sink::Noop => None,
            Sink::Global => Some(log::logger()),
            Sink::Custom(sink) => Some(sink.as_ref()),
        }
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let Some(backend) = self.backend() else {
            return;
        };
        let metadata = log::Metadata::builder().level(level).target(TARGET).build();
        if !backend.enabled(&metadata) {
            return;
        }
        backend.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}
