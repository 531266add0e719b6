//! Diagnostic logging setup.
//!
//! Everything goes to stderr. Stdout belongs to the response stream and is
//! never touched by the subscriber or the panic hook.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::io::{self, IsTerminal};

use clap::ValueEnum;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Diagnostic line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human readable single lines.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Install the global stderr subscriber. Call once at startup.
///
/// `filter` uses `EnvFilter` syntax, e.g. `warn` or `posprinter=debug`.
pub fn initialise(filter: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Log panics to the diagnostic stream and keep the backtrace for the
/// error response of the request that panicked.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(panic = %info, "request handler panicked");
        LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(format!("{info}\n{backtrace}")));
    }));
}

/// Take the trace recorded by the last panic on this thread.
pub fn take_panic_trace() -> Option<String> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}
