//! Human-readable iteration logs.
//!
//! Structured events always go through `tracing`. The text lines below are
//! extra, produced only when [`LogOptions::enable`] is set, and written to
//! the [`LogSink`] in the options (or `tracing::info!` without one).

use std::fmt;
use std::sync::Arc;

/// Destination for log lines.
#[derive(Clone)]
pub struct LogSink(Arc<dyn Fn(&str) + Send + Sync>);

impl LogSink {
    pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        LogSink(Arc::new(f))
    }

    pub fn write(&self, line: &str) {
        (self.0)(line)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogSink(..)")
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogOptions {
    /// Emit one text line per iteration plus a summary.
    pub enable: bool,
    /// Append the parameter rendering to each line.
    pub print_x: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub sink: Option<LogSink>,
}

impl LogOptions {
    pub fn enabled() -> Self {
        LogOptions {
            enable: true,
            ..LogOptions::default()
        }
    }

    pub fn with_sink(sink: LogSink) -> Self {
        LogOptions {
            enable: true,
            print_x: false,
            sink: Some(sink),
        }
    }

    pub(crate) fn emit(&self, line: impl FnOnce() -> String) {
        if !self.enable {
            return;
        }
        let line = line();
        match &self.sink {
            Some(sink) => sink.write(&line),
            None => tracing::info!(target: "numbat_optim", "{line}"),
        }
    }
}

/// Lossy `f64` view for formatting generic floats.
pub(crate) fn f64_of<F: num_traits::ToPrimitive>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
