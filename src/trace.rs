//! Trace output for the expansion pipeline.
//!
//! The engine never touches process-wide state: callers pass a
//! [`TraceSink`] into the entry point explicitly, and the default is a
//! no-op. The CLI installs a [`StderrTrace`] driven by `-v` flags.

/// How much detail a sink receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TraceLevel {
    /// Results only, no intermediate stages.
    #[default]
    Normal,
    /// Per-stage summaries (flattened/evaluated/merged counts, dropped records).
    Detailed,
    /// Per-node flattening steps.
    Debugging,
}

/// Receives trace events from the engine.
pub trait TraceSink {
    /// Emit one message at the given level.
    fn emit(&self, level: TraceLevel, message: &str);

    /// Emit a stage-level summary.
    fn detailed(&self, message: &str) {
        self.emit(TraceLevel::Detailed, message);
    }

    /// Emit a per-node debugging message.
    fn debugging(&self, message: &str) {
        self.emit(TraceLevel::Debugging, message);
    }
}

/// Discards every event. The engine default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn emit(&self, _level: TraceLevel, _message: &str) {}
}

/// Prints events at or below a threshold level to stderr.
#[derive(Debug, Clone, Copy)]
pub struct StderrTrace {
    level: TraceLevel,
}

impl StderrTrace {
    pub fn new(level: TraceLevel) -> Self {
        Self { level }
    }
}

impl TraceSink for StderrTrace {
    fn emit(&self, level: TraceLevel, message: &str) {
        if level <= self.level {
            let prefix = match level {
                TraceLevel::Normal => "",
                TraceLevel::Detailed => "   · ",
                TraceLevel::Debugging => "   ·· ",
            };
            eprintln!("{}{}", prefix, message);
        }
    }
}
