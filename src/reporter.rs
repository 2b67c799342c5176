use tracing::Level;

/// Sink for progress and failure messages emitted by the orchestrator.
pub trait Reporter: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::ERROR, message);
    }
}

/// Forwards reports to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            _ => tracing::trace!("{}", message),
        }
    }
}
