//! Routes run output into the tracing subscriber.

use saved_places::{Level, Reporter};

/// Emits every report line as a tracing event at the same level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&self, level: Level, line: &str) {
        if level == Level::ERROR {
            tracing::error!("{line}");
        } else if level == Level::WARN {
            tracing::warn!("{line}");
        } else if level == Level::INFO {
            tracing::info!("{line}");
        } else if level == Level::DEBUG {
            tracing::debug!("{line}");
        } else {
            tracing::trace!("{line}");
        }
    }
}
