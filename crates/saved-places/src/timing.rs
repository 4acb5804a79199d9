//! Run timing: total wall time plus one interim per save attempt.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;

use crate::report::{Level, SharedReporter};

#[derive(Debug, Clone, Copy)]
enum Interim {
    Running(Instant),
    Finished(Duration),
}

/// Result of [`Timing::summary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub total: Duration,
    pub interim_average: Duration,
    pub interim_count: usize,
}

/// Non-nesting interim timer.
///
/// Calling `start_interim` twice without `stop_interim` in between restarts
/// the open interim; the first start is lost.
pub struct Timing {
    start: Instant,
    interim_counter: usize,
    interims: BTreeMap<usize, Interim>,
    reporter: SharedReporter,
}

impl Timing {
    pub fn new(reporter: SharedReporter) -> Self {
        reporter.emit(
            Level::DEBUG,
            &format!(" > [TIMING] Start: {}", Local::now().to_rfc3339()),
        );
        Self {
            start: Instant::now(),
            interim_counter: 0,
            interims: BTreeMap::new(),
            reporter,
        }
    }

    pub fn start_interim(&mut self) {
        self.interims
            .insert(self.interim_counter, Interim::Running(Instant::now()));
    }

    /// Close the open interim and return its duration.
    pub fn stop_interim(&mut self) -> Option<Duration> {
        let slot = self.interims.get_mut(&self.interim_counter);
        let Some(interim) = slot else {
            tracing::warn!("stop_interim called without an open interim");
            return None;
        };
        let Interim::Running(started) = *interim else {
            return None;
        };

        let elapsed = started.elapsed();
        *interim = Interim::Finished(elapsed);
        self.interim_counter += 1;
        self.reporter.emit(
            Level::DEBUG,
            &format!(
                " > [TIMING] Interim {}: {:.6} s",
                self.interim_counter,
                elapsed.as_secs_f64()
            ),
        );
        Some(elapsed)
    }

    pub fn interim_count(&self) -> usize {
        self.interim_counter
    }

    /// Total elapsed time and the mean interim; logs both.
    pub fn summary(&self) -> TimingSummary {
        let total = self.start.elapsed();
        let finished: Duration = self
            .interims
            .values()
            .filter_map(|i| match i {
                Interim::Finished(d) => Some(*d),
                Interim::Running(_) => None,
            })
            .sum();
        let interim_average = u32::try_from(self.interim_counter)
            .ok()
            .and_then(|n| finished.checked_div(n))
            .unwrap_or_default();

        self.reporter.emit(
            Level::DEBUG,
            &format!(" > [TIMING] Stop: {}", Local::now().to_rfc3339()),
        );
        self.reporter.emit(
            Level::INFO,
            &format!(" > [TIMING] {:.6} total time [s] elapsed", total.as_secs_f64()),
        );
        self.reporter.emit(
            Level::INFO,
            &format!(
                " > [TIMING] {:.6} time [s] per bookmark / place",
                interim_average.as_secs_f64()
            ),
        );

        TimingSummary {
            total,
            interim_average,
            interim_count: self.interim_counter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    #[tokio::test(start_paused = true)]
    async fn test_zero_interims_average_is_zero() {
        let reporter = MemoryReporter::new();
        let timing = Timing::new(reporter.clone());
        tokio::time::advance(Duration::from_secs(3)).await;

        let summary = timing.summary();
        assert_eq!(summary.interim_count, 0);
        assert_eq!(summary.interim_average, Duration::ZERO);
        assert_eq!(summary.total, Duration::from_secs(3));
        assert!(reporter.contains("0.000000 time [s] per bookmark / place"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interim_average() {
        let reporter = MemoryReporter::new();
        let mut timing = Timing::new(reporter.clone());

        timing.start_interim();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(timing.stop_interim(), Some(Duration::from_secs(2)));

        timing.start_interim();
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(timing.stop_interim(), Some(Duration::from_secs(4)));

        let summary = timing.summary();
        assert_eq!(summary.interim_count, 2);
        assert_eq!(summary.interim_average, Duration::from_secs(3));
        assert_eq!(summary.total, Duration::from_secs(6));
        assert_eq!(reporter.lines_at(Level::INFO).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_start_overwrites_open_interim() {
        let reporter = MemoryReporter::new();
        let mut timing = Timing::new(reporter);

        timing.start_interim();
        tokio::time::advance(Duration::from_secs(5)).await;
        timing.start_interim();
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(timing.stop_interim(), Some(Duration::from_secs(1)));
        assert_eq!(timing.interim_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_start_records_nothing() {
        let reporter = MemoryReporter::new();
        let mut timing = Timing::new(reporter);

        assert_eq!(timing.stop_interim(), None);
        timing.start_interim();
        timing.stop_interim();
        assert_eq!(timing.stop_interim(), None);
        assert_eq!(timing.interim_count(), 1);
    }
}
