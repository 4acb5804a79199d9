//! Reconciliation driver: walks the feature list once and hands each
//! feature to the handler for the run's [`Mode`].

use std::fmt;

use async_trait::async_trait;

use crate::bookmarks::BookmarkSet;
use crate::channel::UiChannel;
use crate::classify::OutcomeClassifier;
use crate::error::ImportResult;
use crate::report::{Level, SharedReporter};
use crate::timing::Timing;
use crate::types::{Feature, FeatureList, Mode, Outcome, RunTally, SourceFormat};

/// Blocks until a human has dealt with the page currently shown.
#[async_trait]
pub trait Operator: Send {
    async fn confirm(&mut self, feature: &Feature) -> ImportResult<()>;
}

/// 1-based progress position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub total: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:3}/{}", self.index, self.total)
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub mode: Mode,
    pub total: usize,
    pub tally: RunTally,
    /// Features listed as still missing in compare mode.
    pub reported: usize,
    /// Features the operator confirmed by hand.
    pub interactive_visits: usize,
    /// Features that went through the classifier.
    pub attempts: usize,
}

/// Borrowed collaborators for one run.
pub struct RunContext<'a> {
    pub bookmarks: &'a BookmarkSet,
    pub channel: &'a mut dyn UiChannel,
    pub classifier: &'a OutcomeClassifier,
    pub operator: &'a mut dyn Operator,
    pub timing: &'a mut Timing,
}

pub struct Reconciler<'a> {
    mode: Mode,
    interactive: bool,
    ctx: RunContext<'a>,
    reporter: SharedReporter,
    tally: RunTally,
    reported: usize,
    interactive_visits: usize,
    attempts: usize,
}

impl<'a> Reconciler<'a> {
    pub fn new(mode: Mode, ctx: RunContext<'a>, reporter: SharedReporter) -> Self {
        Self {
            mode,
            interactive: false,
            ctx,
            reporter,
            tally: RunTally::default(),
            reported: 0,
            interactive_visits: 0,
            attempts: 0,
        }
    }

    /// Confirm every place by hand instead of clicking the save control.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub async fn run(mut self, list: &FeatureList) -> ImportResult<RunReport> {
        let total = list.len();

        if self.mode == Mode::Compare && list.format == SourceFormat::Gpx {
            self.info(" > [COMPARE] Compare not supported for GPX mode");
            return Ok(self.into_report(total));
        }

        for (i, feature) in list.features.iter().enumerate() {
            let position = Position { index: i + 1, total };
            match self.mode {
                Mode::DryRun => self.dry_run_one(position, feature),
                Mode::Compare => self.compare_one(position, feature),
                Mode::Apply => self.apply_one(position, feature).await?,
            }
        }

        self.summarise(total);
        Ok(self.into_report(total))
    }

    fn dry_run_one(&mut self, position: Position, feature: &Feature) {
        self.info(&format!(" > [DRY RUN] {position} {feature}"));
    }

    fn compare_one(&mut self, position: Position, feature: &Feature) {
        let saved = match feature {
            Feature::Url { url } => self.ctx.bookmarks.contains(url),
            Feature::Waypoint(_) => false,
        };
        if saved {
            self.tally.record(Outcome::AlreadyAdded);
        } else {
            self.reported += 1;
            self.info(&format!(" > [COMPARE] {position} {feature}"));
        }
    }

    async fn apply_one(&mut self, position: Position, feature: &Feature) -> ImportResult<()> {
        match feature {
            Feature::Url { url } if !self.interactive => {
                let outcome = if self.ctx.bookmarks.contains(url) {
                    Outcome::AlreadyAdded
                } else {
                    self.attempt(url).await?
                };
                self.tally.record(outcome);
                self.reporter.emit(
                    Level::DEBUG,
                    &format!(" > {position} {} {feature}", outcome.glyph()),
                );
                Ok(())
            }
            Feature::Url { .. } | Feature::Waypoint(_) => {
                self.visit_interactively(position, feature).await
            }
        }
    }

    async fn attempt(&mut self, url: &str) -> ImportResult<Outcome> {
        self.attempts += 1;
        self.ctx.timing.start_interim();
        let result = self.ctx.classifier.classify(&mut *self.ctx.channel, url).await;
        self.ctx.timing.stop_interim();
        Ok(result?)
    }

    async fn visit_interactively(
        &mut self,
        position: Position,
        feature: &Feature,
    ) -> ImportResult<()> {
        self.reporter
            .emit(Level::DEBUG, &format!(" > {position} {feature}"));
        self.ctx.channel.navigate(&feature.target_url()).await?;
        self.ctx.operator.confirm(feature).await?;
        self.interactive_visits += 1;
        Ok(())
    }

    fn summarise(&self, total: usize) {
        match self.mode {
            Mode::DryRun => {}
            Mode::Compare => {
                let saved = self.tally.already_added;
                if saved == total {
                    self.info(" > All bookmarks / places already added / saved!");
                } else {
                    self.info(&format!(
                        " > {saved} bookmarks / places already added / saved"
                    ));
                    self.info(&format!(
                        " > {} bookmarks / places need to be added / saved",
                        total - saved
                    ));
                }
            }
            Mode::Apply => {
                self.info(" > Summary:");
                self.info(&format!(" > Success: {:3}", self.tally.success));
                self.info(&format!(" > Failure: {:3}", self.tally.failure));
                self.info(&format!(
                    " > Already added: {:3}",
                    self.tally.already_added
                ));
                self.info(&format!(
                    " > Unknown error: {:3}",
                    self.tally.unknown_error
                ));
            }
        }
    }

    fn info(&self, line: &str) {
        self.reporter.emit(Level::INFO, line);
    }

    fn into_report(self, total: usize) -> RunReport {
        RunReport {
            mode: self.mode,
            total,
            tally: self.tally,
            reported: self.reported,
            interactive_visits: self.interactive_visits,
            attempts: self.attempts,
        }
    }
}
