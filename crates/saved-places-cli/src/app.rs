//! One import run, from the command-line options to the final summary.

use std::path::PathBuf;

use saved_places::{
    fetch_bookmarks, load_features, BookmarkSet, DetachedChannel, ErrorKind, ImportError,
    ImportResult, Level, Mode, Operator, OutcomeClassifier, Reconciler, RunContext, RunReport,
    SharedReporter, SourceFormat, Timing, UiChannel,
};

use crate::browser::Connector;
use crate::config::Config;

/// The switches that shape a run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub import_file: PathBuf,
    pub dry_run: bool,
    pub compare: bool,
    pub interactive: bool,
}

/// Run an import end to end.
///
/// Flag and extension checks happen before the file is touched, and the
/// browser is only contacted when the mode needs it and there is work to do.
pub async fn run_import(
    opts: &ImportOptions,
    config: &Config,
    connector: &dyn Connector,
    operator: &mut dyn Operator,
    reporter: SharedReporter,
) -> ImportResult<RunReport> {
    reporter.emit(Level::INFO, " > Start of Saved Places Importer");
    tracing::debug!(?opts, endpoint = %config.endpoint.http_url(), "run options");

    let mode = Mode::from_flags(opts.dry_run, opts.compare)?;
    SourceFormat::from_path(&opts.import_file)?;

    let list = load_features(&opts.import_file)?;
    if list.is_empty() {
        reporter.emit(Level::WARN, " > No features to import found \u{2717}");
    } else {
        reporter.emit(
            Level::INFO,
            &format!(" > Found {} features to import \u{2713}", list.len()),
        );
    }

    let mut timing = Timing::new(reporter.clone());

    let (mut channel, bookmarks): (Box<dyn UiChannel>, BookmarkSet) =
        if mode.needs_browser() && !list.is_empty() {
            let mut channel = connector.connect(&config.endpoint).await?;
            let bookmarks = fetch_bookmarks(channel.as_mut(), &config.bookmarks_url).await?;
            reporter.emit(
                Level::INFO,
                &format!(" > Found {} existing bookmarks", bookmarks.len()),
            );
            (channel, bookmarks)
        } else {
            (Box::new(DetachedChannel), BookmarkSet::new())
        };

    let classifier = OutcomeClassifier::new(config.classifier.clone(), reporter.clone());
    let ctx = RunContext {
        bookmarks: &bookmarks,
        channel: channel.as_mut(),
        classifier: &classifier,
        operator,
        timing: &mut timing,
    };
    let report = Reconciler::new(mode, ctx, reporter.clone())
        .interactive(opts.interactive)
        .run(&list)
        .await?;

    timing.summary();
    Ok(report)
}

/// The single `[ERROR]` line printed for a fatal error.
pub fn describe_error(err: &ImportError) -> String {
    match err.kind() {
        ErrorKind::Configuration | ErrorKind::Input | ErrorKind::Channel => {
            format!(" > [ERROR] {err}")
        }
        ErrorKind::ChannelUnavailable => format!(
            " > [ERROR] {err}; start the browser with '--remote-debugging-port' and log in first"
        ),
    }
}
