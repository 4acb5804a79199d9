//! Saved places importer: core library for replaying exported places as
//! save actions against a maps web app.

pub mod bookmarks;
pub mod channel;
pub mod classify;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod source;
pub mod timing;
pub mod types;

pub use bookmarks::{fetch_bookmarks, parse_bookmarks, BookmarkSet, DEFAULT_BOOKMARKS_URL};
pub use channel::{ClickResult, ControlState, DetachedChannel, UiChannel};
pub use classify::{ClassifierSettings, OutcomeClassifier};
pub use error::{ChannelError, ErrorKind, ImportError, ImportResult};
pub use reconcile::{Operator, Position, Reconciler, RunContext, RunReport};
pub use report::{Level, MemoryReporter, Reporter, SharedReporter};
pub use source::{load_features, parse_geo_json, parse_gpx};
pub use timing::{Timing, TimingSummary};
pub use types::*;
