//! Core data types for features, outcomes, and run bookkeeping.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};

/// Search endpoint used to turn a coordinate pair into a navigable URL.
pub const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// A GPX waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
}

impl Waypoint {
    /// The maps search URL for this waypoint's coordinates.
    pub fn maps_url(&self) -> String {
        format!("{MAPS_SEARCH_URL}?api=1&query={},{}", self.lat, self.lon)
    }
}

/// One place to import.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// A fully formed place URL, as found in GeoJSON exports.
    Url { url: String },
    /// A coordinate pair with a display name, as found in GPX files.
    Waypoint(Waypoint),
}

impl Feature {
    pub fn url(url: impl Into<String>) -> Self {
        Feature::Url { url: url.into() }
    }

    /// The URL the browser is sent to for this feature.
    pub fn target_url(&self) -> String {
        match self {
            Feature::Url { url } => url.clone(),
            Feature::Waypoint(wpt) => wpt.maps_url(),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Url { url } => write!(f, "{url}"),
            Feature::Waypoint(wpt) => write!(f, "{} ({}, {})", wpt.name, wpt.lat, wpt.lon),
        }
    }
}

/// Input file format, decided from the file extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    GeoJson,
    Gpx,
}

impl SourceFormat {
    /// Detect the format of `path` without touching the filesystem.
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") | Some("geojson") => Ok(SourceFormat::GeoJson),
            Some("gpx") => Ok(SourceFormat::Gpx),
            _ => Err(ImportError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::GeoJson => write!(f, "GeoJSON"),
            SourceFormat::Gpx => write!(f, "GPX"),
        }
    }
}

/// Parsed features in source order, tagged with the format they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureList {
    pub format: SourceFormat,
    pub features: Vec<Feature>,
}

impl FeatureList {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// The classified result of one save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
    AlreadyAdded,
    UnknownError,
}

impl Outcome {
    /// Single-character status marker used in progress lines.
    pub fn glyph(self) -> &'static str {
        match self {
            Outcome::Success => "\u{2713}",
            Outcome::Failure => "\u{2717}",
            Outcome::AlreadyAdded => "-",
            Outcome::UnknownError => "?",
        }
    }
}

/// What the run does with each feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    DryRun,
    Compare,
    Apply,
}

impl Mode {
    /// Resolve the mode from the two command-line switches.
    pub fn from_flags(dry_run: bool, compare: bool) -> ImportResult<Self> {
        match (dry_run, compare) {
            (true, true) => Err(ImportError::ConflictingModes),
            (true, false) => Ok(Mode::DryRun),
            (false, true) => Ok(Mode::Compare),
            (false, false) => Ok(Mode::Apply),
        }
    }

    /// Whether this mode needs a live browser session.
    pub fn needs_browser(self) -> bool {
        !matches!(self, Mode::DryRun)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::DryRun => write!(f, "dry-run"),
            Mode::Compare => write!(f, "compare"),
            Mode::Apply => write!(f, "apply"),
        }
    }
}

/// Saved-places list picked from the save menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetList {
    Starred,
    WantToGo,
}

impl TargetList {
    /// `data-index` of this list's entry in the save menu.
    pub fn menu_index(self) -> u32 {
        match self {
            TargetList::WantToGo => 1,
            TargetList::Starred => 2,
        }
    }
}

/// Per-outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub success: usize,
    pub failure: usize,
    pub already_added: usize,
    pub unknown_error: usize,
}

impl RunTally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Failure => self.failure += 1,
            Outcome::AlreadyAdded => self.already_added += 1,
            Outcome::UnknownError => self.unknown_error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.already_added + self.unknown_error
    }
}
