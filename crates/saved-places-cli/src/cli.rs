//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use saved_places::{ImportResult, Mode, TargetList};

use crate::app::ImportOptions;
use crate::config::{load_config, resolve_config_path, Config};

#[derive(Parser, Debug)]
#[command(
    name = "saved-places",
    about = "Import GeoJSON / GPX places as saved places in a logged-in browser",
    version
)]
pub struct Cli {
    /// Exported places (.json / .geojson / .gpx).
    pub import_file: Option<PathBuf>,

    /// List what would be imported without touching the browser.
    #[arg(long)]
    pub dry_run: bool,

    /// List the places that are not saved yet.
    #[arg(long)]
    pub compare: bool,

    /// Open each place and wait for Enter instead of clicking save.
    #[arg(long)]
    pub interactive: bool,

    /// List to save places into.
    #[arg(long, value_enum)]
    pub list: Option<ListArg>,

    /// Path to a JSON config file.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Remote debugging host.
    #[arg(long)]
    pub host: Option<String>,

    /// Remote debugging port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the config and whether the browser can be reached.
    Doctor,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   saved-places completions bash > ~/.local/share/bash-completion/completions/saved-places
    ///   saved-places completions zsh > ~/.zfunc/_saved-places
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListArg {
    Starred,
    WantToGo,
}

impl From<ListArg> for TargetList {
    fn from(arg: ListArg) -> Self {
        match arg {
            ListArg::Starred => TargetList::Starred,
            ListArg::WantToGo => TargetList::WantToGo,
        }
    }
}

impl Cli {
    /// Import options, if a file was given.
    pub fn import_options(&self) -> Option<ImportOptions> {
        let import_file = self.import_file.clone()?;
        Some(ImportOptions {
            import_file,
            dry_run: self.dry_run,
            compare: self.compare,
            interactive: self.interactive,
        })
    }

    pub fn target_list(&self) -> Option<TargetList> {
        self.list.map(TargetList::from)
    }

    /// Resolve and load the effective config, with flag overrides applied.
    ///
    /// For an import run the mode flags are checked first, so conflicting
    /// flags are reported without any config file being looked up.
    pub fn load_config(&self) -> ImportResult<(Option<PathBuf>, Config)> {
        if self.command.is_none() {
            Mode::from_flags(self.dry_run, self.compare)?;
        }
        let path = resolve_config_path(self.config.as_deref());
        let config = load_config(path.as_deref())?.with_overrides(
            self.host.clone(),
            self.port,
            self.target_list(),
        );
        Ok((path, config))
    }
}
