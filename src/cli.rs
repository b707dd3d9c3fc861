//! Command-line interface definitions.
//!
//! Every option can also come from the environment. Options given here override the
//! values from the YAML configuration file.

use crate::config::{FeedConfig, WindowPolicy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which phases of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Merge the snapshot into the archive only.
    Archive,
    /// Rebuild the daily digest from the stored archive only.
    Daily,
    /// Archive first, then digest.
    Both,
}

impl Mode {
    pub fn runs_archive(self) -> bool {
        matches!(self, Mode::Archive | Mode::Both)
    }

    pub fn runs_daily(self) -> bool {
        matches!(self, Mode::Daily | Mode::Both)
    }
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Update the archive and the digest with the default file names
/// newsfeed_archiver
///
/// # Only rebuild the digest, using the lookback policy
/// newsfeed_archiver --mode daily --window-policy lookback
///
/// # Everything from a config file, with a different snapshot
/// newsfeed_archiver -c feeds.yaml --html-file snapshots/opinion.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Phases to run
    #[arg(short, long, value_enum, default_value_t = Mode::Both, env = "FEED_MODE")]
    pub mode: Mode,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Saved HTML snapshot of the listing page
    #[arg(long, env = "FEED_HTML_FILE")]
    pub html_file: Option<PathBuf>,

    /// Archive RSS file
    #[arg(long, env = "FEED_ARCHIVE_FILE")]
    pub archive_file: Option<PathBuf>,

    /// Path prefix for digest files (`<prefix>.xml`, `<prefix>_2.xml`, ...)
    #[arg(long, env = "FEED_DAILY_PREFIX")]
    pub daily_prefix: Option<PathBuf>,

    /// Watermark JSON file
    #[arg(long, env = "FEED_WATERMARK_FILE")]
    pub watermark_file: Option<PathBuf>,

    /// How the digest decides which articles are new
    #[arg(long, value_enum, env = "FEED_WINDOW_POLICY")]
    pub window_policy: Option<WindowPolicy>,
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut FeedConfig) {
        if let Some(path) = &self.html_file {
            config.paths.html_file = path.clone();
        }
        if let Some(path) = &self.archive_file {
            config.paths.archive_file = path.clone();
        }
        if let Some(path) = &self.daily_prefix {
            config.paths.daily_prefix = path.clone();
        }
        if let Some(path) = &self.watermark_file {
            config.paths.watermark_file = path.clone();
        }
        if let Some(policy) = self.window_policy {
            config.window_policy = policy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["newsfeed_archiver"]);
        assert_eq!(cli.mode, Mode::Both);
        assert!(cli.config.is_none());
        assert!(cli.window_policy.is_none());
    }

    #[test]
    fn test_cli_mode_selection() {
        let cli = Cli::parse_from(["newsfeed_archiver", "--mode", "daily"]);
        assert_eq!(cli.mode, Mode::Daily);
        assert!(cli.mode.runs_daily());
        assert!(!cli.mode.runs_archive());

        let cli = Cli::parse_from(["newsfeed_archiver", "-m", "archive"]);
        assert!(cli.mode.runs_archive());
        assert!(!cli.mode.runs_daily());

        assert!(Mode::Both.runs_archive() && Mode::Both.runs_daily());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "newsfeed_archiver",
            "--archive-file",
            "/tmp/articles.xml",
            "--daily-prefix",
            "/tmp/daily",
            "--window-policy",
            "lookback",
        ]);
        let mut config = FeedConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.paths.archive_file, PathBuf::from("/tmp/articles.xml"));
        assert_eq!(config.paths.daily_prefix, PathBuf::from("/tmp/daily"));
        assert_eq!(config.paths.html_file, PathBuf::from("opinion.html"));
        assert_eq!(config.window_policy, WindowPolicy::Lookback);
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["newsfeed_archiver", "--mode", "weekly"]).is_err());
    }
}
