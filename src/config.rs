//! Run configuration.
//!
//! Every limit and window the pipeline uses lives in [`FeedConfig`] and is handed to
//! each component when it is built. Values come from the built-in defaults, then an
//! optional YAML file, then command-line overrides (see [`crate::cli::Cli::apply`]).
//!
//! ```yaml
//! max_items: 1000
//! max_items_per_daily: 100
//! window_policy: lookback
//! lookback_hours: 48
//! paths:
//!   archive_file: /srv/feeds/articles.xml
//! ```

use crate::error::ConfigError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Upper bound for any configured window, in hours (about one hundred years).
pub const MAX_WINDOW_HOURS: i64 = 100 * 366 * 24;

/// How the digest decides which archive records are new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    /// Strictly newer than the last-seen timestamp (or the default window when
    /// there is none).
    #[default]
    Cutoff,
    /// Re-examine a trailing window before the last-seen timestamp and skip
    /// links that were already emitted.
    Lookback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Archive capacity; the oldest inserted records are dropped beyond this.
    pub max_items: usize,
    /// Capacity of a single digest file.
    pub max_items_per_daily: usize,
    /// Window used by the cutoff policy when no watermark exists yet.
    pub default_window_hours: i64,
    /// Trailing window re-examined by the lookback policy.
    pub lookback_hours: i64,
    /// How long emitted links are remembered by the lookback policy.
    pub link_retention_days: i64,
    pub window_policy: WindowPolicy,
    /// Write an empty `<prefix>_2.xml` when the digest fits in one file.
    pub write_empty_overflow: bool,
    pub channel: ChannelConfig,
    pub paths: PathsConfig,
}

/// Channel metadata written into every generated feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub site_link: String,
    pub site_name: String,
    pub archive_title: String,
    pub archive_description: String,
    pub daily_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Saved HTML snapshot of the listing page.
    pub html_file: PathBuf,
    pub archive_file: PathBuf,
    /// Digest files are written as `<prefix>.xml`, `<prefix>_2.xml`, ...
    pub daily_prefix: PathBuf,
    pub watermark_file: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_items: 1000,
            max_items_per_daily: 100,
            default_window_hours: 24,
            lookback_hours: 48,
            link_retention_days: 7,
            window_policy: WindowPolicy::default(),
            write_empty_overflow: true,
            channel: ChannelConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            site_link: "https://www.newagebd.net".to_string(),
            site_name: "New Age BD".to_string(),
            archive_title: "New Age BD News".to_string(),
            archive_description: "Latest news articles".to_string(),
            daily_title: "Daily Feed".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            html_file: PathBuf::from("opinion.html"),
            archive_file: PathBuf::from("articles.xml"),
            daily_prefix: PathBuf::from("daily_feed"),
            watermark_file: PathBuf::from("last_seen.json"),
        }
    }
}

impl FeedConfig {
    /// Load the configuration from `path`, or the defaults when no path is given.
    ///
    /// An explicitly requested file that cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FeedConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_items == 0 {
            return Err(ConfigError::Invalid("max_items must be at least 1".into()));
        }
        if self.max_items_per_daily == 0 {
            return Err(ConfigError::Invalid(
                "max_items_per_daily must be at least 1".into(),
            ));
        }
        for (name, hours) in [
            ("default_window_hours", self.default_window_hours),
            ("lookback_hours", self.lookback_hours),
            ("link_retention_days", self.link_retention_days.saturating_mul(24)),
        ] {
            if hours < 0 {
                return Err(ConfigError::Invalid(format!("{name} must not be negative")));
            }
            if hours > MAX_WINDOW_HOURS {
                return Err(ConfigError::Invalid(format!(
                    "{name} exceeds {MAX_WINDOW_HOURS} hours"
                )));
            }
        }
        if self.link_retention_days * 24 < self.lookback_hours {
            return Err(ConfigError::Invalid(format!(
                "link_retention_days ({}) must cover lookback_hours ({})",
                self.link_retention_days, self.lookback_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.max_items, 1000);
        assert_eq!(config.max_items_per_daily, 100);
        assert_eq!(config.lookback_hours, 48);
        assert_eq!(config.link_retention_days, 7);
        assert_eq!(config.window_policy, WindowPolicy::Cutoff);
        assert_eq!(config.paths.archive_file, PathBuf::from("articles.xml"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_path_is_default() {
        assert_eq!(FeedConfig::load(None).unwrap(), FeedConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "max_items_per_daily: 25\nwindow_policy: lookback\npaths:\n  archive_file: /tmp/a.xml"
        )
        .unwrap();

        let config = FeedConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_items_per_daily, 25);
        assert_eq!(config.window_policy, WindowPolicy::Lookback);
        assert_eq!(config.paths.archive_file, PathBuf::from("/tmp/a.xml"));
        assert_eq!(config.paths.watermark_file, PathBuf::from("last_seen.json"));
        assert_eq!(config.max_items, 1000);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeedConfig::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_items: [not, a, number]").unwrap();
        let err = FeedConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = FeedConfig {
            max_items_per_daily: 0,
            ..FeedConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_negative_window() {
        let config = FeedConfig {
            lookback_hours: -1,
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_windows() {
        for config in [
            FeedConfig {
                lookback_hours: i64::MAX / 2,
                link_retention_days: i64::MAX / 2,
                ..FeedConfig::default()
            },
            FeedConfig {
                default_window_hours: MAX_WINDOW_HOURS + 1,
                ..FeedConfig::default()
            },
            FeedConfig {
                link_retention_days: i64::MAX,
                ..FeedConfig::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }

        let at_limit = FeedConfig {
            lookback_hours: MAX_WINDOW_HOURS,
            link_retention_days: MAX_WINDOW_HOURS / 24,
            ..FeedConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_retention_shorter_than_lookback() {
        let config = FeedConfig {
            lookback_hours: 72,
            link_retention_days: 2,
            ..FeedConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let covered = FeedConfig {
            lookback_hours: 72,
            link_retention_days: 3,
            ..FeedConfig::default()
        };
        assert!(covered.validate().is_ok());
    }
}
