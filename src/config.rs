use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::mixer::MixerSettings;
use crate::settings::AutoDjSettings;

/// Application configuration loaded from TOML config file.
/// Every field is defaulted; the file itself is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Directories to scan for music files (used when `scan` has no CLI args).
    pub music_dirs: Vec<PathBuf>,
    /// Custom database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Auto-DJ settings seeded into a fresh database.
    pub autodj: AutoDjSettings,
    pub mixer: MixerSettings,
    pub session: SessionConfig,
}

/// Simulated playout session settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Wall-clock time between progress ticks, milliseconds.
    pub tick_ms: u64,
    /// Track seconds that pass per wall-clock second.
    pub speed: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            speed: 1.0,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/autodj/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// CLI flag, then config file, then the XDG data dir.
    pub fn resolve_db_path(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.db_path.clone())
            .unwrap_or_else(default_db_path)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("autodj.db")
    } else {
        // Fallback: current directory
        PathBuf::from("autodj.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::sidechain::SidechainPreset;
    use crate::settings::EnergyStyle;

    #[test]
    fn test_empty_config_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert!(config.music_dirs.is_empty());
        assert_eq!(config.autodj, AutoDjSettings::default());
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_sections() {
        let config = AppConfig::parse(
            r#"
            music_dirs = ["/srv/music"]

            [autodj]
            energy_style = "peak-valley"
            strict_bpm = true

            [mixer]
            crossfade_secs = 3.5
            sidechain_preset = "aggressive"

            [session]
            speed = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(config.music_dirs, [PathBuf::from("/srv/music")]);
        assert_eq!(config.autodj.energy_style, EnergyStyle::PeakValley);
        assert!(config.autodj.strict_bpm);
        assert_eq!(config.autodj.recency_limit, 20);
        assert_eq!(config.mixer.crossfade_secs, 3.5);
        assert_eq!(config.mixer.sidechain_preset, SidechainPreset::Aggressive);
        assert_eq!(config.session.speed, 20.0);
        assert_eq!(config.session.tick_ms, 250);
    }

    #[test]
    fn test_bad_file_falls_back() {
        let dir = std::env::temp_dir().join(format!("autodj-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "session = 12").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.session, SessionConfig::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_db_path_precedence() {
        let config = AppConfig {
            db_path: Some(PathBuf::from("/tmp/from-config.db")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolve_db_path(Some(PathBuf::from("/tmp/cli.db"))),
            PathBuf::from("/tmp/cli.db")
        );
        assert_eq!(config.resolve_db_path(None), PathBuf::from("/tmp/from-config.db"));
    }
}
