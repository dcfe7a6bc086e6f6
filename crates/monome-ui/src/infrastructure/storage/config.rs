//! TOML-based configuration for the monome-ui host.
//!
//! Reads and writes [`HostConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\MonomeUI\config.toml`
//! - Linux:    `~/.config/monome-ui/config.toml`
//! - macOS:    `~/Library/Application Support/MonomeUI/config.toml`
//!
//! A path given on the command line takes precedence. Example:
//!
//! ```toml
//! [serialosc]
//! host = "127.0.0.1"
//! port = 12002
//!
//! [arc]
//! sensitivity = 0.5
//! normalise = true
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, and every section is
//! `#[serde(default)]`, so an empty or partial file is valid and a missing
//! file is the same as the defaults.

use std::path::{Path, PathBuf};

use monome_core::{Geometry, GridLevels, RingLevels};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::key_page::KeyPageSettings;
use crate::application::ring_page::RingPageSettings;
use crate::infrastructure::network::discovery::DiscoveryOptions;
use crate::infrastructure::network::session::SessionOptions;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub serialosc: SerialoscConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub arc: ArcConfig,
    #[serde(default)]
    pub grid: GridConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level or filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Where the serialosc daemon is and where it should reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialoscConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_serialosc_port")]
    pub port: u16,
    /// Local UDP port for discovery replies.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// How long to wait for the first device.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// OSC prefix requested with `/sys/prefix`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// First local port handed to device sessions.
    #[serde(default = "default_client_port_base")]
    pub client_port_base: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArcConfig {
    #[serde(default = "default_ring_count")]
    pub ring_count: usize,
    #[serde(default = "default_led_count")]
    pub led_count: usize,
    /// Global multiplier applied to encoder deltas.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default = "default_fill_level")]
    pub fill_level: u8,
    #[serde(default = "default_cursor_level")]
    pub cursor_level: u8,
    /// Report unipolar rings as `position / led_count`.
    #[serde(default)]
    pub normalise: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    #[serde(default = "default_grid_width")]
    pub width: usize,
    #[serde(default = "default_grid_height")]
    pub height: usize,
    #[serde(default = "default_low_level")]
    pub low_level: u8,
    #[serde(default = "default_high_level")]
    pub high_level: u8,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_serialosc_port() -> u16 {
    12002
}
fn default_listen_port() -> u16 {
    12003
}
fn default_discovery_timeout_ms() -> u64 {
    500
}
fn default_prefix() -> String {
    "monome".to_string()
}
fn default_client_port_base() -> u16 {
    13001
}
fn default_ring_count() -> usize {
    4
}
fn default_led_count() -> usize {
    64
}
fn default_sensitivity() -> f64 {
    1.0
}
fn default_fill_level() -> u8 {
    4
}
fn default_cursor_level() -> u8 {
    15
}
fn default_grid_width() -> usize {
    16
}
fn default_grid_height() -> usize {
    8
}
fn default_low_level() -> u8 {
    5
}
fn default_high_level() -> u8 {
    15
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SerialoscConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_serialosc_port(),
            listen_port: default_listen_port(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            client_port_base: default_client_port_base(),
        }
    }
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            ring_count: default_ring_count(),
            led_count: default_led_count(),
            sensitivity: default_sensitivity(),
            fill_level: default_fill_level(),
            cursor_level: default_cursor_level(),
            normalise: false,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_width(),
            height: default_grid_height(),
            low_level: default_low_level(),
            high_level: default_high_level(),
        }
    }
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl HostConfig {
    /// Checks the values serde cannot: brightness range, geometry, sensitivity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = [
            ("arc.fill_level", self.arc.fill_level),
            ("arc.cursor_level", self.arc.cursor_level),
            ("grid.low_level", self.grid.low_level),
            ("grid.high_level", self.grid.high_level),
        ];
        for (field, level) in levels {
            monome_core::validate_level(level).map_err(|e| ConfigError::Invalid {
                field,
                reason: e.to_string(),
            })?;
        }
        let sizes = [
            ("arc.ring_count", self.arc.ring_count),
            ("arc.led_count", self.arc.led_count),
            ("grid.width", self.grid.width),
            ("grid.height", self.grid.height),
        ];
        for (field, size) in sizes {
            if size == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if !self.arc.sensitivity.is_finite() || self.arc.sensitivity < 0.0 {
            return Err(ConfigError::Invalid {
                field: "arc.sensitivity",
                reason: format!("{} is not a finite non-negative number", self.arc.sensitivity),
            });
        }
        Ok(())
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            server_host: self.serialosc.host.clone(),
            server_port: self.serialosc.port,
            listen_host: self.serialosc.host.clone(),
            listen_port: self.serialosc.listen_port,
        }
    }

    pub fn discovery_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.serialosc.discovery_timeout_ms)
    }

    pub fn arc_session_options(&self) -> SessionOptions {
        SessionOptions {
            geometry: Geometry::arc(self.arc.ring_count, self.arc.led_count),
            device_host: self.serialosc.host.clone(),
            listen_host: self.serialosc.host.clone(),
            ..SessionOptions::arc(self.session.prefix.clone())
        }
    }

    pub fn grid_session_options(&self) -> SessionOptions {
        SessionOptions {
            geometry: Geometry::grid(self.grid.width, self.grid.height),
            device_host: self.serialosc.host.clone(),
            listen_host: self.serialosc.host.clone(),
            ..SessionOptions::grid(self.session.prefix.clone())
        }
    }

    pub fn ring_page_settings(&self) -> RingPageSettings {
        RingPageSettings {
            levels: RingLevels {
                fill: self.arc.fill_level,
                cursor: self.arc.cursor_level,
            },
            normalise: self.arc.normalise,
            sensitivity: None,
        }
    }

    pub fn key_page_settings(&self) -> KeyPageSettings {
        KeyPageSettings {
            levels: GridLevels {
                low: self.grid.low_level,
                high: self.grid.high_level,
            },
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from `path`, or from the platform default location when
/// `path` is `None`. A missing file yields [`HostConfig::default()`].
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is out of range.
pub fn load_config(path: Option<&Path>) -> Result<HostConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    let cfg = match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str::<HostConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HostConfig::default(),
        Err(e) => return Err(ConfigError::Io { path, source: e }),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &HostConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("MonomeUI"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("monome-ui"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("MonomeUI")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("monome_ui_test_{}_{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn test_host_config_default_has_serialosc_ports() {
        // Arrange / Act
        let cfg = HostConfig::default();

        // Assert
        assert_eq!(cfg.serialosc.port, 12002);
        assert_eq!(cfg.serialosc.listen_port, 12003);
        assert_eq!(cfg.session.client_port_base, 13001);
        assert_eq!(cfg.session.prefix, "monome");
    }

    #[test]
    fn test_host_config_default_levels_match_device_conventions() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.ring_page_settings().levels, RingLevels { fill: 4, cursor: 15 });
        assert_eq!(cfg.key_page_settings().levels, GridLevels::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_grid_section_sets_key_page_levels() {
        // Arrange
        let toml_str = r#"
[grid]
low_level = 3
high_level = 12
"#;

        // Act
        let cfg: HostConfig = toml::from_str(toml_str).expect("deserialize grid");

        // Assert
        assert_eq!(cfg.key_page_settings().levels, GridLevels { low: 3, high: 12 });
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_every_default() {
        let cfg: HostConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, HostConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[arc]
sensitivity = 0.5
normalise = true
"#;

        // Act
        let cfg: HostConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.arc.sensitivity, 0.5);
        assert!(cfg.arc.normalise);
        assert_eq!(cfg.arc.led_count, 64);
        assert_eq!(cfg.grid.width, 16);
    }

    #[test]
    fn test_validate_rejects_level_above_fifteen() {
        let mut cfg = HostConfig::default();
        cfg.grid.high_level = 16;

        let err = cfg.validate().unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { field: "grid.high_level", .. }));
    }

    #[test]
    fn test_validate_rejects_negative_sensitivity() {
        let mut cfg = HostConfig::default();
        cfg.arc.sensitivity = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "arc.sensitivity", .. })
        ));
    }

    #[test]
    fn test_session_options_follow_config() {
        let mut cfg = HostConfig::default();
        cfg.session.prefix = "box".to_string();
        cfg.grid.width = 8;

        let grid = cfg.grid_session_options();

        assert_eq!(grid.prefix, "box");
        assert_eq!(grid.geometry, Geometry::grid(8, 8));
        assert_eq!(cfg.arc_session_options().geometry, Geometry::arc(4, 64));
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");

        let cfg = load_config(Some(&path)).expect("missing file is not an error");

        assert_eq!(cfg, HostConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip() {
        // Arrange
        let path = temp_path("round_trip");
        let mut cfg = HostConfig::default();
        cfg.serialosc.listen_port = 12500;
        cfg.logging.level = "debug".to_string();

        // Act
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_load_config_reports_malformed_toml() {
        let path = temp_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config(Some(&path));

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}
