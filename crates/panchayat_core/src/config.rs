//! Runtime configuration loaded from TOML.
//!
//! # Responsibility
//! - Provide defaults that work without a config file.
//! - Validate paths and integrity tunables before services start.
//!
//! # Invariants
//! - `geofence_radius_km` is finite and positive.
//! - `stale_update_days` is at least one day.

use crate::integrity::IntegrityPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanchayatConfig {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub log_level: String,
    /// Absolute directory for rotating logs; stderr when absent.
    pub log_dir: Option<PathBuf>,
    pub integrity: IntegrityPolicy,
    /// Ongoing projects without a contractor update for longer than this raise an alert.
    pub stale_update_days: u32,
}

impl Default for PanchayatConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("panchayat.sqlite3"),
            upload_dir: PathBuf::from("uploads"),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            integrity: IntegrityPolicy::default(),
            stale_update_days: 30,
        }
    }
}

impl PanchayatConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".to_string()));
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("upload_dir must not be empty".to_string()));
        }
        crate::logging::normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }

        let radius = self.integrity.geofence_radius_km;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "integrity.geofence_radius_km must be > 0, got {radius}"
            )));
        }
        if self.stale_update_days == 0 {
            return Err(ConfigError::Invalid(
                "stale_update_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PanchayatConfig};

    #[test]
    fn empty_file_uses_defaults() {
        let config = PanchayatConfig::from_toml_str("").unwrap();
        assert_eq!(config, PanchayatConfig::default());
        assert_eq!(config.integrity.geofence_radius_km, 0.5);
        assert_eq!(config.integrity.suspicious_dimensions, vec![512, 1024]);
    }

    #[test]
    fn partial_integrity_table_keeps_other_defaults() {
        let config = PanchayatConfig::from_toml_str(
            r#"
            upload_dir = "/srv/uploads"
            stale_update_days = 14

            [integrity]
            geofence_radius_km = 1.5
            suspicious_dimensions = [512, 768, 1024]
            editing_tools = ["adobe", "gimp", "snapseed"]
            "#,
        )
        .unwrap();
        assert_eq!(config.stale_update_days, 14);
        assert_eq!(config.integrity.geofence_radius_km, 1.5);
        assert_eq!(config.integrity.editing_tools.len(), 3);
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let err = PanchayatConfig::from_toml_str("[integrity]\ngeofence_radius_km = 0.0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("geofence")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PanchayatConfig::from_toml_str("colour = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
