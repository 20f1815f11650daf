use crate::error::{ObligoError, Result};
use crate::paths;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Contents of `.obligo/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Timeline database. Relative paths resolve against the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// IANA zone whose civil calendar defines periods and due dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Run all four scheduled cadences once when `serve` starts.
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            timezone: default_timezone(),
            run_on_start: false,
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ObligoError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ObligoError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        match &self.database {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(paths::DEFAULT_DB_FILE),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.tz().is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("unknown timezone '{}'", self.timezone),
            });
        } else if self.timezone != default_timezone() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "timezone '{}' differs from the trigger timezone {}; periods may straddle trigger instants",
                    self.timezone,
                    default_timezone()
                ),
            });
        }

        if let Some(db) = &self.database {
            if db.as_os_str().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "database path is empty".to_string(),
                });
            } else if db.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("database path '{}' is a directory", db.display()),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_without_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ObligoError::NotInitialized)
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(paths::OBLIGO_DIR)).unwrap();
        let cfg = Config {
            run_on_start: true,
            ..Default::default()
        };
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert!(loaded.run_on_start);
        assert_eq!(loaded.timezone, "Asia/Kolkata");
        assert_eq!(
            loaded.database_path(dir.path()),
            dir.path().join(".obligo/timelines.db")
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = serde_yaml::from_str("database: data/t.db\n").unwrap();
        assert_eq!(cfg.timezone, "Asia/Kolkata");
        assert!(!cfg.run_on_start);
        assert_eq!(
            cfg.database_path(Path::new("/srv/app")),
            PathBuf::from("/srv/app/data/t.db")
        );
        assert_eq!(cfg.tz().unwrap(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn validate_default_is_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_timezone() {
        let cfg = Config {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
        assert!(cfg.tz().is_err());
    }

    #[test]
    fn validate_warns_on_other_timezone() {
        let cfg = Config {
            timezone: "Europe/London".into(),
            ..Default::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }
}
