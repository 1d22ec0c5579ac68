use crate::error::{RelayError, Result};
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
// LimitsConfig
// ---------------------------------------------------------------------------

/// Batch ceilings per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_free_batch")]
    pub free_batch: u32,
    #[serde(default = "default_premium_batch")]
    pub premium_batch: u32,
}

fn default_free_batch() -> u32 {
    20
}

fn default_premium_batch() -> u32 {
    500
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free_batch: default_free_batch(),
            premium_batch: default_premium_batch(),
        }
    }
}

// ---------------------------------------------------------------------------
// CooldownConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Applied after a single link completes.
    #[serde(default = "default_single_secs")]
    pub single_secs: u64,
    /// Applied after a whole batch completes.
    #[serde(default = "default_batch_secs")]
    pub batch_secs: u64,
}

fn default_single_secs() -> u64 {
    45
}

fn default_batch_secs() -> u64 {
    300
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            single_secs: default_single_secs(),
            batch_secs: default_batch_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Fall back to the shared default session for users without stored
    /// credentials.
    #[serde(default)]
    pub default_session_fallback: bool,
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: PathBuf,
}

fn default_credentials_dir() -> PathBuf {
    PathBuf::from(".relay").join("sessions")
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_session_fallback: false,
            credentials_dir: default_credentials_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// FetchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Pause after each fetch that went through a privileged session.
    #[serde(default = "default_privileged_delay_secs")]
    pub privileged_delay_secs: u64,
}

fn default_privileged_delay_secs() -> u64 {
    10
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            privileged_delay_secs: default_privileged_delay_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cooldown: CooldownConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RelayError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(RelayError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.limits.free_batch == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "limits.free_batch is 0: free users cannot run batches".to_string(),
            });
        }

        if self.limits.premium_batch == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "limits.premium_batch is 0: nobody can run batches".to_string(),
            });
        }

        if self.limits.free_batch > self.limits.premium_batch {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "limits.free_batch ({}) is above limits.premium_batch ({})",
                    self.limits.free_batch, self.limits.premium_batch
                ),
            });
        }

        if self.cooldown.single_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "cooldown.single_secs is 0: free users are not rate limited".to_string(),
            });
        }

        if self.cooldown.batch_secs < self.cooldown.single_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "cooldown.batch_secs ({}) is shorter than cooldown.single_secs ({})",
                    self.cooldown.batch_secs, self.cooldown.single_secs
                ),
            });
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
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.limits.free_batch, 20);
        assert_eq!(cfg.limits.premium_batch, 500);
        assert_eq!(cfg.cooldown.single_secs, 45);
        assert_eq!(cfg.cooldown.batch_secs, 300);
        assert!(!cfg.sessions.default_session_fallback);
        assert_eq!(cfg.fetch.privileged_delay_secs, 10);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
limits:
  free_batch: 5
sessions:
  default_session_fallback: true
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.limits.free_batch, 5);
        assert_eq!(cfg.limits.premium_batch, 500);
        assert!(cfg.sessions.default_session_fallback);
        assert_eq!(cfg.cooldown.batch_secs, 300);
    }

    #[test]
    fn empty_yaml_is_default() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".relay/config.yaml");
        let mut cfg = Config::default();
        cfg.cooldown.single_secs = 60;
        cfg.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, RelayError::ConfigNotFound(_)));
    }

    #[test]
    fn load_or_default_on_missing() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_or_default_still_reports_bad_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "limits: [not, a, map]").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(RelayError::Yaml(_))
        ));
    }

    #[test]
    fn default_config_has_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_free_above_premium() {
        let mut cfg = Config::default();
        cfg.limits.free_batch = 600;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("above limits.premium_batch")));
    }

    #[test]
    fn validate_zero_premium_is_error() {
        let mut cfg = Config::default();
        cfg.limits.premium_batch = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
    }

    #[test]
    fn validate_batch_cooldown_shorter_than_single() {
        let mut cfg = Config::default();
        cfg.cooldown.batch_secs = 10;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("shorter than cooldown.single_secs")));
    }
}
