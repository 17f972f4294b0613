use crate::catalog::Catalog;
use crate::error::Result;
use crate::interlock::ResetPolicy;
use crate::machine::FaultPolicy;
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

const MIN_TICK_MS: u64 = 50;
const MAX_TICK_MS: u64 = 60_000;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub reset_policy: ResetPolicy,
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    /// Actuator whose command selects RUNNING over READY.
    #[serde(default = "default_cutter_actuator")]
    pub cutter_actuator: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Catalog file; the builtin TBM catalog when unset. Relative paths are
    /// resolved against the directory holding the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

fn default_version() -> u32 {
    1
}

fn default_cutter_actuator() -> String {
    "cutterhead".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            reset_policy: ResetPolicy::default(),
            fault_policy: FaultPolicy::default(),
            cutter_actuator: default_cutter_actuator(),
            tick_interval_ms: default_tick_interval_ms(),
            catalog: None,
        }
    }
}

impl EngineConfig {
    /// Settings for the desk simulator: resets are not gated on the field
    /// condition because there is no field.
    pub fn simulation() -> Self {
        Self {
            reset_policy: ResetPolicy::Permissive,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Load the configured catalog. `base` is the config file's directory.
    pub fn load_catalog(&self, base: Option<&Path>) -> Result<Catalog> {
        match &self.catalog {
            None => Catalog::builtin(),
            Some(p) if p.is_relative() => match base {
                Some(dir) => Catalog::load(&dir.join(p)),
                None => Catalog::load(p),
            },
            Some(p) => Catalog::load(p),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, catalog: Option<&Catalog>) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.tick_interval_ms < MIN_TICK_MS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "tick_interval_ms={} is below {MIN_TICK_MS} ms; the loop may starve readers",
                    self.tick_interval_ms
                ),
            });
        }
        if self.tick_interval_ms > MAX_TICK_MS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "tick_interval_ms={} exceeds {MAX_TICK_MS} ms; trips will be seen late",
                    self.tick_interval_ms
                ),
            });
        }

        if self.reset_policy == ResetPolicy::Permissive {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "reset_policy is permissive: interlocks can be reset while their \
                          condition is still asserted (simulation only)"
                    .to_string(),
            });
        }

        if let Some(catalog) = catalog {
            if !catalog.has_actuator(&self.cutter_actuator) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "cutter_actuator '{}' is not an actuator in the catalog",
                        self.cutter_actuator
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
