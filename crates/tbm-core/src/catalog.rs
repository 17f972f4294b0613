use crate::error::{Result, TbmError};
use crate::paths::validate_id;
use crate::threshold::{ThresholdOp, ThresholdRule};
use crate::types::{Category, InterlockSeverity, SeverityLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../catalogs/tbm.yaml");

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Static description of one interlock. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterlockDefinition {
    pub id: String,
    pub category: Category,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub effect: String,
    pub severity: InterlockSeverity,
}

impl InterlockDefinition {
    pub fn is_critical(&self) -> bool {
        self.severity == InterlockSeverity::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actuator {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub rules: Vec<ThresholdRule>,
}

/// A monitored device. When `interlock` is set, a TRIP-level device severity
/// trips that interlock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interlock: Option<String>,
    pub measurements: Vec<Measurement>,
}

// ---------------------------------------------------------------------------
// On-disk document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ThresholdDoc {
    level: SeverityLevel,
    op: String,
    value: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct MeasurementDoc {
    id: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    thresholds: Vec<ThresholdDoc>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeviceDoc {
    id: String,
    name: String,
    #[serde(default)]
    interlock: Option<String>,
    #[serde(default)]
    measurements: Vec<MeasurementDoc>,
}

/// Operators stay strings here so a malformed one surfaces as
/// `InvalidOperator` instead of a generic parse error.
#[derive(Debug, Clone, Deserialize)]
struct CatalogDoc {
    #[serde(default = "default_version")]
    version: u32,
    interlocks: Vec<InterlockDefinition>,
    #[serde(default)]
    actuators: Vec<Actuator>,
    #[serde(default)]
    devices: Vec<DeviceDoc>,
}

fn default_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub version: u32,
    pub interlocks: Vec<InterlockDefinition>,
    pub actuators: Vec<Actuator>,
    pub devices: Vec<Device>,
}

impl Catalog {
    /// Build and validate a catalog from already-typed parts.
    pub fn new(
        interlocks: Vec<InterlockDefinition>,
        actuators: Vec<Actuator>,
        devices: Vec<Device>,
    ) -> Result<Self> {
        let catalog = Self {
            version: 1,
            interlocks,
            actuators,
            devices,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The TBM catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let doc: CatalogDoc = serde_yaml::from_str(data)?;
        Self::compile(doc)
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let doc: CatalogDoc = serde_json::from_str(data)?;
        Self::compile(doc)
    }

    /// Load a catalog, picking the parser from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let data = std::fs::read_to_string(path)?;
        let catalog = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&data)?,
            "json" => Self::from_json_str(&data)?,
            _ => return Err(TbmError::UnsupportedFormat(path.display().to_string())),
        };
        tracing::debug!(
            path = %path.display(),
            interlocks = catalog.interlocks.len(),
            devices = catalog.devices.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    fn compile(doc: CatalogDoc) -> Result<Self> {
        let mut devices = Vec::with_capacity(doc.devices.len());
        for d in doc.devices {
            let mut measurements = Vec::with_capacity(d.measurements.len());
            for m in d.measurements {
                let rules = m
                    .thresholds
                    .iter()
                    .map(|t| {
                        let op: ThresholdOp = t.op.parse()?;
                        Ok(ThresholdRule::new(t.level, op, t.value))
                    })
                    .collect::<Result<Vec<_>>>()?;
                measurements.push(Measurement {
                    id: m.id,
                    unit: m.unit,
                    rules,
                });
            }
            devices.push(Device {
                id: d.id,
                name: d.name,
                interlock: d.interlock,
                measurements,
            });
        }
        let catalog = Self {
            version: doc.version,
            interlocks: doc.interlocks,
            actuators: doc.actuators,
            devices,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Result<()> {
        if self.interlocks.is_empty() {
            return Err(TbmError::EmptyCatalog);
        }

        let interlock_ids = unique_ids(self.interlocks.iter().map(|i| i.id.as_str()))?;
        unique_ids(self.actuators.iter().map(|a| a.id.as_str()))?;
        unique_ids(self.devices.iter().map(|d| d.id.as_str()))?;
        unique_ids(
            self.devices
                .iter()
                .flat_map(|d| d.measurements.iter().map(|m| m.id.as_str())),
        )?;

        for device in &self.devices {
            if let Some(id) = &device.interlock {
                if !interlock_ids.contains(id.as_str()) {
                    return Err(TbmError::UnknownInterlock(id.clone()));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn interlock(&self, id: &str) -> Option<&InterlockDefinition> {
        self.interlocks.iter().find(|i| i.id == id)
    }

    pub fn has_interlock(&self, id: &str) -> bool {
        self.interlock(id).is_some()
    }

    pub fn has_actuator(&self, id: &str) -> bool {
        self.actuators.iter().any(|a| a.id == id)
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn measurement_ids(&self) -> impl Iterator<Item = &str> {
        self.devices
            .iter()
            .flat_map(|d| d.measurements.iter().map(|m| m.id.as_str()))
    }
}

fn unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for id in ids {
        validate_id(id)?;
        if !seen.insert(id) {
            return Err(TbmError::DuplicateId(id.to_string()));
        }
    }
    Ok(seen)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
interlocks:
  - id: A1
    category: safety_plc
    name: E-Stop
    severity: critical
  - id: B1
    category: main_plc
    name: Safety OK required
    severity: high
actuators:
  - id: cutterhead
    name: Cutter Head Motor
devices:
  - id: drive
    name: Drive
    interlock: B1
    measurements:
      - id: drive_current
        unit: A
        thresholds:
          - { level: trip, op: ">=", value: 7.5 }
"#;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.interlocks.len(), 19);
        assert_eq!(catalog.interlocks[0].id, "A1");
        assert_eq!(catalog.interlocks[18].id, "C5");
        let critical: Vec<&str> = catalog
            .interlocks
            .iter()
            .filter(|i| i.is_critical())
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(critical, vec!["A1", "A2", "A3", "A4"]);
        assert!(catalog.has_actuator("cutterhead"));
        assert!(catalog.has_actuator("screw_jack"));
        assert_eq!(
            catalog.device("cutterhead_drive").unwrap().interlock.as_deref(),
            Some("B3")
        );
    }

    #[test]
    fn builtin_categories_parsed() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.interlock("A2").unwrap().category, Category::SafetyPlc);
        assert_eq!(catalog.interlock("B7").unwrap().category, Category::MainPlc);
        assert_eq!(catalog.interlock("C3").unwrap().category, Category::Electrical);
    }

    #[test]
    fn yaml_catalog_preserves_order() {
        let catalog = Catalog::from_yaml_str(MINIMAL).unwrap();
        let ids: Vec<&str> = catalog.interlocks.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "B1"]);
        let rule = &catalog.devices[0].measurements[0].rules[0];
        assert_eq!(rule.op, ThresholdOp::GreaterOrEqual);
        assert_eq!(rule.level, SeverityLevel::Trip);
    }

    #[test]
    fn json_catalog_loads() {
        let json = r#"{
            "interlocks": [
                {"id": "A1", "category": "Safety PLC", "name": "E-Stop", "severity": "critical"}
            ],
            "devices": [
                {"id": "enc", "name": "Enclosure", "measurements": [
                    {"id": "temp", "thresholds": [{"level": "high", "op": "≥", "value": 45.0}]}
                ]}
            ]
        }"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(catalog.interlocks[0].category, Category::SafetyPlc);
        assert_eq!(catalog.measurement_ids().collect::<Vec<_>>(), vec!["temp"]);
    }

    #[test]
    fn invalid_operator_fails_at_load() {
        let bad = MINIMAL.replace("\">=\"", "\"=>\"");
        let err = Catalog::from_yaml_str(&bad).unwrap_err();
        assert!(matches!(err, TbmError::InvalidOperator(ref op) if op == "=>"));
    }

    #[test]
    fn device_referencing_missing_interlock_rejected() {
        let bad = MINIMAL.replace("interlock: B1", "interlock: Z9");
        let err = Catalog::from_yaml_str(&bad).unwrap_err();
        assert!(matches!(err, TbmError::UnknownInterlock(ref id) if id == "Z9"));
    }

    #[test]
    fn duplicate_interlock_rejected() {
        let bad = MINIMAL.replace("id: B1", "id: A1");
        let err = Catalog::from_yaml_str(&bad).unwrap_err();
        assert!(matches!(err, TbmError::DuplicateId(ref id) if id == "A1"));
    }

    #[test]
    fn invalid_id_rejected() {
        let bad = MINIMAL.replace("id: drive_current", "id: \"drive current\"");
        assert!(matches!(
            Catalog::from_yaml_str(&bad),
            Err(TbmError::InvalidId(_))
        ));
    }

    #[test]
    fn empty_catalog_rejected() {
        assert!(matches!(
            Catalog::from_yaml_str("interlocks: []\n"),
            Err(TbmError::EmptyCatalog)
        ));
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let yaml_path = dir.path().join("catalog.yaml");
        std::fs::write(&yaml_path, MINIMAL).unwrap();
        assert_eq!(Catalog::load(&yaml_path).unwrap().interlocks.len(), 2);

        let txt_path = dir.path().join("catalog.txt");
        std::fs::write(&txt_path, MINIMAL).unwrap();
        assert!(matches!(
            Catalog::load(&txt_path),
            Err(TbmError::UnsupportedFormat(_))
        ));
    }
}
