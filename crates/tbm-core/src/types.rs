use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SeverityLevel
// ---------------------------------------------------------------------------

/// Severity of a measurement deviation on the threshold path.
///
/// The derive order is the safety order: `Ok < Low < High < Trip`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    #[default]
    Ok,
    Low,
    High,
    Trip,
}

impl SeverityLevel {
    pub fn all() -> &'static [SeverityLevel] {
        &[
            SeverityLevel::Ok,
            SeverityLevel::Low,
            SeverityLevel::High,
            SeverityLevel::Trip,
        ]
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeverityLevel::Ok => "OK",
            SeverityLevel::Low => "LOW",
            SeverityLevel::High => "HIGH",
            SeverityLevel::Trip => "TRIP",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ok" => Ok(SeverityLevel::Ok),
            "low" => Ok(SeverityLevel::Low),
            "high" => Ok(SeverityLevel::High),
            "trip" => Ok(SeverityLevel::Trip),
            _ => Err(format!("unknown severity level: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// InterlockSeverity
// ---------------------------------------------------------------------------

/// Catalog severity of an interlock. Only `Critical` gates `SAFETY_OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterlockSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl InterlockSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            InterlockSeverity::Low => "low",
            InterlockSeverity::Medium => "medium",
            InterlockSeverity::High => "high",
            InterlockSeverity::Critical => "critical",
        }
    }

    /// Monotone mapping onto the threshold scale. `Medium` is a warning, so it
    /// shares `Low` with the lowest catalog severity.
    pub fn as_level(self) -> SeverityLevel {
        match self {
            InterlockSeverity::Low | InterlockSeverity::Medium => SeverityLevel::Low,
            InterlockSeverity::High => SeverityLevel::High,
            InterlockSeverity::Critical => SeverityLevel::Trip,
        }
    }
}

impl fmt::Display for InterlockSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Layer of the control architecture an interlock lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    SafetyPlc,
    MainPlc,
    Electrical,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::SafetyPlc => "safety_plc",
            Category::MainPlc => "main_plc",
            Category::Electrical => "electrical",
            Category::Other(s) => s,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "safety_plc" => Category::SafetyPlc,
            "main_plc" => Category::MainPlc,
            "electrical" => Category::Electrical,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SystemState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemState {
    /// Cold-start value only; never produced by a tick.
    #[default]
    Idle,
    Ready,
    Running,
    Fault,
}

impl SystemState {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemState::Idle => "IDLE",
            SystemState::Ready => "READY",
            SystemState::Running => "RUNNING",
            SystemState::Fault => "FAULT",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
