use crate::error::{Result, TbmError};
use crate::types::SeverityLevel;
use serde::{Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// ThresholdOp
// ---------------------------------------------------------------------------

/// Comparison applied as `value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdOp {
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
}

impl ThresholdOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdOp::GreaterOrEqual => ">=",
            ThresholdOp::LessOrEqual => "<=",
            ThresholdOp::Greater => ">",
            ThresholdOp::Less => "<",
        }
    }

    /// NaN never satisfies any operator.
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdOp::GreaterOrEqual => value >= threshold,
            ThresholdOp::LessOrEqual => value <= threshold,
            ThresholdOp::Greater => value > threshold,
            ThresholdOp::Less => value < threshold,
        }
    }
}

impl fmt::Display for ThresholdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThresholdOp {
    type Err = TbmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">=" | "≥" => Ok(ThresholdOp::GreaterOrEqual),
            "<=" | "≤" => Ok(ThresholdOp::LessOrEqual),
            ">" => Ok(ThresholdOp::Greater),
            "<" => Ok(ThresholdOp::Less),
            _ => Err(TbmError::InvalidOperator(s.to_string())),
        }
    }
}

impl Serialize for ThresholdOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Evaluate `value <operator> threshold` for an operator given as text.
///
/// Accepts both ASCII (`>=`) and the dashboard's typographic forms (`≥`).
/// Anything else is `InvalidOperator`; there is no fallback result.
pub fn evaluate(operator: &str, value: f64, threshold: f64) -> Result<bool> {
    let op: ThresholdOp = operator.parse()?;
    Ok(op.apply(value, threshold))
}

// ---------------------------------------------------------------------------
// ThresholdRule
// ---------------------------------------------------------------------------

/// One severity band of a measurement: when `value <op> threshold` holds,
/// the measurement is at least `level`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRule {
    pub level: SeverityLevel,
    pub op: ThresholdOp,
    pub value: f64,
}

impl ThresholdRule {
    pub fn new(level: SeverityLevel, op: ThresholdOp, value: f64) -> Self {
        Self { level, op, value }
    }

    pub fn matches(&self, measured: f64) -> bool {
        self.op.apply(measured, self.value)
    }
}

/// Severity of a single measured value: the worst level among matching rules.
pub fn classify(rules: &[ThresholdRule], measured: f64) -> SeverityLevel {
    crate::severity::fold(
        rules
            .iter()
            .filter(|r| r.matches(measured))
            .map(|r| r.level),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
