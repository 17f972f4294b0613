use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub value: f64,
    pub at: DateTime<Utc>,
}

/// Supplies one sample per measurement per tick.
///
/// `sample` must return promptly: a measurement with nothing fresh to report
/// returns `None` and is skipped for that tick.
pub trait TelemetrySource: Send {
    fn sample(&mut self, measurement_id: &str) -> Option<Sample>;

    /// Called once per tick, before sampling, with the commanded actuator
    /// states. Sources that model the plant use it to gate their output.
    fn observe_actuators(&mut self, _actuators: &BTreeMap<String, bool>) {}
}

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// Fixed values set by the caller. Measurements never set are absent.
pub struct ScriptedSource {
    values: HashMap<String, f64>,
    clock: Arc<dyn Clock>,
}

impl ScriptedSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            values: HashMap::new(),
            clock,
        }
    }

    pub fn set(&mut self, measurement_id: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(measurement_id.into(), value);
        self
    }

    pub fn remove(&mut self, measurement_id: &str) -> &mut Self {
        self.values.remove(measurement_id);
        self
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TelemetrySource for ScriptedSource {
    fn sample(&mut self, measurement_id: &str) -> Option<Sample> {
        self.values.get(measurement_id).map(|&value| Sample {
            value,
            at: self.clock.now(),
        })
    }
}

// ---------------------------------------------------------------------------
// SimulatedSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Band {
    low: f64,
    high: f64,
    gate: Option<String>,
}

/// Random plant model: each measurement wanders inside a band, and
/// actuator-gated measurements read zero while the actuator is off.
pub struct SimulatedSource {
    bands: HashMap<String, Band>,
    actuators: BTreeMap<String, bool>,
    dropout: f64,
    rng: StdRng,
    clock: Arc<dyn Clock>,
}

impl SimulatedSource {
    pub fn new(seed: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            bands: HashMap::new(),
            actuators: BTreeMap::new(),
            dropout: 0.0,
            rng,
            clock,
        }
    }

    /// Bands matching the builtin TBM catalog.
    pub fn tbm(seed: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        let mut sim = Self::new(seed, clock);
        sim.band("cutterhead_current", 3.0, 8.0, Some("cutterhead"))
            .band("jack_current", 3.0, 6.0, Some("screw_jack"))
            .band("nozzle_pressure", 20.0, 55.0, None)
            .band("enclosure_temp", 25.0, 45.0, None)
            .band("coolant_flow", 9.0, 20.0, None)
            .band("hydraulic_pressure", 120.0, 190.0, None);
        sim
    }

    pub fn band(
        &mut self,
        measurement_id: impl Into<String>,
        low: f64,
        high: f64,
        gate: Option<&str>,
    ) -> &mut Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.bands.insert(
            measurement_id.into(),
            Band {
                low,
                high,
                gate: gate.map(str::to_string),
            },
        );
        self
    }

    /// Probability in `[0, 1]` that a sample goes missing.
    pub fn with_dropout(mut self, probability: f64) -> Self {
        self.dropout = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }
}

impl TelemetrySource for SimulatedSource {
    fn sample(&mut self, measurement_id: &str) -> Option<Sample> {
        let band = self.bands.get(measurement_id)?;
        if self.dropout > 0.0 && self.rng.gen_bool(self.dropout) {
            return None;
        }
        let gated_off = band
            .gate
            .as_ref()
            .is_some_and(|a| !self.actuators.get(a).copied().unwrap_or(false));
        let value = if gated_off {
            0.0
        } else {
            let raw = self.rng.gen_range(band.low..=band.high);
            (raw * 100.0).round() / 100.0
        };
        Some(Sample {
            value,
            at: self.clock.now(),
        })
    }

    fn observe_actuators(&mut self, actuators: &BTreeMap<String, bool>) {
        self.actuators = actuators.clone();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
