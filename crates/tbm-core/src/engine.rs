//! The per-tick control loop body.
//!
//! An [`Engine`] owns the interlock registry, the system state machine and
//! the commanded actuator map. Each [`Engine::tick`] works on staged copies
//! and commits them together with a fresh [`EngineSnapshot`], so a reader
//! holding a [`SnapshotReader`] sees either the previous tick or this one,
//! never a mix.

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::command::{self, Command, CommandInbox, CommandSender};
use crate::config::EngineConfig;
use crate::error::{Result, TbmError};
use crate::interlock::{InterlockRegistry, InterlockStatus};
use crate::machine::{SystemStateMachine, Transition};
use crate::safety::{blocking_interlocks, compute_safety_ok};
use crate::severity;
use crate::telemetry::TelemetrySource;
use crate::threshold::classify;
use crate::types::{SeverityLevel, SystemState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementReading {
    pub id: String,
    /// `None` when the source had no sample this tick.
    pub value: Option<f64>,
    pub level: Option<SeverityLevel>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReading {
    pub id: String,
    pub severity: SeverityLevel,
    /// False when every measurement of the device was absent.
    pub evaluated: bool,
    pub measurements: Vec<MeasurementReading>,
}

/// Everything the engine exposes after a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    /// Zero before the first tick.
    pub tick: u64,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub state: SystemState,
    pub state_changed_at: Option<DateTime<Utc>>,
    pub safety_ok: bool,
    /// Critical interlocks currently holding `safety_ok` false.
    pub blocking: Vec<String>,
    pub fault_acknowledge_required: bool,
    pub system_severity: SeverityLevel,
    pub devices: Vec<DeviceReading>,
    pub actuators: BTreeMap<String, bool>,
    pub interlocks: Vec<InterlockStatus>,
}

impl EngineSnapshot {
    pub fn interlock(&self, id: &str) -> Option<&InterlockStatus> {
        self.interlocks.iter().find(|s| s.definition.id == id)
    }

    pub fn device(&self, id: &str) -> Option<&DeviceReading> {
        self.devices.iter().find(|d| d.id == id)
    }
}

/// Read handle on the latest committed snapshot. Clones share the same slot.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: Arc<RwLock<Arc<EngineSnapshot>>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.slot.read().unwrap_or_else(|e| e.into_inner()))
    }
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RejectedCommand {
    pub command: Command,
    pub error: String,
}

/// What happened during one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub applied: Vec<Command>,
    pub rejected: Vec<RejectedCommand>,
    /// Interlocks that went from inactive to active.
    pub tripped: Vec<String>,
    /// Interlocks whose condition cleared from telemetry. Still latched.
    pub cleared: Vec<String>,
    /// Measurements with no sample this tick.
    pub absent: Vec<String>,
    pub transition: Transition,
    #[serde(skip_serializing)]
    pub snapshot: Arc<EngineSnapshot>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Staged copy of everything a tick may mutate.
#[derive(Clone)]
struct Staged {
    registry: InterlockRegistry,
    machine: SystemStateMachine,
    actuators: BTreeMap<String, bool>,
    /// Interlocks tripped by an operator. Telemetry never clears these.
    manual: BTreeSet<String>,
}

pub struct Engine {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    live: Staged,
    inbox: CommandInbox,
    sender: CommandSender,
    tick: u64,
    published: Arc<RwLock<Arc<EngineSnapshot>>>,
}

impl Engine {
    pub fn new(catalog: Catalog, config: EngineConfig, clock: Box<dyn Clock>) -> Result<Self> {
        catalog.validate()?;
        if !catalog.has_actuator(&config.cutter_actuator) {
            return Err(TbmError::UnknownActuator(config.cutter_actuator.clone()));
        }
        let registry = InterlockRegistry::from_catalog(&catalog, config.reset_policy)?;
        let machine = SystemStateMachine::new(config.fault_policy);
        let actuators = catalog
            .actuators
            .iter()
            .map(|a| (a.id.clone(), false))
            .collect();
        let live = Staged {
            registry,
            machine,
            actuators,
            manual: BTreeSet::new(),
        };
        let (sender, inbox) = command::channel();
        let initial = build_snapshot(0, None, &live, Vec::new(), SeverityLevel::Ok);

        tracing::debug!(
            interlocks = catalog.interlocks.len(),
            devices = catalog.devices.len(),
            reset_policy = %config.reset_policy,
            fault_policy = %config.fault_policy,
            "engine created"
        );

        Ok(Self {
            catalog: Arc::new(catalog),
            config,
            clock,
            live,
            inbox,
            sender,
            tick: 0,
            published: Arc::new(RwLock::new(Arc::new(initial))),
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &InterlockRegistry {
        &self.live.registry
    }

    pub fn state(&self) -> SystemState {
        self.live.machine.state()
    }

    pub fn actuators(&self) -> &BTreeMap<String, bool> {
        &self.live.actuators
    }

    /// A producer handle whose commands are applied at the next tick.
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> SnapshotReader {
        SnapshotReader {
            slot: Arc::clone(&self.published),
        }
    }

    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.subscribe().latest()
    }

    /// Apply one command immediately, outside the tick cycle.
    ///
    /// The system state and published snapshot are not re-derived until the
    /// next tick. On error nothing changes.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        let at = self.clock.now();
        let mut staged = self.live.clone();
        apply_command(&self.catalog, &mut staged, &command, at)?;
        self.live = staged;
        Ok(())
    }

    /// Run one evaluation cycle and publish its snapshot.
    pub fn tick(&mut self, source: &mut dyn TelemetrySource) -> TickReport {
        let at = self.clock.now();
        let tick = self.tick + 1;
        let mut staged = self.live.clone();

        // 1. Buffered operator commands, in arrival order.
        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        for cmd in self.inbox.drain() {
            match apply_command(&self.catalog, &mut staged, &cmd, at) {
                Ok(()) => applied.push(cmd),
                Err(err) => {
                    tracing::warn!(tick, command = %cmd, error = %err, "command rejected");
                    rejected.push(RejectedCommand {
                        command: cmd,
                        error: err.to_string(),
                    });
                }
            }
        }

        let before: Vec<bool> = staged.registry.iter().map(|(_, s)| s.active).collect();

        // 2. Telemetry, threshold classification and device folding.
        source.observe_actuators(&staged.actuators);
        let mut devices = Vec::with_capacity(self.catalog.devices.len());
        let mut absent = Vec::new();
        let mut bound: HashMap<&str, (SeverityLevel, DateTime<Utc>)> = HashMap::new();
        for device in &self.catalog.devices {
            let mut readings = Vec::with_capacity(device.measurements.len());
            let mut latest: Option<DateTime<Utc>> = None;
            for m in &device.measurements {
                match source.sample(&m.id) {
                    Some(sample) if sample.value.is_finite() => {
                        let level = classify(&m.rules, sample.value);
                        latest = Some(latest.map_or(sample.at, |l| l.max(sample.at)));
                        readings.push(MeasurementReading {
                            id: m.id.clone(),
                            value: Some(sample.value),
                            level: Some(level),
                            at: Some(sample.at),
                        });
                    }
                    other => {
                        match other {
                            Some(bad) => tracing::warn!(
                                tick,
                                measurement = %m.id,
                                value = %bad.value,
                                "non-finite sample treated as absent"
                            ),
                            None => {
                                tracing::debug!(tick, measurement = %m.id, "sample absent, skipped")
                            }
                        }
                        absent.push(m.id.clone());
                        readings.push(MeasurementReading {
                            id: m.id.clone(),
                            value: None,
                            level: None,
                            at: None,
                        });
                    }
                }
            }
            let device_severity = severity::fold(readings.iter().filter_map(|r| r.level));

            // Devices sharing an interlock are folded before it is touched.
            if let (Some(interlock), Some(sample_at)) = (&device.interlock, latest) {
                bound
                    .entry(interlock.as_str())
                    .and_modify(|(level, at)| {
                        *level = severity::combine(*level, device_severity);
                        *at = (*at).max(sample_at);
                    })
                    .or_insert((device_severity, sample_at));
            }

            devices.push(DeviceReading {
                id: device.id.clone(),
                severity: device_severity,
                evaluated: latest.is_some(),
                measurements: readings,
            });
        }

        // 3. Trip or clear each bound interlock once. No samples, no change.
        // Telemetry only clears conditions it raised; manual trips stay.
        let mut cleared = Vec::new();
        for def in &self.catalog.interlocks {
            let Some(&(level, sample_at)) = bound.get(def.id.as_str()) else {
                continue;
            };
            let outcome = if level == SeverityLevel::Trip {
                staged.registry.trip(&def.id, sample_at)
            } else if staged.manual.contains(&def.id) {
                Ok(())
            } else {
                let was_active = staged
                    .registry
                    .state(&def.id)
                    .map(|s| s.active)
                    .unwrap_or(false);
                let result = staged.registry.clear_condition(&def.id);
                if was_active && result.is_ok() {
                    cleared.push(def.id.clone());
                }
                result
            };
            if let Err(err) = outcome {
                tracing::warn!(tick, interlock = %def.id, error = %err, "device interlock update failed");
            }
        }

        let tripped: Vec<String> = staged
            .registry
            .iter()
            .zip(&before)
            .filter(|((_, s), was)| s.active && !**was)
            .map(|((d, _), _)| d.id.clone())
            .collect();

        // 4. Aggregate and derive the system state.
        let system_severity = severity::fold(devices.iter().map(|d| d.severity));
        let safety_ok = compute_safety_ok(&staged.registry);
        let cutter_on = staged
            .actuators
            .get(&self.config.cutter_actuator)
            .copied()
            .unwrap_or(false);
        let transition = staged.machine.evaluate(safety_ok, cutter_on, at);

        // 5. Commit.
        let snapshot = Arc::new(build_snapshot(
            tick,
            Some(at),
            &staged,
            devices,
            system_severity,
        ));
        self.live = staged;
        self.tick = tick;
        *self.published.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&snapshot);

        TickReport {
            tick,
            applied,
            rejected,
            tripped,
            cleared,
            absent,
            transition,
            snapshot,
        }
    }
}

fn apply_command(
    catalog: &Catalog,
    staged: &mut Staged,
    command: &Command,
    at: DateTime<Utc>,
) -> Result<()> {
    match command {
        Command::SetActuator { id, on } => {
            if !catalog.has_actuator(id) {
                return Err(TbmError::UnknownActuator(id.clone()));
            }
            staged.actuators.insert(id.clone(), *on);
            Ok(())
        }
        Command::ManualTrip { id } => {
            staged.registry.trip(id, at)?;
            staged.manual.insert(id.clone());
            Ok(())
        }
        Command::ManualReset { id } => {
            staged.registry.reset(id)?;
            staged.manual.remove(id);
            Ok(())
        }
        Command::ClearCondition { id } => {
            staged.registry.clear_condition(id)?;
            staged.manual.remove(id);
            Ok(())
        }
        Command::AcknowledgeFault => {
            let safety_ok = compute_safety_ok(&staged.registry);
            staged.machine.acknowledge(safety_ok)
        }
    }
}

fn build_snapshot(
    tick: u64,
    evaluated_at: Option<DateTime<Utc>>,
    staged: &Staged,
    devices: Vec<DeviceReading>,
    system_severity: SeverityLevel,
) -> EngineSnapshot {
    EngineSnapshot {
        tick,
        evaluated_at,
        state: staged.machine.state(),
        state_changed_at: staged.machine.changed_at(),
        safety_ok: compute_safety_ok(&staged.registry),
        blocking: blocking_interlocks(&staged.registry),
        fault_acknowledge_required: staged.machine.awaiting_acknowledge(),
        system_severity,
        devices,
        actuators: staged.actuators.clone(),
        interlocks: staged.registry.statuses(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Actuator, Device, InterlockDefinition, Measurement};
    use crate::clock::ManualClock;
    use crate::interlock::{LatchStatus, ResetPolicy};
    use crate::machine::FaultPolicy;
    use crate::telemetry::ScriptedSource;
    use crate::threshold::{ThresholdOp, ThresholdRule};
    use crate::types::{Category, InterlockSeverity};
    use chrono::{Duration, TimeZone};

    fn def(id: &str, severity: InterlockSeverity) -> InterlockDefinition {
        InterlockDefinition {
            id: id.to_string(),
            category: Category::SafetyPlc,
            name: format!("interlock {id}"),
            source: String::new(),
            condition: String::new(),
            effect: String::new(),
            severity,
        }
    }

    /// A1 critical, B1 high, plus a temperature probe bound to A1.
    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                def("A1", InterlockSeverity::Critical),
                def("B1", InterlockSeverity::High),
            ],
            vec![Actuator {
                id: "cutterhead".into(),
                name: "Cutterhead".into(),
            }],
            vec![Device {
                id: "probe".into(),
                name: "Probe".into(),
                interlock: Some("A1".into()),
                measurements: vec![Measurement {
                    id: "temp".into(),
                    unit: Some("C".into()),
                    rules: vec![
                        ThresholdRule::new(SeverityLevel::High, ThresholdOp::GreaterOrEqual, 40.0),
                        ThresholdRule::new(SeverityLevel::Trip, ThresholdOp::GreaterOrEqual, 50.0),
                    ],
                }],
            }],
        )
        .unwrap()
    }

    struct Rig {
        engine: Engine,
        clock: ManualClock,
        source: ScriptedSource,
    }

    fn rig(reset_policy: ResetPolicy, fault_policy: FaultPolicy) -> Rig {
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let config = EngineConfig {
            reset_policy,
            fault_policy,
            ..EngineConfig::default()
        };
        let engine = Engine::new(catalog(), config, Box::new(clock.clone())).unwrap();
        let source = ScriptedSource::new(Arc::new(clock.clone()));
        Rig {
            engine,
            clock,
            source,
        }
    }

    impl Rig {
        fn tick(&mut self) -> TickReport {
            self.clock.advance(Duration::seconds(1));
            self.engine.tick(&mut self.source)
        }

        fn send(&self, cmd: Command) {
            assert!(self.engine.sender().send(cmd));
        }
    }

    #[test]
    fn initial_snapshot_is_idle() {
        let r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        let snap = r.engine.snapshot();
        assert_eq!(snap.tick, 0);
        assert_eq!(snap.state, SystemState::Idle);
        assert!(snap.safety_ok);
        assert!(snap.evaluated_at.is_none());
        assert_eq!(snap.interlocks.len(), 2);
        assert_eq!(snap.actuators.get("cutterhead"), Some(&false));
    }

    #[test]
    fn first_tick_leaves_idle() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        let report = r.tick();
        assert_eq!(report.tick, 1);
        assert_eq!(report.transition.from, SystemState::Idle);
        assert_eq!(report.snapshot.state, SystemState::Ready);
        assert_eq!(report.absent, vec!["temp".to_string()]);
    }

    #[test]
    fn a1_b1_scenario_permissive() {
        let mut r = rig(ResetPolicy::Permissive, FaultPolicy::AutoClear);

        r.send(Command::ManualTrip { id: "B1".into() });
        let snap = r.tick().snapshot;
        assert!(snap.safety_ok);
        assert_eq!(snap.state, SystemState::Ready);

        r.send(Command::SetActuator {
            id: "cutterhead".into(),
            on: true,
        });
        r.send(Command::ManualTrip { id: "A1".into() });
        let report = r.tick();
        assert_eq!(report.tripped, vec!["A1".to_string()]);
        assert!(!report.snapshot.safety_ok);
        assert_eq!(report.snapshot.blocking, vec!["A1".to_string()]);
        assert_eq!(report.snapshot.state, SystemState::Fault);

        r.send(Command::ManualReset { id: "A1".into() });
        let snap = r.tick().snapshot;
        assert!(snap.safety_ok);
        assert_eq!(snap.state, SystemState::Running);
        assert_eq!(
            snap.interlock("B1").unwrap().status,
            LatchStatus::Active,
            "B1 is untouched by the A1 reset"
        );
    }

    #[test]
    fn a1_b1_scenario_guarded_requires_clear_first() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.send(Command::ManualTrip { id: "B1".into() });
        r.send(Command::ManualTrip { id: "A1".into() });
        assert_eq!(r.tick().snapshot.state, SystemState::Fault);

        r.send(Command::ManualReset { id: "A1".into() });
        let report = r.tick();
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].error.contains("still active"));
        assert_eq!(report.snapshot.state, SystemState::Fault);

        r.send(Command::ClearCondition { id: "A1".into() });
        let snap = r.tick().snapshot;
        assert!(snap.safety_ok);
        assert_eq!(snap.state, SystemState::Ready);
        assert_eq!(snap.interlock("A1").unwrap().status, LatchStatus::Latched);

        r.send(Command::ManualReset { id: "A1".into() });
        let snap = r.tick().snapshot;
        assert_eq!(snap.interlock("A1").unwrap().status, LatchStatus::Ok);
    }

    #[test]
    fn telemetry_trip_and_clear() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.source.set("temp", 55.0);
        let report = r.tick();
        assert_eq!(report.tripped, vec!["A1".to_string()]);
        assert_eq!(report.snapshot.system_severity, SeverityLevel::Trip);
        assert_eq!(report.snapshot.state, SystemState::Fault);
        let a1 = report.snapshot.interlock("A1").unwrap();
        assert_eq!(a1.state.last_trip, Some(r.clock.now()));

        r.source.set("temp", 42.0);
        let report = r.tick();
        assert_eq!(report.cleared, vec!["A1".to_string()]);
        assert_eq!(report.snapshot.system_severity, SeverityLevel::High);
        assert_eq!(report.snapshot.state, SystemState::Ready);
        assert_eq!(
            report.snapshot.interlock("A1").unwrap().status,
            LatchStatus::Latched
        );
    }

    #[test]
    fn absent_sample_leaves_interlock_unchanged() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.source.set("temp", 60.0);
        r.tick();
        r.source.remove("temp");
        let report = r.tick();
        assert!(report.cleared.is_empty());
        let probe = report.snapshot.device("probe").unwrap();
        assert!(!probe.evaluated);
        assert_eq!(probe.severity, SeverityLevel::Ok);
        assert!(report.snapshot.interlock("A1").unwrap().state.active);
        assert_eq!(report.snapshot.state, SystemState::Fault);
    }

    #[test]
    fn rejected_commands_leave_state_untouched() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.send(Command::ManualTrip { id: "Z9".into() });
        r.send(Command::SetActuator {
            id: "drill".into(),
            on: true,
        });
        r.send(Command::ManualTrip { id: "B1".into() });
        let report = r.tick();
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.applied, vec![Command::ManualTrip { id: "B1".into() }]);
        assert!(!report.snapshot.actuators.contains_key("drill"));
    }

    #[test]
    fn require_acknowledge_holds_fault() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::RequireAcknowledge);
        r.send(Command::ManualTrip { id: "A1".into() });
        r.tick();

        r.send(Command::AcknowledgeFault);
        let report = r.tick();
        assert_eq!(report.rejected.len(), 1);

        r.send(Command::ClearCondition { id: "A1".into() });
        let snap = r.tick().snapshot;
        assert!(snap.safety_ok);
        assert_eq!(snap.state, SystemState::Fault);
        assert!(snap.fault_acknowledge_required);

        r.send(Command::AcknowledgeFault);
        let snap = r.tick().snapshot;
        assert_eq!(snap.state, SystemState::Ready);
        assert!(!snap.fault_acknowledge_required);
    }

    #[test]
    fn commands_wait_for_the_next_tick() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.tick();
        let reader = r.engine.subscribe();
        r.send(Command::ManualTrip { id: "A1".into() });
        assert!(reader.latest().safety_ok);
        assert!(!r.engine.registry().state("A1").unwrap().active);
        r.tick();
        assert!(!reader.latest().safety_ok);
        assert_eq!(reader.latest().tick, 2);
    }

    #[test]
    fn apply_is_immediate_but_snapshot_waits() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.engine
            .apply(Command::ManualTrip { id: "A1".into() })
            .unwrap();
        assert!(r.engine.registry().state("A1").unwrap().active);
        assert!(r.engine.snapshot().safety_ok);
        assert!(matches!(
            r.engine.apply(Command::ManualReset { id: "A1".into() }),
            Err(TbmError::ResetWhileActive(_))
        ));
        assert!(matches!(
            r.engine.apply(Command::ManualTrip { id: "nope".into() }),
            Err(TbmError::UnknownInterlock(_))
        ));
    }

    #[test]
    fn unknown_cutter_actuator_rejected() {
        let config = EngineConfig {
            cutter_actuator: "drill".into(),
            ..EngineConfig::default()
        };
        let err = Engine::new(catalog(), config, Box::new(crate::clock::SystemClock)).err();
        assert!(matches!(err, Some(TbmError::UnknownActuator(ref id)) if id == "drill"));
    }

    #[test]
    fn builtin_catalog_runs() {
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let mut engine = Engine::new(
            Catalog::builtin().unwrap(),
            EngineConfig::default(),
            Box::new(clock.clone()),
        )
        .unwrap();
        let mut source = ScriptedSource::new(Arc::new(clock));
        source.set("cutterhead_current", 8.0).set("enclosure_temp", 30.0);
        let report = engine.tick(&mut source);
        assert!(report.tripped.contains(&"B3".to_string()));
        // B3 is not critical, so the machine stays available.
        assert!(report.snapshot.safety_ok);
        assert_eq!(report.snapshot.state, SystemState::Ready);
        assert_eq!(
            report.snapshot.device("enclosure").unwrap().severity,
            SeverityLevel::Ok
        );
    }

    fn temp_device(id: &str, measurement: &str) -> Device {
        Device {
            id: id.into(),
            name: id.into(),
            interlock: Some("A1".into()),
            measurements: vec![Measurement {
                id: measurement.into(),
                unit: Some("C".into()),
                rules: vec![ThresholdRule::new(
                    SeverityLevel::Trip,
                    ThresholdOp::GreaterOrEqual,
                    50.0,
                )],
            }],
        }
    }

    #[test]
    fn tripping_device_wins_over_healthy_device_on_same_interlock() {
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let catalog = Catalog::new(
            vec![def("A1", InterlockSeverity::Critical)],
            vec![Actuator {
                id: "cutterhead".into(),
                name: "Cutterhead".into(),
            }],
            vec![temp_device("motor_a", "temp_a"), temp_device("motor_b", "temp_b")],
        )
        .unwrap();
        let mut engine =
            Engine::new(catalog, EngineConfig::default(), Box::new(clock.clone())).unwrap();
        let mut source = ScriptedSource::new(Arc::new(clock.clone()));

        source.set("temp_a", 90.0).set("temp_b", 20.0);
        let report = engine.tick(&mut source);
        assert_eq!(report.tripped, vec!["A1".to_string()]);
        assert!(report.cleared.is_empty());
        assert!(!report.snapshot.safety_ok);
        assert_eq!(report.snapshot.state, SystemState::Fault);

        // Order of the devices does not matter either.
        source.set("temp_a", 20.0).set("temp_b", 90.0);
        let report = engine.tick(&mut source);
        assert!(report.cleared.is_empty());
        assert!(report.snapshot.interlock("A1").unwrap().state.active);

        source.set("temp_b", 20.0);
        let report = engine.tick(&mut source);
        assert_eq!(report.cleared, vec!["A1".to_string()]);
        assert!(report.snapshot.safety_ok);
    }

    #[test]
    fn non_finite_sample_is_treated_as_absent() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.source.set("temp", 90.0);
        assert!(!r.tick().snapshot.safety_ok);

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            r.source.set("temp", bad);
            let report = r.tick();
            assert!(report.cleared.is_empty());
            assert_eq!(report.absent, vec!["temp".to_string()]);
            let probe = report.snapshot.device("probe").unwrap();
            assert!(!probe.evaluated);
            assert_eq!(probe.measurements[0].value, None);
            assert!(report.snapshot.interlock("A1").unwrap().state.active);
            assert!(!report.snapshot.safety_ok);
        }
    }

    #[test]
    fn manual_trip_of_bound_interlock_survives_healthy_telemetry() {
        let mut r = rig(ResetPolicy::Guarded, FaultPolicy::AutoClear);
        r.source.set("temp", 20.0);
        r.send(Command::ManualTrip { id: "A1".into() });
        let report = r.tick();
        assert_eq!(report.tripped, vec!["A1".to_string()]);
        assert!(report.cleared.is_empty());
        assert!(!report.snapshot.safety_ok);
        assert_eq!(report.snapshot.state, SystemState::Fault);

        assert!(!r.tick().snapshot.safety_ok);

        r.send(Command::ClearCondition { id: "A1".into() });
        let snap = r.tick().snapshot;
        assert!(snap.safety_ok);
        assert_eq!(snap.interlock("A1").unwrap().status, LatchStatus::Latched);

        // Once cleared, telemetry owns the interlock again.
        r.source.set("temp", 60.0);
        assert!(!r.tick().snapshot.safety_ok);
        r.source.set("temp", 20.0);
        assert_eq!(r.tick().cleared, vec!["A1".to_string()]);
    }
}
