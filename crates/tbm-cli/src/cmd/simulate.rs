use crate::output::{list_cell, print_json, print_table};
use crate::root::Loaded;
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tbm_core::clock::ManualClock;
use tbm_core::command::Command;
use tbm_core::config::EngineConfig;
use tbm_core::engine::{Engine, TickReport};
use tbm_core::telemetry::{ScriptedSource, SimulatedSource};

const DEFAULT_TICKS: u64 = 10;
const MAX_TICKS: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Scenario file
// ---------------------------------------------------------------------------

/// A scripted run. Values set in a step persist until changed or removed;
/// commands are queued just before their tick.
#[derive(Debug, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub tick: u64,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub set: BTreeMap<String, f64>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read scenario {}", path.display()))?;
        serde_yaml::from_str(&data).with_context(|| format!("invalid scenario {}", path.display()))
    }

    fn last_tick(&self) -> Option<u64> {
        self.steps.iter().map(|s| s.tick).max()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub struct SimulateArgs {
    pub ticks: Option<u64>,
    pub scenario: Option<PathBuf>,
    pub cutter_on: bool,
    pub dropout: f64,
    pub seed: Option<u64>,
}

pub fn run(config: Option<&Path>, args: SimulateArgs, json: bool) -> anyhow::Result<()> {
    let loaded = Loaded::load(config)?;
    let catalog = loaded.catalog()?;
    // Without a config file the desk simulator runs permissive.
    let engine_config = match loaded.path {
        Some(_) => loaded.config,
        None => EngineConfig::simulation(),
    };
    let step = Duration::milliseconds(engine_config.tick_interval_ms as i64);
    let cutter = engine_config.cutter_actuator.clone();

    let scenario = args.scenario.as_deref().map(Scenario::load).transpose()?;
    let ticks = args
        .ticks
        .or_else(|| scenario.as_ref().and_then(|s| s.ticks))
        .or_else(|| scenario.as_ref().and_then(Scenario::last_tick))
        .unwrap_or(DEFAULT_TICKS);
    if ticks > MAX_TICKS {
        anyhow::bail!("--ticks {ticks} exceeds the limit of {MAX_TICKS}");
    }

    let clock = ManualClock::new(Utc::now());
    let mut engine = Engine::new(catalog, engine_config, Box::new(clock.clone()))?;
    let sender = engine.sender();

    let mut scripted = scenario
        .as_ref()
        .map(|_| ScriptedSource::new(Arc::new(clock.clone())));
    let mut simulated =
        SimulatedSource::tbm(args.seed, Arc::new(clock.clone())).with_dropout(args.dropout);

    if args.cutter_on {
        sender.send(Command::SetActuator {
            id: cutter,
            on: true,
        });
    }

    tracing::debug!(ticks, scripted = scripted.is_some(), "simulation starting");

    let mut reports = Vec::new();
    for n in 1..=ticks {
        if let Some(s) = &scenario {
            for st in s.steps.iter().filter(|st| st.tick == n) {
                for cmd in &st.commands {
                    sender.send(cmd.clone());
                }
                if let Some(src) = scripted.as_mut() {
                    for (id, value) in &st.set {
                        src.set(id.clone(), *value);
                    }
                    for id in &st.remove {
                        src.remove(id);
                    }
                }
            }
        }

        clock.advance(step);
        let report = match scripted.as_mut() {
            Some(src) => engine.tick(src),
            None => engine.tick(&mut simulated),
        };
        reports.push(report);
    }

    if json {
        let out: Vec<serde_json::Value> = reports.iter().map(report_json).collect();
        return print_json(&out);
    }

    let rows: Vec<Vec<String>> = reports.iter().map(report_row).collect();
    print_table(
        &[
            "TICK", "STATE", "SAFETY", "SEVERITY", "TRIPPED", "CLEARED", "BLOCKING",
        ],
        &rows,
    );
    for r in &reports {
        for rej in &r.rejected {
            println!("tick {}: rejected {}: {}", r.tick, rej.command, rej.error);
        }
    }
    let last = engine.snapshot();
    println!(
        "\nFinal state: {} (safety_ok={}, latched={})",
        last.state,
        last.safety_ok,
        engine.registry().latched_count()
    );
    Ok(())
}

fn report_row(r: &TickReport) -> Vec<String> {
    let snap = &r.snapshot;
    vec![
        r.tick.to_string(),
        snap.state.to_string(),
        if snap.safety_ok { "OK" } else { "BLOCKED" }.to_string(),
        snap.system_severity.to_string(),
        list_cell(&r.tripped),
        list_cell(&r.cleared),
        list_cell(&snap.blocking),
    ]
}

fn report_json(r: &TickReport) -> serde_json::Value {
    let snap = &r.snapshot;
    serde_json::json!({
        "tick": r.tick,
        "evaluated_at": snap.evaluated_at,
        "state": snap.state,
        "safety_ok": snap.safety_ok,
        "system_severity": snap.system_severity,
        "blocking": snap.blocking,
        "fault_acknowledge_required": snap.fault_acknowledge_required,
        "tripped": r.tripped,
        "cleared": r.cleared,
        "absent": r.absent,
        "applied": r.applied,
        "rejected": r.rejected,
        "actuators": snap.actuators,
    })
}
