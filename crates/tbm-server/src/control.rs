use std::sync::Arc;
use std::time::Duration;
use tbm_core::engine::{Engine, EngineSnapshot};
use tbm_core::telemetry::TelemetrySource;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Drive `engine` at its configured tick interval until the task is aborted.
///
/// Every committed snapshot is broadcast on `events`. A late tick is skipped
/// rather than bursted, so a slow host never runs back-to-back evaluations.
pub fn spawn(
    mut engine: Engine,
    mut source: Box<dyn TelemetrySource>,
    events: broadcast::Sender<Arc<EngineSnapshot>>,
) -> JoinHandle<()> {
    let period = Duration::from_millis(engine.config().tick_interval_ms.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_ms = period.as_millis() as u64, "control loop started");
        loop {
            interval.tick().await;
            let report = engine.tick(source.as_mut());
            if report.transition.changed || !report.tripped.is_empty() {
                tracing::info!(
                    tick = report.tick,
                    state = %report.snapshot.state,
                    safety_ok = report.snapshot.safety_ok,
                    tripped = ?report.tripped,
                    "tick"
                );
            }
            // No subscribers is fine.
            let _ = events.send(report.snapshot);
        }
    })
}
