use std::sync::Arc;
use tbm_core::catalog::Catalog;
use tbm_core::command::{Command, CommandSender};
use tbm_core::config::EngineConfig;
use tbm_core::engine::{Engine, EngineSnapshot, SnapshotReader};
use tokio::sync::broadcast;

use crate::error::AppError;

/// Shared application state passed to all route handlers.
///
/// Handlers never touch the engine directly: they read the last committed
/// snapshot and queue commands for the control loop.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub config: Arc<EngineConfig>,
    pub snapshots: SnapshotReader,
    pub commands: CommandSender,
    pub event_tx: broadcast::Sender<Arc<EngineSnapshot>>,
}

impl AppState {
    pub fn new(engine: &Engine) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            catalog: Arc::clone(engine.catalog()),
            config: Arc::new(engine.config().clone()),
            snapshots: engine.subscribe(),
            commands: engine.sender(),
            event_tx: tx,
        }
    }

    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.snapshots.latest()
    }

    /// Queue a command for the next tick.
    pub fn enqueue(&self, command: Command) -> Result<(), AppError> {
        tracing::debug!(command = %command, "command queued");
        if self.commands.send(command) {
            Ok(())
        } else {
            Err(AppError::unavailable("control loop is not running"))
        }
    }
}
