use crate::error::{Result, TbmError};
use crate::types::SystemState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The per-tick transition table.
///
/// | safety_ok | cutter on | next    |
/// |-----------|-----------|---------|
/// | false     | any       | FAULT   |
/// | true      | true      | RUNNING |
/// | true      | false     | READY   |
///
/// Never returns `Idle`.
pub fn next_state(safety_ok: bool, cutter_commanded_on: bool) -> SystemState {
    match (safety_ok, cutter_commanded_on) {
        (false, _) => SystemState::Fault,
        (true, true) => SystemState::Running,
        (true, false) => SystemState::Ready,
    }
}

// ---------------------------------------------------------------------------
// FaultPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// FAULT clears the tick `safety_ok` returns.
    #[default]
    AutoClear,
    /// FAULT holds until an operator acknowledges it while safe.
    RequireAcknowledge,
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultPolicy::AutoClear => "auto_clear",
            FaultPolicy::RequireAcknowledge => "require_acknowledge",
        })
    }
}

// ---------------------------------------------------------------------------
// SystemStateMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: SystemState,
    pub to: SystemState,
    pub changed: bool,
}

/// Owns the current `SystemState` and the time it last changed.
#[derive(Debug, Clone)]
pub struct SystemStateMachine {
    state: SystemState,
    changed_at: Option<DateTime<Utc>>,
    policy: FaultPolicy,
    awaiting_ack: bool,
    ack_received: bool,
}

impl SystemStateMachine {
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            state: SystemState::Idle,
            changed_at: None,
            policy,
            awaiting_ack: false,
            ack_received: false,
        }
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        self.changed_at
    }

    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// True while FAULT is held waiting for an operator acknowledgement.
    pub fn awaiting_acknowledge(&self) -> bool {
        self.awaiting_ack
    }

    /// Record an operator acknowledgement for the next evaluation.
    ///
    /// A no-op when nothing is held. Refused while unsafe, since the fault
    /// would immediately re-latch anyway.
    pub fn acknowledge(&mut self, safety_ok: bool) -> Result<()> {
        if !self.awaiting_ack {
            return Ok(());
        }
        if !safety_ok {
            return Err(TbmError::AcknowledgeWhileUnsafe);
        }
        self.ack_received = true;
        Ok(())
    }

    /// Derive the state for this tick and record a change timestamp.
    pub fn evaluate(
        &mut self,
        safety_ok: bool,
        cutter_commanded_on: bool,
        at: DateTime<Utc>,
    ) -> Transition {
        let computed = next_state(safety_ok, cutter_commanded_on);
        let next = match self.policy {
            FaultPolicy::AutoClear => computed,
            FaultPolicy::RequireAcknowledge => {
                if computed == SystemState::Fault {
                    self.awaiting_ack = true;
                    self.ack_received = false;
                    computed
                } else if self.awaiting_ack && !self.ack_received {
                    SystemState::Fault
                } else {
                    self.awaiting_ack = false;
                    self.ack_received = false;
                    computed
                }
            }
        };

        let from = self.state;
        let changed = from != next;
        if changed {
            self.state = next;
            self.changed_at = Some(at);
            tracing::info!(from = %from, to = %next, safety_ok, "system state changed");
        }
        Transition {
            from,
            to: next,
            changed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
