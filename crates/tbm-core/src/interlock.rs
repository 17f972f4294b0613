use crate::catalog::{Catalog, InterlockDefinition};
use crate::error::{Result, TbmError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ResetPolicy
// ---------------------------------------------------------------------------

/// Whether `reset` may clear an interlock whose field condition is still
/// asserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Reset is refused while the interlock is active.
    #[default]
    Guarded,
    /// Reset always succeeds. Simulation only.
    Permissive,
}

impl fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResetPolicy::Guarded => "guarded",
            ResetPolicy::Permissive => "permissive",
        })
    }
}

// ---------------------------------------------------------------------------
// InterlockState
// ---------------------------------------------------------------------------

/// Runtime state of one interlock. `active` implies `latched`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterlockState {
    pub active: bool,
    pub latched: bool,
    pub last_trip: Option<DateTime<Utc>>,
}

impl InterlockState {
    pub fn status(&self) -> LatchStatus {
        if self.active {
            LatchStatus::Active
        } else if self.latched {
            LatchStatus::Latched
        } else {
            LatchStatus::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatchStatus {
    Ok,
    Latched,
    Active,
}

impl fmt::Display for LatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LatchStatus::Ok => "OK",
            LatchStatus::Latched => "LATCHED",
            LatchStatus::Active => "ACTIVE",
        })
    }
}

/// Definition and state together, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterlockStatus {
    #[serde(flatten)]
    pub definition: InterlockDefinition,
    pub state: InterlockState,
    pub status: LatchStatus,
}

// ---------------------------------------------------------------------------
// InterlockRegistry
// ---------------------------------------------------------------------------

/// Catalog of interlock definitions plus their mutable runtime state.
///
/// Definitions are shared behind an `Arc`, so cloning a registry copies only
/// the state vector. The engine relies on that to stage a tick on a copy.
#[derive(Debug, Clone)]
pub struct InterlockRegistry {
    definitions: Arc<[InterlockDefinition]>,
    index: Arc<HashMap<String, usize>>,
    states: Vec<InterlockState>,
    reset_policy: ResetPolicy,
}

impl InterlockRegistry {
    pub fn new(definitions: Vec<InterlockDefinition>, reset_policy: ResetPolicy) -> Result<Self> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(TbmError::DuplicateId(def.id.clone()));
            }
        }
        let states = vec![InterlockState::default(); definitions.len()];
        Ok(Self {
            definitions: definitions.into(),
            index: Arc::new(index),
            states,
            reset_policy,
        })
    }

    pub fn from_catalog(catalog: &Catalog, reset_policy: ResetPolicy) -> Result<Self> {
        Self::new(catalog.interlocks.clone(), reset_policy)
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy
    }

    fn slot(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| TbmError::UnknownInterlock(id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Assert the interlock. Re-tripping only refreshes `last_trip`.
    pub fn trip(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let i = self.slot(id)?;
        let state = &mut self.states[i];
        if !state.active {
            tracing::info!(
                interlock = id,
                severity = %self.definitions[i].severity,
                "interlock tripped"
            );
        }
        state.active = true;
        state.latched = true;
        state.last_trip = Some(at);
        Ok(())
    }

    /// Acknowledge and clear the interlock.
    ///
    /// Under `ResetPolicy::Guarded` an interlock that is still active is left
    /// untouched and `ResetWhileActive` is returned.
    pub fn reset(&mut self, id: &str) -> Result<()> {
        let i = self.slot(id)?;
        let state = &mut self.states[i];
        if state.active && self.reset_policy == ResetPolicy::Guarded {
            return Err(TbmError::ResetWhileActive(id.to_string()));
        }
        if state.latched {
            tracing::info!(interlock = id, policy = %self.reset_policy, "interlock reset");
        }
        state.active = false;
        state.latched = false;
        Ok(())
    }

    /// The field condition went away. The latch stays until `reset`.
    pub fn clear_condition(&mut self, id: &str) -> Result<()> {
        let i = self.slot(id)?;
        let state = &mut self.states[i];
        if state.active {
            tracing::info!(interlock = id, "interlock condition cleared, latch held");
        }
        state.active = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self, id: &str) -> Result<&InterlockState> {
        let i = self.slot(id)?;
        Ok(&self.states[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Copy of every state keyed by id.
    pub fn states(&self) -> BTreeMap<String, InterlockState> {
        self.definitions
            .iter()
            .zip(&self.states)
            .map(|(d, s)| (d.id.clone(), *s))
            .collect()
    }

    /// Definitions in catalog order.
    pub fn definitions(&self) -> &[InterlockDefinition] {
        &self.definitions
    }

    /// Definition/state pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&InterlockDefinition, &InterlockState)> {
        self.definitions.iter().zip(self.states.iter())
    }

    pub fn statuses(&self) -> Vec<InterlockStatus> {
        self.iter()
            .map(|(d, s)| InterlockStatus {
                definition: d.clone(),
                state: *s,
                status: s.status(),
            })
            .collect()
    }

    pub fn latched_count(&self) -> usize {
        self.states.iter().filter(|s| s.latched).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
