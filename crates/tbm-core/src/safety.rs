use crate::interlock::InterlockRegistry;

/// `SAFETY_OK`: true iff no Critical interlock is currently active.
///
/// A latched but inactive critical interlock does not block, and
/// non-critical interlocks never block whatever their state.
pub fn compute_safety_ok(registry: &InterlockRegistry) -> bool {
    !registry
        .iter()
        .any(|(def, state)| def.is_critical() && state.active)
}

/// Ids of the critical interlocks currently holding `SAFETY_OK` false.
pub fn blocking_interlocks(registry: &InterlockRegistry) -> Vec<String> {
    registry
        .iter()
        .filter(|(def, state)| def.is_critical() && state.active)
        .map(|(def, _)| def.id.clone())
        .collect()
}
