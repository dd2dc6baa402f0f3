//! Pure phase-advancement policy.

use super::types::{PhaseConfig, ThinkingStep};

/// Confidence above which the most recent step completes its phase early.
pub const ADVANCE_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Decide whether a phase is ready to advance.
///
/// A phase is eligible only once it holds at least `min_steps` steps. Given
/// eligibility, it advances when it has reached `max_steps`, or when the most
/// recent step's confidence exceeds [`ADVANCE_CONFIDENCE_THRESHOLD`].
pub fn should_advance(phase_steps: &[&ThinkingStep], phase: &PhaseConfig) -> bool {
    if phase_steps.len() < phase.min_steps {
        return false;
    }
    if phase_steps.len() >= phase.max_steps {
        return true;
    }
    phase_steps
        .last()
        .map(|s| s.confidence > ADVANCE_CONFIDENCE_THRESHOLD)
        .unwrap_or(false)
}
