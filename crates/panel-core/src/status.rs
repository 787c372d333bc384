//! Status-display view models consumed by the board renderer.
//!
//! The core computes what the display should show next; turning that into
//! pixels is the board's job, so the state machines stay testable without a
//! display collaborator.

use crate::actuator::Levels;

/// What the status display should show next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusScreen {
    /// Per-actuator on/off readout: boot screen, request-path refresh, and
    /// the rest screen after the alarm stands down.
    Levels(Levels),
    /// Evacuate banner while the alarm oscillator runs; `phase` follows the
    /// blinking outputs so the banner flashes in lockstep.
    Evacuate { phase: bool },
}
