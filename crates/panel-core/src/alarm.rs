//! Alarm oscillator session state.
//!
//! The session only tracks engage/disengage intent and the blink phase;
//! periodic scheduling belongs to the caller. `request_stop` clears the
//! active flag and nothing else: the outputs quiesce when the next tick
//! observes the flag, at most one tick interval later.

/// Run state of the blinking alarm.
#[derive(Debug, Default)]
pub struct AlarmSession {
    active: bool,
    phase: bool,
}

impl AlarmSession {
    pub const fn new() -> Self {
        Self {
            active: false,
            phase: false,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub const fn phase(&self) -> bool {
        self.phase
    }

    /// Arms the session. Returns `false` when the oscillator is already
    /// running: re-engaging is a no-op and must not reset the phase or
    /// schedule a second tick source.
    pub fn engage(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.phase = false;
        true
    }

    /// Marks the session inactive. Deliberately deferred: the tick that
    /// observes the cleared flag does the actual quiescing.
    pub fn request_stop(&mut self) {
        self.active = false;
    }

    /// One periodic tick. `None` means a stop request was observed and the
    /// session is now idle; `Some(phase)` is the new lockstep phase for the
    /// blinking outputs.
    pub fn tick(&mut self) -> Option<bool> {
        if !self.active {
            self.phase = false;
            return None;
        }
        self.phase = !self.phase;
        Some(self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engage_is_idempotent() {
        let mut session = AlarmSession::new();
        assert!(session.engage());
        assert_eq!(session.tick(), Some(true));
        // A second engage must not reset the phase mid-run.
        assert!(!session.engage());
        assert_eq!(session.tick(), Some(false));
    }

    #[test]
    fn ticks_alternate_phase() {
        let mut session = AlarmSession::new();
        session.engage();
        assert_eq!(session.tick(), Some(true));
        assert_eq!(session.tick(), Some(false));
        assert_eq!(session.tick(), Some(true));
    }

    #[test]
    fn stop_is_observed_on_the_next_tick() {
        let mut session = AlarmSession::new();
        session.engage();
        assert_eq!(session.tick(), Some(true));
        session.request_stop();
        // The session stays formally active=false but the outputs are only
        // settled by this observing tick.
        assert_eq!(session.tick(), None);
        assert!(!session.is_active());
        assert!(!session.phase());
    }

    #[test]
    fn tick_without_engage_stays_idle() {
        let mut session = AlarmSession::new();
        assert_eq!(session.tick(), None);
    }

    #[test]
    fn re_engage_after_stop_starts_from_a_fresh_phase() {
        let mut session = AlarmSession::new();
        session.engage();
        session.tick();
        session.request_stop();
        session.tick();
        assert!(session.engage());
        assert_eq!(session.tick(), Some(true));
    }
}
