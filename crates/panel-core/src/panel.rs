//! The panel binds the actuator store and the alarm session behind one
//! mutation surface shared by the request path and the oscillator tick.

use log::debug;

use crate::{
    actuator::{ActuatorId, ActuatorStore, Levels, OutputPort},
    alarm::AlarmSession,
    http::params::Command,
    status::StatusScreen,
};

/// Oscillator tick interval.
pub const ALARM_TICK_MS: u64 = 500;

/// Outcome of one oscillator tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AlarmTick {
    /// A stop request was observed; RED and BUZZER are forced low and the
    /// tick source should stand down.
    Stopped,
    /// RED and BUZZER were driven to the carried phase, in lockstep.
    Blink(bool),
}

/// Result of applying a decoded command batch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Applied {
    /// A fresh engage happened; the caller must arm the periodic tick.
    pub alarm_engaged: bool,
}

pub struct Panel<P: OutputPort> {
    actuators: ActuatorStore<P>,
    alarm: AlarmSession,
}

impl<P: OutputPort> Panel<P> {
    pub fn new(port: P) -> Self {
        Self {
            actuators: ActuatorStore::new(port),
            alarm: AlarmSession::new(),
        }
    }

    pub fn snapshot(&self) -> Levels {
        self.actuators.snapshot()
    }

    pub fn levels_screen(&self) -> StatusScreen {
        StatusScreen::Levels(self.snapshot())
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm.is_active()
    }

    pub fn set_actuator(&mut self, id: ActuatorId, level: bool) {
        self.actuators.set(id, level);
    }

    /// Arms the alarm. Returns `false` on a re-engage so only one tick
    /// source ever exists. A fresh engage baselines RED and BUZZER low.
    pub fn engage_alarm(&mut self) -> bool {
        if !self.alarm.engage() {
            debug!("alarm engage ignored; already running");
            return false;
        }
        self.actuators.set(ActuatorId::Red, false);
        self.actuators.set(ActuatorId::Buzzer, false);
        true
    }

    /// Synchronous stand-down used by the request path: unlike the deferred
    /// tick-side clear, this forces RED and BUZZER low immediately.
    pub fn disengage_alarm(&mut self) {
        self.alarm.request_stop();
        self.actuators.set(ActuatorId::Red, false);
        self.actuators.set(ActuatorId::Buzzer, false);
    }

    /// One oscillator tick, driving both blink outputs together.
    pub fn alarm_tick(&mut self) -> AlarmTick {
        match self.alarm.tick() {
            Some(phase) => {
                self.actuators.set(ActuatorId::Red, phase);
                self.actuators.set(ActuatorId::Buzzer, phase);
                AlarmTick::Blink(phase)
            }
            None => {
                self.actuators.set(ActuatorId::Red, false);
                self.actuators.set(ActuatorId::Buzzer, false);
                AlarmTick::Stopped
            }
        }
    }

    pub fn apply_commands(&mut self, commands: &[Command]) -> Applied {
        let mut applied = Applied::default();
        for &command in commands {
            match command {
                Command::Set(id, level) => self.set_actuator(id, level),
                Command::Alarm(true) => {
                    applied.alarm_engaged |= self.engage_alarm();
                }
                Command::Alarm(false) => self.disengage_alarm(),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePort;

    impl OutputPort for FakePort {
        fn set_level(&mut self, _id: ActuatorId, _level: bool) {}
    }

    fn panel() -> Panel<FakePort> {
        Panel::new(FakePort)
    }

    #[test]
    fn engaging_twice_arms_a_single_oscillator() {
        let mut panel = panel();
        assert!(panel.engage_alarm());
        assert!(!panel.engage_alarm());
        assert!(panel.alarm_active());
    }

    #[test]
    fn ticks_keep_red_and_buzzer_in_lockstep() {
        let mut panel = panel();
        panel.engage_alarm();
        for _ in 0..5 {
            panel.alarm_tick();
            let snap = panel.snapshot();
            assert_eq!(snap.get(ActuatorId::Red), snap.get(ActuatorId::Buzzer));
        }
    }

    #[test]
    fn deferred_disengage_quiesces_on_the_observing_tick() {
        let mut panel = panel();
        panel.engage_alarm();
        assert_eq!(panel.alarm_tick(), AlarmTick::Blink(true));
        panel.disengage_alarm();
        assert_eq!(panel.alarm_tick(), AlarmTick::Stopped);
        let snap = panel.snapshot();
        assert!(!snap.get(ActuatorId::Red));
        assert!(!snap.get(ActuatorId::Buzzer));
        assert!(!panel.alarm_active());
    }

    #[test]
    fn request_path_disengage_clears_outputs_synchronously() {
        let mut panel = panel();
        panel.engage_alarm();
        panel.alarm_tick();
        assert!(panel.snapshot().get(ActuatorId::Red));
        panel.disengage_alarm();
        let snap = panel.snapshot();
        assert!(!snap.get(ActuatorId::Red));
        assert!(!snap.get(ActuatorId::Buzzer));
    }

    #[test]
    fn re_engage_during_the_stop_window_keeps_one_oscillator() {
        let mut panel = panel();
        panel.engage_alarm();
        assert_eq!(panel.alarm_tick(), AlarmTick::Blink(true));
        panel.disengage_alarm();
        // Engage again before any tick observes the stop: this is a fresh
        // engage, and the already-running tick source keeps servicing it.
        assert!(panel.engage_alarm());
        assert_eq!(panel.alarm_tick(), AlarmTick::Blink(true));
        assert!(panel.alarm_active());
    }

    #[test]
    fn tick_on_an_idle_session_clobbers_request_writes() {
        // The tick-side clear is unconditional, so a tick source must never
        // outlive its session: the caller has to check `alarm_active` before
        // ticking an idle panel.
        let mut panel = panel();
        panel.engage_alarm();
        panel.alarm_tick();
        panel.disengage_alarm();
        assert_eq!(panel.alarm_tick(), AlarmTick::Stopped);

        panel.set_actuator(ActuatorId::Red, true);
        panel.set_actuator(ActuatorId::Buzzer, true);
        assert!(!panel.alarm_active());
        assert_eq!(panel.alarm_tick(), AlarmTick::Stopped);
        assert!(!panel.snapshot().get(ActuatorId::Red));
    }

    #[test]
    fn engage_does_not_touch_green_or_blue() {
        let mut panel = panel();
        panel.set_actuator(ActuatorId::Green, true);
        panel.set_actuator(ActuatorId::Blue, true);
        panel.engage_alarm();
        let snap = panel.snapshot();
        assert!(snap.get(ActuatorId::Green));
        assert!(snap.get(ActuatorId::Blue));
    }
}
