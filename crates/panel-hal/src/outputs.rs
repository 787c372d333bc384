//! Actuator output lines over `embedded-hal` digital pins.

use embedded_hal::digital::OutputPin;
use panel_core::actuator::{ActuatorId, OutputPort};

/// The four board GPIOs driving the panel actuators.
pub struct BoardOutputs<P: OutputPin> {
    red: P,
    green: P,
    blue: P,
    buzzer: P,
}

impl<P: OutputPin> BoardOutputs<P> {
    pub fn new(red: P, green: P, blue: P, buzzer: P) -> Self {
        Self {
            red,
            green,
            blue,
            buzzer,
        }
    }

    fn pin_mut(&mut self, id: ActuatorId) -> &mut P {
        match id {
            ActuatorId::Red => &mut self.red,
            ActuatorId::Green => &mut self.green,
            ActuatorId::Blue => &mut self.blue,
            ActuatorId::Buzzer => &mut self.buzzer,
        }
    }
}

impl<P: OutputPin> OutputPort for BoardOutputs<P> {
    fn set_level(&mut self, id: ActuatorId, level: bool) {
        // Push-pull GPO writes are infallible on this hardware (the esp-hal
        // pin error type is `Infallible`), matching the seam's contract.
        let pin = self.pin_mut(id);
        let _ = if level { pin.set_high() } else { pin.set_low() };
    }
}
