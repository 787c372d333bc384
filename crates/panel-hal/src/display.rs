//! SSD1306 status renderer: per-actuator readout and the evacuate banner.

use core::fmt::Write;

use log::warn;
use panel_core::{
    actuator::{ActuatorId, Levels},
    status::StatusScreen,
};
use ssd1306::{mode::TerminalMode, prelude::*, Ssd1306};

/// The display could not be driven or a line did not fit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayFault {
    Interface,
    Format,
}

/// Board-level status display: a 128x64 SSD1306 in terminal mode.
pub struct StatusDisplay<DI> {
    display: Ssd1306<DI, DisplaySize128x64, TerminalMode>,
    fault_logged: bool,
}

impl<DI: WriteOnlyDataCommand> StatusDisplay<DI> {
    pub fn new(interface: DI) -> Self {
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_terminal_mode();
        Self {
            display,
            fault_logged: false,
        }
    }

    /// Brings the panel up in terminal mode and blanks it.
    pub fn initialize(&mut self) -> Result<(), DisplayFault> {
        self.display.init().map_err(|_| DisplayFault::Interface)?;
        self.display.clear().map_err(|_| DisplayFault::Interface)
    }

    /// Renders one screen. Faults are logged once and otherwise ignored:
    /// the panel keeps serving without a working display.
    pub fn show(&mut self, screen: StatusScreen) {
        if let Err(fault) = self.render(screen)
            && !self.fault_logged
        {
            warn!("status display fault: {:?}", fault);
            self.fault_logged = true;
        }
    }

    fn render(&mut self, screen: StatusScreen) -> Result<(), DisplayFault> {
        self.display.clear().map_err(|_| DisplayFault::Interface)?;
        match screen {
            StatusScreen::Levels(levels) => self.render_levels(levels),
            StatusScreen::Evacuate { phase } => self.render_evacuate(phase),
        }
    }

    fn render_levels(&mut self, levels: Levels) -> Result<(), DisplayFault> {
        for (row, id) in ActuatorId::ALL.into_iter().enumerate() {
            // One actuator per line, double-spaced on the 8-row terminal.
            self.set_position(0, (row * 2) as u8)?;
            let state = if levels.get(id) { "ON" } else { "OFF" };
            write!(self.display, "{:<8}{}", line_name(id), state)
                .map_err(|_| DisplayFault::Format)?;
        }
        Ok(())
    }

    fn render_evacuate(&mut self, phase: bool) -> Result<(), DisplayFault> {
        // The banner flashes in lockstep with the blinking outputs; the
        // footer stays put so the screen is never fully blank.
        if phase {
            self.set_position(1, 2)?;
            self.display
                .write_str(">> EVACUATE <<")
                .map_err(|_| DisplayFault::Format)?;
        }
        self.set_position(2, 5)?;
        self.display
            .write_str("ALARM ACTIVE")
            .map_err(|_| DisplayFault::Format)
    }

    fn set_position(&mut self, column: u8, row: u8) -> Result<(), DisplayFault> {
        self.display
            .set_position(column, row)
            .map_err(|_| DisplayFault::Interface)
    }
}

fn line_name(id: ActuatorId) -> &'static str {
    match id {
        ActuatorId::Red => "RED",
        ActuatorId::Green => "GREEN",
        ActuatorId::Blue => "BLUE",
        ActuatorId::Buzzer => "BUZZER",
    }
}
