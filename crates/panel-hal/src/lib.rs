//! Board-facing adapters for the control panel: GPIO actuator outputs and
//! the SSD1306 status display. Everything here is written against
//! `embedded-hal 1.0` traits; the firmware binary supplies concrete pins
//! and buses.
#![no_std]

pub mod display;
pub mod outputs;
