//! Pure control-panel logic: actuator state, the alarm oscillator session,
//! and the bounded HTTP surface that drives both.
//!
//! Nothing in this crate touches hardware or sockets. The board binary
//! supplies an [`actuator::OutputPort`] for the physical output lines, feeds
//! received bytes into [`http::handle_request`], and renders the
//! [`status::StatusScreen`] values this crate hands back.
#![no_std]

pub mod actuator;
pub mod alarm;
pub mod http;
pub mod panel;
pub mod status;
