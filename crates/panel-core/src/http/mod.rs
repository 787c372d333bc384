//! The HTTP-like surface: one bounded request in, one framed response out.

pub mod params;
pub mod request;
pub mod response;


use core::net::Ipv4Addr;

use log::debug;

use crate::{actuator::OutputPort, panel::Panel, status::StatusScreen};

use params::decode_query;
use request::parse_request_line;
use response::{render_panel_html, write_ok_headers, write_redirect};

/// The single recognized target.
pub const PANEL_PATH: &str = "/bitdoglabtest";

/// Receive/header buffer capacity. Anything past this is truncated by the
/// byte-receive layer before parsing.
pub const HEADER_BUF_BYTES: usize = 128;
/// Body buffer capacity; the rendered panel must fit or the request folds
/// into the redirect path.
pub const BODY_BUF_BYTES: usize = 1024;

/// Per-connection transient state: bounded header and body buffers plus the
/// framing lengths computed for them. One instance per accepted socket.
/// The body capacity is a const parameter defaulting to the wire size.
pub struct ConnectionContext<const BODY: usize = BODY_BUF_BYTES> {
    headers: [u8; HEADER_BUF_BYTES],
    body: [u8; BODY],
    header_len: usize,
    body_len: usize,
}

impl<const BODY: usize> ConnectionContext<BODY> {
    pub const fn new() -> Self {
        Self {
            headers: [0; HEADER_BUF_BYTES],
            body: [0; BODY],
            header_len: 0,
            body_len: 0,
        }
    }

    pub fn header_bytes(&self) -> &[u8] {
        &self.headers[..self.header_len]
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body[..self.body_len]
    }
}

impl<const BODY: usize> Default for ConnectionContext<BODY> {
    fn default() -> Self {
        Self::new()
    }
}

/// Side effects the caller owes after a handled request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RequestEffects {
    /// Display refresh to publish, at most one per request.
    pub screen: Option<StatusScreen>,
    /// A fresh alarm engage happened; the oscillator tick must be armed.
    pub alarm_engaged: bool,
}

/// Runs one parse → mutate → respond cycle over the received bytes.
///
/// Exactly one response is framed into `ctx`: the panel document for the
/// recognized path, or a redirect to the panel on the gateway address for
/// everything else (malformed request line, unroutable path, empty render,
/// body-buffer overflow). Never fails; anomalies fold into the redirect.
pub fn handle_request<P: OutputPort, const BODY: usize>(
    panel: &mut Panel<P>,
    raw: &[u8],
    gateway: Ipv4Addr,
    ctx: &mut ConnectionContext<BODY>,
) -> RequestEffects {
    let mut effects = RequestEffects::default();
    ctx.body_len = 0;

    let routed = match parse_request_line(raw) {
        Some(line) if line.path == PANEL_PATH => Some(line),
        Some(line) => {
            debug!("no route for {}; redirecting", line.path);
            None
        }
        None => {
            debug!("unparsable request line; redirecting");
            None
        }
    };

    if let Some(line) = routed {
        if let Some(query) = line.query {
            let commands = decode_query(query);
            if !commands.is_empty() {
                let applied = panel.apply_commands(&commands);
                effects.alarm_engaged = applied.alarm_engaged;
                // One display refresh per successful decode, as the final
                // step of the mutation pass.
                effects.screen = Some(panel.levels_screen());
            }
        }
        match render_panel_html(panel.snapshot(), &mut ctx.body) {
            Ok(len) => ctx.body_len = len,
            Err(response::BufferFull) => {
                debug!("panel body exceeds {} bytes; redirecting", BODY);
            }
        }
    }

    let framed = if ctx.body_len > 0 {
        write_ok_headers(&mut ctx.headers, ctx.body_len)
    } else {
        write_redirect(&mut ctx.headers, gateway)
    };
    ctx.header_len = match framed {
        Ok(len) => len,
        // Unreachable with the fixed header formats, but a truncated header
        // must never reach the wire.
        Err(response::BufferFull) => 0,
    };

    effects
}
