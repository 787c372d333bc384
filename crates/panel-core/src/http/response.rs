//! Fixed-buffer rendering of the panel document and the wire headers.
//!
//! Every render reports the number of bytes written or [`BufferFull`];
//! the lengths feed straight into the response framing, so truncation has
//! to surface here instead of going out on the wire.

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

use crate::actuator::{ActuatorId, Levels};

use super::PANEL_PATH;

/// The render would exceed the caller's buffer; nothing usable was produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BufferFull;

/// `core::fmt::Write` adapter over a fixed byte slice.
struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SliceWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    fn finish(self) -> usize {
        self.len
    }
}

impl Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let end = self.len.checked_add(bytes.len()).ok_or(fmt::Error)?;
        if end > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}

const HTML_HEAD: &str = "<html><head><style>\
body{background:#ADD8E6;font-family:Arial,sans-serif;text-align:center;padding:20px}\
h2{color:#333}\
.status{margin:12px 0;font-size:1.1em}\
.btn{background:#007BFF;color:#fff;padding:8px 16px;text-decoration:none;border-radius:5px}\
</style></head><body><h2>BitDogLab Control Panel</h2>";

/// Renders the complete panel document into `buf`.
///
/// Each actuator row shows its current state and one toggle link whose
/// target level is the negation of the current one; the alarm section
/// carries the two fixed action links.
pub fn render_panel_html(levels: Levels, buf: &mut [u8]) -> Result<usize, BufferFull> {
    let mut w = SliceWriter::new(buf);
    match write_panel_body(&mut w, levels) {
        Ok(()) => Ok(w.finish()),
        Err(fmt::Error) => Err(BufferFull),
    }
}

fn write_panel_body(w: &mut SliceWriter<'_>, levels: Levels) -> fmt::Result {
    w.write_str(HTML_HEAD)?;
    for id in ActuatorId::ALL {
        let on = levels.get(id);
        write!(
            w,
            "<div class='status'><p>{}: {}</p>\
             <a class='btn' href=\"?{}={}\">{}</a></div>",
            id.label(),
            if on { "On" } else { "Off" },
            id.query_key(),
            if on { 0 } else { 1 },
            if on { "Turn off" } else { "Turn on" },
        )?;
    }
    w.write_str(
        "<div class='status'><p>Alarm</p>\
         <a class='btn' href=\"?alarm=1\">Engage</a> \
         <a class='btn' href=\"?alarm=0\">Stand down</a></div>",
    )?;
    w.write_str("</body></html>")
}

/// `200 OK` framing for a rendered body. Line endings are bare `\n`,
/// matching the device's wire protocol exactly.
pub fn write_ok_headers(buf: &mut [u8], body_len: usize) -> Result<usize, BufferFull> {
    let mut w = SliceWriter::new(buf);
    match write!(
        w,
        "HTTP/1.1 200 OK\nContent-Length: {body_len}\nContent-Type: text/html\nConnection: close\n\n"
    ) {
        Ok(()) => Ok(w.finish()),
        Err(fmt::Error) => Err(BufferFull),
    }
}

/// `302 Found` pointing back at the panel on the access point's own address.
pub fn write_redirect(buf: &mut [u8], gateway: Ipv4Addr) -> Result<usize, BufferFull> {
    let mut w = SliceWriter::new(buf);
    match write!(
        w,
        "HTTP/1.1 302 Found\nLocation: http://{gateway}{PANEL_PATH}\n\n"
    ) {
        Ok(()) => Ok(w.finish()),
        Err(fmt::Error) => Err(BufferFull),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::BODY_BUF_BYTES;

    fn render(levels: Levels) -> (heapless::Vec<u8, BODY_BUF_BYTES>, usize) {
        let mut buf = [0u8; BODY_BUF_BYTES];
        let len = render_panel_html(levels, &mut buf).expect("panel fits the body buffer");
        let mut out = heapless::Vec::new();
        out.extend_from_slice(&buf[..len]).unwrap();
        (out, len)
    }

    fn body_text(levels: Levels) -> heapless::String<BODY_BUF_BYTES> {
        let (bytes, _) = render(levels);
        let mut text = heapless::String::new();
        text.push_str(core::str::from_utf8(&bytes).unwrap()).unwrap();
        text
    }

    #[test]
    fn document_fits_the_wire_body_buffer() {
        let (_, len) = render(Levels::default());
        assert!(len > 0 && len <= BODY_BUF_BYTES);
    }

    #[test]
    fn toggle_link_negates_the_current_level() {
        let mut levels = Levels::default();
        levels.set(ActuatorId::Red, true);
        let text = body_text(levels);
        assert!(text.contains("Red LED: On"));
        assert!(text.contains("href=\"?red=0\""));

        let text = body_text(Levels::default());
        assert!(text.contains("Red LED: Off"));
        assert!(text.contains("href=\"?red=1\""));
    }

    #[test]
    fn only_the_fixed_actuator_set_is_exposed() {
        let text = body_text(Levels::default());
        for key in ["?red=", "?green=", "?blue=", "?buzzer=", "?alarm="] {
            assert!(text.contains(key), "missing control for {key}");
        }
        // Toggle links exist for exactly the four actuators plus the two
        // alarm actions.
        assert_eq!(text.matches("class='btn'").count(), ActuatorId::COUNT + 2);
    }

    #[test]
    fn undersized_buffer_reports_buffer_full() {
        let mut buf = [0u8; 64];
        assert_eq!(render_panel_html(Levels::default(), &mut buf), Err(BufferFull));
    }

    #[test]
    fn ok_headers_are_bit_exact() {
        let mut buf = [0u8; 128];
        let len = write_ok_headers(&mut buf, 321).unwrap();
        assert_eq!(
            &buf[..len],
            b"HTTP/1.1 200 OK\nContent-Length: 321\nContent-Type: text/html\nConnection: close\n\n"
        );
    }

    #[test]
    fn redirect_targets_the_gateway_panel() {
        let mut buf = [0u8; 128];
        let len = write_redirect(&mut buf, Ipv4Addr::new(192, 168, 4, 1)).unwrap();
        assert_eq!(
            &buf[..len],
            b"HTTP/1.1 302 Found\nLocation: http://192.168.4.1/bitdoglabtest\n\n"
        );
    }
}
