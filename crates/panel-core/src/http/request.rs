//! Request-line extraction from a bounded receive buffer.

/// Method and split target of the first request line. Borrowed from the
/// connection's receive buffer; discarded when the connection closes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

/// Parses the first line of `raw`: method and target split on whitespace,
/// target split on the first `?` into path and optional query.
///
/// The buffer is already truncated to the receive capacity, so an
/// over-length request line parses as whatever fit; that is accepted rather
/// than treated as an error. A line with no method/target pair yields `None`
/// and the caller treats it as "no route matched".
pub fn parse_request_line(raw: &[u8]) -> Option<RequestLine<'_>> {
    let text = match core::str::from_utf8(raw) {
        Ok(text) => text,
        // Truncation can split a multi-byte sequence; keep the valid prefix.
        Err(err) => core::str::from_utf8(&raw[..err.valid_up_to()]).unwrap_or(""),
    };

    let line = text.lines().next().unwrap_or("");
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    Some(RequestLine {
        method,
        path,
        query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_method_path_and_query() {
        let line = parse_request_line(b"GET /bitdoglabtest?red=1 HTTP/1.1\r\nHost: x\r\n\r\n")
            .expect("parses");
        assert_eq!(line.method, "GET");
        assert_eq!(line.path, "/bitdoglabtest");
        assert_eq!(line.query, Some("red=1"));
    }

    #[test]
    fn target_without_query_has_none() {
        let line = parse_request_line(b"GET /bitdoglabtest HTTP/1.1\r\n").expect("parses");
        assert_eq!(line.path, "/bitdoglabtest");
        assert_eq!(line.query, None);
    }

    #[test]
    fn missing_target_is_rejected() {
        assert_eq!(parse_request_line(b"GET"), None);
        assert_eq!(parse_request_line(b""), None);
        assert_eq!(parse_request_line(b"\r\n"), None);
    }

    #[test]
    fn truncated_line_parses_what_fit() {
        // No terminator at all: the whole buffer is the request line.
        let line = parse_request_line(b"GET /bitdoglabtest?gre").expect("parses");
        assert_eq!(line.path, "/bitdoglabtest");
        assert_eq!(line.query, Some("gre"));
    }

    #[test]
    fn only_the_first_query_separator_splits() {
        let line = parse_request_line(b"GET /p?a=1?b=2 HTTP/1.1\r\n").expect("parses");
        assert_eq!(line.path, "/p");
        assert_eq!(line.query, Some("a=1?b=2"));
    }
}
