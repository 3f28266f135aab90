//! HTTP/1.x request encoding and response framing
//!
//! Requests always ask the server to close the connection, so a response ends at
//! its framed length (`Content-Length` or the last chunk) or at end of stream.

use crate::fetch::{Endpoint, Response};

/// Upper bound on response headers accepted from a server
const MAX_HEADERS: usize = 96;

/// Encodes a GET request for `target` on `endpoint`
pub fn encode_request(endpoint: &Endpoint, target: &str, user_agent: &str) -> Vec<u8> {
    format!(
        "GET {target} {version}\r\n\
         Host: {host}\r\n\
         User-Agent: {user_agent}\r\n\
         Accept: */*\r\n\
         Accept-Encoding: identity\r\n\
         Connection: close\r\n\
         \r\n",
        version = endpoint.version().as_str(),
        host = endpoint.host_header(),
    )
    .into_bytes()
}

/// Why a buffer could not be decoded into a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The peer closed the stream before the response was complete
    Truncated(String),

    /// The bytes violate HTTP/1.x framing
    Malformed(String),
}

impl DecodeError {
    pub fn message(&self) -> &str {
        match self {
            Self::Truncated(message) | Self::Malformed(message) => message,
        }
    }
}

/// How the end of a response body is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

/// Attempts to decode a complete response from `buf`
///
/// # Arguments
///
/// * `buf` - Every byte received so far
/// * `eof` - Whether the peer has closed the stream
///
/// # Returns
///
/// * `Ok(Some(Response))` - The response is complete
/// * `Ok(None)` - More bytes are needed (only when `eof` is false)
/// * `Err(DecodeError)` - The bytes cannot form a valid response
pub fn decode_response(buf: &[u8], eof: bool) -> Result<Option<Response>, DecodeError> {
    let mut header_slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut header_slots);

    let head_len = match parsed.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) if eof => {
            return Err(DecodeError::Truncated(format!(
                "connection closed after {} bytes, before the response head was complete",
                buf.len()
            )))
        }
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => {
            return Err(DecodeError::Malformed(format!(
                "invalid response head: {}",
                e
            )))
        }
    };

    let status = parsed
        .code
        .ok_or_else(|| DecodeError::Malformed("response head without status code".to_string()))?;

    let headers = parsed
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).trim().to_string(),
            )
        })
        .collect::<Vec<_>>();

    let framing = framing_for(status, &headers).map_err(DecodeError::Malformed)?;
    let rest = &buf[head_len..];

    let body = match framing {
        Framing::Empty => Some(Vec::new()),
        Framing::Length(len) if rest.len() >= len => Some(rest[..len].to_vec()),
        Framing::Length(len) if eof => {
            return Err(DecodeError::Truncated(format!(
                "connection closed after {} of {} body bytes",
                rest.len(),
                len
            )))
        }
        Framing::Length(_) => None,
        Framing::Chunked => match decode_chunked(rest).map_err(DecodeError::Malformed)? {
            Some(body) => Some(body),
            None if eof => {
                return Err(DecodeError::Truncated(
                    "connection closed inside chunked body".to_string(),
                ))
            }
            None => None,
        },
        Framing::UntilClose if eof => Some(rest.to_vec()),
        Framing::UntilClose => None,
    };

    Ok(body.map(|body| Response {
        status,
        headers,
        body,
    }))
}

fn framing_for(status: u16, headers: &[(String, String)]) -> Result<Framing, String> {
    if (100..200).contains(&status) || status == 204 || status == 304 {
        return Ok(Framing::Empty);
    }

    let header = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    };

    if let Some(coding) = header("transfer-encoding") {
        if coding
            .rsplit(',')
            .next()
            .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
        {
            return Ok(Framing::Chunked);
        }
        return Ok(Framing::UntilClose);
    }

    match header("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map(Framing::Length)
            .map_err(|_| format!("invalid Content-Length '{}'", value)),
        None => Ok(Framing::UntilClose),
    }
}

/// Decodes a chunked body; `None` means the last chunk has not arrived yet
fn decode_chunked(mut rest: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let mut body = Vec::new();

    loop {
        let (size_len, size) = match httparse::parse_chunk_size(rest) {
            Ok(httparse::Status::Complete(parsed)) => parsed,
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(_) => return Err("invalid chunk size line".to_string()),
        };
        rest = &rest[size_len..];

        // Trailers after the last chunk are not needed
        if size == 0 {
            return Ok(Some(body));
        }

        let end = usize::try_from(size)
            .ok()
            .and_then(|size| size.checked_add(2))
            .ok_or_else(|| "chunk size overflow".to_string())?;
        if rest.len() < end {
            return Ok(None);
        }
        if &rest[end - 2..end] != b"\r\n" {
            return Err("chunk data not terminated by CRLF".to_string());
        }

        body.extend_from_slice(&rest[..end - 2]);
        rest = &rest[end..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{HttpVersion, Scheme};

    fn endpoint() -> Endpoint {
        Endpoint::with_addrs(
            "auctions.example",
            443,
            Scheme::Https,
            HttpVersion::Http11,
            vec!["127.0.0.1:443".parse().unwrap()],
        )
    }

    #[test]
    fn test_encode_request() {
        let request = encode_request(&endpoint(), "/search?p=vinyl", "TestWatcher/1.0");
        let text = String::from_utf8(request).unwrap();

        assert!(text.starts_with("GET /search?p=vinyl HTTP/1.1\r\n"));
        assert!(text.contains("\r\nHost: auctions.example\r\n"));
        assert!(text.contains("\r\nUser-Agent: TestWatcher/1.0\r\n"));
        assert!(text.contains("\r\nConnection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_decode_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Type: text/html\r\n\r\nhello";
        let response = decode_response(raw, false).unwrap().unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"hello");
        assert_eq!(response.header("content-type"), Some("text/html"));
    }

    #[test]
    fn test_decode_waits_for_full_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello";
        assert_eq!(decode_response(raw, false).unwrap(), None);
        assert!(matches!(
            decode_response(raw, true),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn test_decode_partial_head() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Le";
        assert_eq!(decode_response(raw, false).unwrap(), None);
        assert!(matches!(
            decode_response(raw, true),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn test_decode_chunked() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                    5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n";
        let response = decode_response(raw, false).unwrap().unwrap();
        assert_eq!(response.body, b"hello, world");
    }

    #[test]
    fn test_decode_chunked_incomplete() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhel";
        assert_eq!(decode_response(raw, false).unwrap(), None);
        assert!(decode_response(raw, true).is_err());
    }

    #[test]
    fn test_decode_chunked_bad_terminator() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhelloXX0\r\n\r\n";
        assert!(decode_response(raw, false).is_err());
    }

    #[test]
    fn test_decode_chunk_size_overflow() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nab";
        assert!(matches!(
            decode_response(raw, false),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_response(raw, true),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_until_close() {
        let raw = b"HTTP/1.0 200 OK\r\nServer: legacy\r\n\r\n<html>";
        assert_eq!(decode_response(raw, false).unwrap(), None);

        let response = decode_response(raw, true).unwrap().unwrap();
        assert_eq!(response.body, b"<html>");
    }

    #[test]
    fn test_decode_no_content() {
        let raw = b"HTTP/1.1 204 No Content\r\nContent-Length: 100\r\n\r\n";
        let response = decode_response(raw, false).unwrap().unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_decode_keeps_error_status() {
        let raw = b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\n\r\nbusy";
        let response = decode_response(raw, false).unwrap().unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
    }

    #[test]
    fn test_decode_invalid_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(
            decode_response(raw, false),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let error = decode_response(b"\x16\x03\x01garbage\r\n\r\n", false).unwrap_err();
        assert!(matches!(error, DecodeError::Malformed(_)));
        assert!(error.message().starts_with("invalid response head"));
    }
}
