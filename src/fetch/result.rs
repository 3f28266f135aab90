//! Single-assignment fetch results
//!
//! A fetch hands its caller a [`FetchResult`] and keeps the matching
//! [`FetchResolver`]. The resolver is consumed by [`FetchResolver::resolve`], so a
//! result is written at most once; the handle can be cloned and read any number of
//! times once it is resolved. Reading before resolution waits.

use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Errors surfaced through a [`FetchResult`]
///
/// The underlying I/O cause is shared so a resolved result can be handed out
/// repeatedly.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: Arc<io::Error>,
    },

    #[error("Connect failed for {target}: {source}")]
    Connect {
        target: String,
        source: Arc<io::Error>,
    },

    #[error("TLS handshake failed for {target}: {source}")]
    Handshake {
        target: String,
        source: Arc<io::Error>,
    },

    #[error("Sending request failed for {target}: {source}")]
    Send {
        target: String,
        source: Arc<io::Error>,
    },

    #[error("Reading response failed for {target}: {source}")]
    Receive {
        target: String,
        source: Arc<io::Error>,
    },

    #[error("Malformed response for {target}: {message}")]
    Protocol { target: String, message: String },

    #[error("Worker pool failed to start: {source}")]
    PoolStart { source: Arc<io::Error> },

    #[error("Fetch of {target} was abandoned before completion")]
    Abandoned { target: String },
}

impl FetchError {
    /// Returns the request target this error belongs to, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Connect { target, .. }
            | Self::Handshake { target, .. }
            | Self::Send { target, .. }
            | Self::Receive { target, .. }
            | Self::Protocol { target, .. }
            | Self::Abandoned { target } => Some(target),
            Self::Resolve { .. } | Self::PoolStart { .. } => None,
        }
    }

    /// Returns the kind of the underlying I/O failure, if there was one
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Resolve { source, .. }
            | Self::Connect { source, .. }
            | Self::Handshake { source, .. }
            | Self::Send { source, .. }
            | Self::Receive { source, .. }
            | Self::PoolStart { source } => Some(source.kind()),
            Self::Protocol { .. } | Self::Abandoned { .. } => None,
        }
    }
}

/// A framed HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,

    /// Header name/value pairs in arrival order
    pub headers: Vec<(String, String)>,

    /// Decoded body (chunked transfer coding removed)
    pub body: Vec<u8>,
}

impl Response {
    /// Returns the first header with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What a resolved fetch holds
pub type FetchOutcome = Result<Arc<Response>, FetchError>;

/// Creates a connected resolver/handle pair for `target`
pub fn pending(target: &str) -> (FetchResolver, FetchResult) {
    let target: Arc<str> = Arc::from(target);
    let (tx, rx) = watch::channel(None);
    (
        FetchResolver {
            target: target.clone(),
            tx,
        },
        FetchResult { target, rx },
    )
}

/// Write side of a fetch result; resolving consumes it
pub struct FetchResolver {
    target: Arc<str>,
    tx: watch::Sender<Option<FetchOutcome>>,
}

impl FetchResolver {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Stores the outcome and wakes every reader
    pub fn resolve(self, outcome: FetchOutcome) {
        // Every handle may already be gone; nobody is left to read the outcome then.
        let _ = self.tx.send(Some(outcome));
    }

    pub fn succeed(self, response: Response) {
        self.resolve(Ok(Arc::new(response)));
    }

    pub fn fail(self, error: FetchError) {
        self.resolve(Err(error));
    }
}

impl fmt::Debug for FetchResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResolver")
            .field("target", &self.target)
            .finish()
    }
}

/// Read side of a fetch result
///
/// Dropping the resolver without resolving turns every pending and future read into
/// [`FetchError::Abandoned`].
#[derive(Clone)]
pub struct FetchResult {
    target: Arc<str>,
    rx: watch::Receiver<Option<FetchOutcome>>,
}

impl FetchResult {
    /// The request target this result belongs to
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true once the outcome is available
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Returns the outcome without waiting, if it is available
    pub fn try_get(&self) -> Option<FetchOutcome> {
        self.rx.borrow().clone()
    }

    /// Waits for the outcome
    pub async fn resolved(&self) -> FetchOutcome {
        let mut rx = self.rx.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(self.abandoned()))
    }

    /// Blocks the calling thread until the outcome is available
    ///
    /// Must not be called from inside an async task.
    pub fn wait(&self) -> FetchOutcome {
        futures::executor::block_on(self.resolved())
    }

    fn abandoned(&self) -> FetchError {
        FetchError::Abandoned {
            target: self.target.to_string(),
        }
    }
}

impl fmt::Debug for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResult")
            .field("target", &self.target)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn ok_response(body: &str) -> Response {
        Response {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_pending_result_is_not_ready() {
        let (_resolver, result) = pending("/search");
        assert!(!result.is_ready());
        assert!(result.try_get().is_none());
        assert_eq!(result.target(), "/search");
    }

    #[test]
    fn test_resolved_result_can_be_read_repeatedly() {
        let (resolver, result) = pending("/search");
        resolver.succeed(ok_response("hello"));

        let first = result.wait().unwrap();
        let second = result.wait().unwrap();
        assert_eq!(first.body, b"hello");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(result.is_ready());
    }

    #[test]
    fn test_clones_observe_the_same_outcome() {
        let (resolver, result) = pending("/a");
        let clone = result.clone();
        resolver.fail(FetchError::Protocol {
            target: "/a".to_string(),
            message: "bad status line".to_string(),
        });

        assert!(matches!(result.wait(), Err(FetchError::Protocol { .. })));
        assert!(matches!(clone.wait(), Err(FetchError::Protocol { .. })));
    }

    #[test]
    fn test_wait_blocks_until_resolved() {
        let (resolver, result) = pending("/slow");
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            resolver.succeed(ok_response("late"));
        });

        let response = result.wait().unwrap();
        assert_eq!(response.text(), "late");
        writer.join().unwrap();
    }

    #[test]
    fn test_dropped_resolver_abandons_result() {
        let (resolver, result) = pending("/gone");
        drop(resolver);

        match result.wait() {
            Err(FetchError::Abandoned { target }) => assert_eq!(target, "/gone"),
            other => panic!("expected abandoned, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_after_handle_dropped_is_harmless() {
        let (resolver, result) = pending("/nobody");
        drop(result);
        resolver.succeed(ok_response(""));
    }

    #[test]
    fn test_response_helpers() {
        let response = ok_response("<html></html>");
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("etag"), None);

        let not_found = Response {
            status: 404,
            ..response
        };
        assert!(!not_found.is_success());
    }

    #[test]
    fn test_error_accessors() {
        let error = FetchError::Connect {
            target: "/x".to_string(),
            source: Arc::new(io::Error::from(io::ErrorKind::ConnectionRefused)),
        };
        assert_eq!(error.target(), Some("/x"));
        assert_eq!(error.io_kind(), Some(io::ErrorKind::ConnectionRefused));
        assert!(error.to_string().contains("/x"));
    }
}
