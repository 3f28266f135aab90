//! Per-request fetch state machine
//!
//! A [`FetchTask`] performs exactly one network exchange. It moves through
//! `Connecting -> Handshaking -> Sending -> Receiving -> Done`, each transition driven
//! by the completion of one non-blocking operation. Any failing operation ends the
//! task in `Failed`. Either way the task's [`FetchResolver`] is consumed exactly once.

use crate::fetch::http::{self, DecodeError};
use crate::fetch::registry::{TaskId, TaskRegistry};
use crate::fetch::result::{FetchOutcome, FetchResolver};
use crate::fetch::{tls, Endpoint, FetchError, Response, Scheme};
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// Size of each read while receiving a response
const READ_CHUNK: usize = 8 * 1024;

/// Represents the current state of a fetch task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    // ===== Active States =====
    /// Opening the TCP connection (initial state)
    Connecting,

    /// Performing the TLS handshake; a pass-through for plain HTTP endpoints
    Handshaking,

    /// Writing the request
    Sending,

    /// Reading until the response is framed
    Receiving,

    // ===== Terminal States =====
    /// The exchange completed and the response was handed to the result
    Done,

    /// A stage failed and the error was handed to the result
    Failed,
}

impl FetchState {
    /// Returns true if the task has finished (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true while the task may still perform network operations
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The state that follows this one on success, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Handshaking),
            Self::Handshaking => Some(Self::Sending),
            Self::Sending => Some(Self::Receiving),
            Self::Receiving => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Sending => "sending",
            Self::Receiving => "receiving",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible fetch states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Connecting,
            Self::Handshaking,
            Self::Sending,
            Self::Receiving,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte stream a task talks HTTP over, plain or TLS
trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Connection for T {}

/// Everything tasks of one engine share
pub(crate) struct TaskContext {
    pub endpoint: Arc<Endpoint>,
    pub user_agent: String,
    pub stage_timeout: Option<Duration>,
    pub tls: Option<TlsConnector>,
    pub registry: Arc<TaskRegistry>,
}

/// Work remaining for a task, carrying whatever the previous stage produced
enum Step {
    Connect,
    Handshake(TcpStream),
    Send(Box<dyn Connection>),
    Receive(Box<dyn Connection>),
}

impl Step {
    fn state(&self) -> FetchState {
        match self {
            Self::Connect => FetchState::Connecting,
            Self::Handshake(_) => FetchState::Handshaking,
            Self::Send(_) => FetchState::Sending,
            Self::Receive(_) => FetchState::Receiving,
        }
    }
}

/// Resolves a task's result and takes it out of the registry
///
/// Dropped without [`Completion::finish`] (the task panicked or was cancelled), it
/// still abandons the result and leaves the registry in `Failed`, so shutdown never
/// waits on a task that is gone.
struct Completion {
    id: TaskId,
    registry: Arc<TaskRegistry>,
    resolver: Option<FetchResolver>,
}

impl Completion {
    fn new(id: TaskId, registry: Arc<TaskRegistry>, resolver: FetchResolver) -> Self {
        Self {
            id,
            registry,
            resolver: Some(resolver),
        }
    }

    fn finish(mut self, outcome: FetchOutcome, state: FetchState) {
        if let Some(resolver) = self.resolver.take() {
            resolver.resolve(outcome);
        }
        self.registry.complete(self.id, state);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        // The result must be abandoned before the registry can report idle
        if let Some(resolver) = self.resolver.take() {
            drop(resolver);
            tracing::warn!(
                task = %self.id,
                target = self.registry.target(self.id).as_deref().unwrap_or(""),
                "Fetch task ended without a result"
            );
            self.registry.complete(self.id, FetchState::Failed);
        }
    }
}

/// One request's state machine
pub(crate) struct FetchTask {
    id: TaskId,
    target: String,
    context: Arc<TaskContext>,
    completion: Completion,
}

impl FetchTask {
    pub fn new(id: TaskId, resolver: FetchResolver, context: Arc<TaskContext>) -> Self {
        Self {
            id,
            target: resolver.target().to_string(),
            completion: Completion::new(id, Arc::clone(&context.registry), resolver),
            context,
        }
    }

    /// Drives the task to a terminal state and resolves its result
    ///
    /// The result is resolved before the task leaves the registry, so an idle
    /// registry implies every result of the engine is available.
    pub async fn run(self) {
        let outcome = self.drive().await;

        let terminal = match &outcome {
            Ok(response) => {
                tracing::debug!(
                    task = %self.id,
                    url = %self.context.endpoint.url_for(&self.target),
                    status = response.status,
                    bytes = response.body.len(),
                    "Fetch completed"
                );
                FetchState::Done
            }
            Err(e) => {
                tracing::debug!(
                    task = %self.id,
                    target = %self.target,
                    error = %e,
                    "Fetch failed"
                );
                FetchState::Failed
            }
        };

        self.completion.finish(outcome, terminal);
    }

    async fn drive(&self) -> FetchOutcome {
        let mut step = Step::Connect;

        loop {
            let state = step.state();
            self.context.registry.transition(self.id, state);
            tracing::trace!(task = %self.id, target = %self.target, state = %state, "Fetch transition");

            step = match step {
                Step::Connect => Step::Handshake(self.connect().await?),
                Step::Handshake(tcp) => Step::Send(self.handshake(tcp).await?),
                Step::Send(mut conn) => {
                    self.send(&mut conn).await?;
                    Step::Receive(conn)
                }
                Step::Receive(mut conn) => return Ok(Arc::new(self.receive(&mut conn).await?)),
            };
        }
    }

    async fn connect(&self) -> Result<TcpStream, FetchError> {
        let addrs = self.context.endpoint.addrs();
        bounded(self.context.stage_timeout, TcpStream::connect(addrs))
            .await
            .and_then(|connected| connected)
            .map_err(|e| FetchError::Connect {
                target: self.target.clone(),
                source: Arc::new(e),
            })
    }

    async fn handshake(&self, tcp: TcpStream) -> Result<Box<dyn Connection>, FetchError> {
        let endpoint = &self.context.endpoint;

        match (endpoint.scheme(), &self.context.tls) {
            (Scheme::Http, _) => Ok(Box::new(tcp)),
            (Scheme::Https, Some(connector)) => {
                let secured = bounded(
                    self.context.stage_timeout,
                    tls::handshake(connector, endpoint.host(), tcp),
                )
                .await
                .and_then(|secured| secured)
                .map_err(|e| self.handshake_error(e))?;
                Ok(Box::new(secured))
            }
            (Scheme::Https, None) => Err(self.handshake_error(io::Error::new(
                io::ErrorKind::Unsupported,
                "no TLS connector configured for https endpoint",
            ))),
        }
    }

    async fn send(&self, conn: &mut Box<dyn Connection>) -> Result<(), FetchError> {
        let request = http::encode_request(
            &self.context.endpoint,
            &self.target,
            &self.context.user_agent,
        );

        let write = async {
            conn.write_all(&request).await?;
            conn.flush().await
        };

        bounded(self.context.stage_timeout, write)
            .await
            .and_then(|written| written)
            .map_err(|e| FetchError::Send {
                target: self.target.clone(),
                source: Arc::new(e),
            })
    }

    async fn receive(&self, conn: &mut Box<dyn Connection>) -> Result<Response, FetchError> {
        match bounded(self.context.stage_timeout, self.read_response(conn)).await {
            Ok(received) => received,
            Err(timed_out) => Err(self.receive_error(timed_out)),
        }
    }

    async fn read_response(&self, conn: &mut Box<dyn Connection>) -> Result<Response, FetchError> {
        let mut buf = Vec::with_capacity(READ_CHUNK);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let eof = match conn.read(&mut chunk).await {
                Ok(0) => true,
                Ok(read) => {
                    buf.extend_from_slice(&chunk[..read]);
                    false
                }
                // Servers commonly close TLS without close_notify once the body is sent
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !buf.is_empty() => true,
                Err(e) => return Err(self.receive_error(e)),
            };

            match http::decode_response(&buf, eof) {
                Ok(Some(response)) => return Ok(response),
                Ok(None) => continue,
                Err(DecodeError::Truncated(message)) => {
                    return Err(self.receive_error(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        message,
                    )))
                }
                Err(DecodeError::Malformed(message)) => {
                    return Err(FetchError::Protocol {
                        target: self.target.clone(),
                        message,
                    })
                }
            }
        }
    }

    fn handshake_error(&self, source: io::Error) -> FetchError {
        FetchError::Handshake {
            target: self.target.clone(),
            source: Arc::new(source),
        }
    }

    fn receive_error(&self, source: io::Error) -> FetchError {
        FetchError::Receive {
            target: self.target.clone(),
            source: Arc::new(source),
        }
    }
}

/// Runs one network stage, failing it with `TimedOut` once `limit` expires
async fn bounded<F: Future>(limit: Option<Duration>, stage: F) -> io::Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, stage).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("stage timed out after {}ms", limit.as_millis()),
            )
        }),
        None => Ok(stage.await),
    }
}
