//! Asynchronous fetch engine
//!
//! This module performs the network side of a batch: one resolved endpoint, many
//! concurrent single-request exchanges, each observable through a single-assignment
//! result handle.
//!
//! # Components
//!
//! - `Endpoint`: host/port/scheme resolved once per engine
//! - `FetchEngine`: accepts fetches and runs them on a fixed worker pool
//! - `FetchState`: per-task state machine (connecting, handshaking, sending, receiving)
//! - `FetchResult`: handle that resolves to a `Response` or a `FetchError`

mod endpoint;
mod engine;
pub mod http;
mod pool;
mod registry;
mod result;
mod task;
pub mod tls;

/// Worker threads used when nothing else is configured
pub const DEFAULT_WORKERS: usize = 4;

// Re-export main types
pub use endpoint::{Endpoint, HttpVersion, Scheme};
pub use engine::{EngineOptions, FetchEngine};
pub use registry::TaskId;
pub use result::{pending, FetchError, FetchOutcome, FetchResolver, FetchResult, Response};
pub use task::FetchState;
