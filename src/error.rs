//! Error taxonomy
//!
//! Errors surface only outside the tick: building actor tables, generating
//! the route and loading files. Inside the tick, paging past either end and
//! unmatched FSM events degrade to logged no-ops.

use std::path::PathBuf;

use thiserror::Error;

/// The greedy route walk could not complete.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("route length {length} cannot hold both the start and end segments")]
    RouteTooShort { length: usize },

    #[error("segment pool has no normal segments")]
    EmptyPool,

    #[error("no segment can follow `{previous}` at route position {position}")]
    DeadEnd { position: usize, previous: String },
}

/// Paging past either end of the route.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    #[error("cursor {cursor} is already on the last of {length} segments")]
    PastEnd { cursor: usize, length: usize },

    #[error("cursor is already on the first segment")]
    BeforeStart,

    #[error("window has not been started")]
    NotStarted,
}

/// Transition table problems.
///
/// `state` and `event` are carried as their debug names so the error type
/// stays independent of the concrete machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsmError {
    #[error("ambiguous table: {state} has more than one transition on {event}")]
    Ambiguous { state: String, event: String },

    #[error("no transition from {state} on {event}")]
    NoTransition { state: String, event: String },
}

/// Loading authored segments or settings.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("segment `{segment}` uses unknown tile kind {kind}")]
    UnknownTileKind { segment: String, kind: i64 },

    #[error("segment `{0}` not found")]
    MissingSegment(String),
}

/// Anything that can stop a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Fsm(#[from] FsmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
