use crate::query::{QueryHandle, QueryKind};
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`QueryBackend`](crate::QueryBackend).
///
/// The profiler never propagates these past its own frame hooks; they end up
/// as a warning and a bump of [`FrameDiagnostics::backend_failures`](crate::FrameDiagnostics).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("failed to create {kind:?} query")]
    CreateFailed { kind: QueryKind },

    #[error("unknown query handle {handle:?}")]
    UnknownHandle { handle: QueryHandle },

    #[error("query {handle:?} is not recording")]
    NotRecording { handle: QueryHandle },

    #[error("query readback failed: {reason}")]
    ReadbackFailed { reason: String },
}

/// Errors surfaced to the host outside the frame loop (settings loading).
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("invalid profiler settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    #[error("failed to read profiler settings from '{}'", path.display())]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
