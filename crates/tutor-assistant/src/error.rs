use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures of the generative backend collaborator.
///
/// `Unavailable` is the expected "no credentials configured" state and is not a
/// fault; every other variant is a failed call. Callers treat both the same way:
/// they compose the documented fallback instead of propagating.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("generative backend is not configured")]
    Unavailable,

    #[error("generative backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error talking to {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("backend API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Failures of the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage query failed: {0}")]
    Query(String),

    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// A structured call whose name or arguments do not fit the function catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArguments {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("arguments of {function} are not a JSON object: {message}")]
    Malformed { function: String, message: String },

    #[error("{function}: missing required argument `{field}`")]
    MissingField { function: String, field: &'static str },

    #[error("{function}: invalid `{field}`: {message}")]
    InvalidField {
        function: String,
        field: &'static str,
        message: String,
    },
}

/// Which fallback path produced the reply, surfaced in the reply metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    BackendUnavailable,
    BackendFailed,
    StorageFailed,
    NoKnowledgeMatch,
    InvalidArguments,
}

impl From<&BackendError> for FallbackReason {
    fn from(err: &BackendError) -> Self {
        if err.is_unavailable() {
            Self::BackendUnavailable
        } else {
            Self::BackendFailed
        }
    }
}
