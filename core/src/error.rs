//! Error types for the Moodle web service client.
//!
//! # Design
//! One `Error` enum covers every way a call can fail. Transport failures
//! (including cancellation and deadlines) are passed through untouched.
//! Undecodable bodies keep the raw body for debugging. Service-reported
//! failures arrive as HTTP 200 with a JSON error body and become
//! `Application`; a success envelope with a non-empty warning list becomes
//! `Warnings`. Callers branch on [`Error::code`] for application errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;
use crate::warning::Warnings;

/// A failure reported by the service in its JSON error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationError {
    #[serde(rename = "errorcode")]
    pub error_code: String,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default, rename = "error")]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "debuginfo")]
    pub debug_info: Option<String>,
    #[serde(default, rename = "reproductionlink")]
    pub reproduction_link: Option<String>,
    #[serde(default, rename = "stacktrace")]
    pub stack_trace: Option<String>,
}

impl ApplicationError {
    pub fn new(error_code: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service error {}", self.error_code)?;
        if let Some(exception) = &self.exception {
            write!(f, " ({exception})")?;
        }
        for detail in [&self.reason, &self.message, &self.debug_info]
            .into_iter()
            .flatten()
        {
            write!(f, ": {detail}")?;
        }
        if let Some(link) = &self.reproduction_link {
            write!(f, " [{link}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApplicationError {}

/// A wire value that could not be turned into its domain form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("no number in {field} cell {content:?}")]
    MissingNumber { field: &'static str, content: String },

    #[error("invalid number {token:?} in {field} cell")]
    InvalidNumber { field: &'static str, token: String },

    #[error("graded row is missing its {0} cell")]
    MissingCell(&'static str),

    #[error("table row {index} is malformed: {reason}")]
    MalformedRow { index: usize, reason: String },

    #[error("timestamp {0} is out of range")]
    Timestamp(i64),
}

/// Errors returned by `MoodleClient` calls and the response classifier.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The round-trip itself failed (DNS, connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The caller's context was cancelled before or during the call.
    #[error("call cancelled")]
    Cancelled,

    /// The caller's deadline passed before the response arrived.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The body was not JSON or did not have the expected shape.
    #[error("failed to decode response: {source}, body: {body}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    /// A non-2xx status whose body could not be decoded.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Warnings(#[from] Warnings),

    #[error("failed to map response: {0}")]
    Mapping(#[from] MappingError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// The service error code for `Application` errors, `"unknown"` otherwise.
    pub fn code(&self) -> &str {
        match self {
            Error::Application(e) => &e.error_code,
            _ => "unknown",
        }
    }

    pub fn application(&self) -> Option<&ApplicationError> {
        match self {
            Error::Application(e) => Some(e),
            _ => None,
        }
    }

    pub fn warnings(&self) -> Option<&Warnings> {
        match self {
            Error::Warnings(w) => Some(w),
            _ => None,
        }
    }
}
