//! Response classification: success payload, application error, or warnings.
//!
//! # Design
//! The service answers every call with HTTP 200 and one of three JSON shapes
//! that do not name themselves: the function's success object, an error
//! envelope, or a success object carrying a `warnings` array. The body is
//! parsed once into a `serde_json::Value` and the shape is decided by
//! looking at it:
//!
//! 1. An object whose `errorcode` is a non-empty string is an application
//!    error, whatever else it contains. An empty or non-string `errorcode`
//!    is not.
//! 2. Otherwise the value must decode into the destination envelope.
//! 3. A decoded envelope with a non-empty warning list is a failure.
//! 4. Anything else is success, including `{}` decoding into an envelope of
//!    defaults.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApplicationError, Error};
use crate::http::HttpResponse;
use crate::warning::Warnings;

/// A wire-shaped response type the classifier can decode into.
///
/// Envelopes that carry a `warnings` array override [`Envelope::warnings`]
/// so that a non-empty list is reported as a failure.
pub trait Envelope: DeserializeOwned {
    fn warnings(&self) -> Option<&Warnings> {
        None
    }
}

impl<T: DeserializeOwned> Envelope for Vec<T> {}

impl Envelope for Value {}

/// The three shapes a response body can take.
#[derive(Debug)]
pub enum Classified<E> {
    Success(E),
    Application(ApplicationError),
    Warnings(Warnings),
}

impl<E> Classified<E> {
    pub fn into_result(self) -> Result<E, Error> {
        match self {
            Classified::Success(value) => Ok(value),
            Classified::Application(e) => Err(Error::Application(e)),
            Classified::Warnings(w) => Err(Error::Warnings(w)),
        }
    }
}

/// Decide which shape `body` is and decode it.
///
/// Only malformed JSON or a schema mismatch against `E` is an `Err`; the
/// decode error carries the raw body.
pub fn classify<E: Envelope>(body: &[u8]) -> Result<Classified<E>, Error> {
    let value: Value = serde_json::from_slice(body).map_err(|source| decode_error(source, body))?;

    if let Some(app) = application_error(&value) {
        return Ok(Classified::Application(app));
    }

    let envelope: E = serde_json::from_value(value).map_err(|source| decode_error(source, body))?;
    match envelope.warnings() {
        Some(warnings) if !warnings.is_empty() => Ok(Classified::Warnings(warnings.clone())),
        _ => Ok(Classified::Success(envelope)),
    }
}

/// Classify a full HTTP response.
///
/// The status line is not trusted: the service reports its own failures in
/// 200 bodies, so classification always runs. Only when a non-2xx body is
/// undecodable is the status itself reported.
pub fn parse<E: Envelope>(response: HttpResponse) -> Result<E, Error> {
    match classify::<E>(&response.body) {
        Ok(classified) => classified.into_result(),
        Err(Error::Decode { .. }) if !response.is_success() => Err(Error::Status {
            status: response.status,
            body: response.body_text(),
        }),
        Err(e) => Err(e),
    }
}

fn application_error(value: &Value) -> Option<ApplicationError> {
    let code = value.get("errorcode")?.as_str()?;
    if code.is_empty() {
        return None;
    }
    // Optional fields of the wrong type must not hide the code.
    serde_json::from_value(value.clone())
        .ok()
        .or_else(|| Some(ApplicationError::new(code)))
}

fn decode_error(source: serde_json::Error, body: &[u8]) -> Error {
    Error::Decode {
        source,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
