//! Error classification for intercepted operations.
//!
//! Classification only observes an error to update span state; the error
//! value itself always propagates to the caller unchanged.

use opentelemetry::trace::{Span, Status};
use opentelemetry::KeyValue;
use thiserror::Error;

use crate::attributes;

/// Error surfaced by an instrumented operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OdmError {
    /// Driver-level failure carrying the driver's numeric code, e.g. a
    /// duplicate-key violation.
    #[error("{message}")]
    Driver {
        /// Numeric code reported by the driver.
        code: i64,
        /// Driver message.
        message: String,
    },

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl OdmError {
    /// A driver-level error with its numeric code.
    pub fn driver(code: i64, message: impl Into<String>) -> Self {
        OdmError::Driver {
            code,
            message: message.into(),
        }
    }

    /// A failure without a driver code.
    pub fn other(message: impl Into<String>) -> Self {
        OdmError::Other(message.into())
    }

    /// The driver's numeric code, when this is a driver-level error.
    pub fn driver_code(&self) -> Option<i64> {
        match self {
            OdmError::Driver { code, .. } => Some(*code),
            OdmError::Other(_) => None,
        }
    }
}

/// Classify `error` onto `span`: record the driver code when one exists and
/// set an error status carrying the driver message. The span is left open;
/// ending it is the lifecycle adapter's job.
pub fn record_error<S: Span>(span: &mut S, error: &OdmError) {
    if let Some(code) = error.driver_code() {
        span.set_attribute(KeyValue::new(attributes::ERROR_CODE, code));
    }
    span.set_status(Status::error(error.to_string()));
}

/// Errors produced by the instrumentation controller itself.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnableError {
    /// The target already has wrappers installed; call
    /// [`Instrumentation::disable`](crate::Instrumentation::disable) first.
    #[error("target entry points are already instrumented")]
    AlreadyEnabled,
}
