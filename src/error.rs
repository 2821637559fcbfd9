// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error and Result implementations.

use std::fmt;

use reqwest::{Error as HttpClientError, StatusCode};

/// Kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Authentication failure.
    ///
    /// Maps to HTTP 401.
    AuthenticationFailed,

    /// Access denied.
    ///
    /// Maps to HTTP 403.
    AccessDenied,

    /// Requested resource was not found.
    ///
    /// Roughly maps to HTTP 404 and 410.
    ResourceNotFound,

    /// The requested endpoint was not found.
    EndpointNotFound,

    /// Invalid value passed to one of parameters.
    ///
    /// May be result of HTTP 400.
    InvalidInput,

    /// A required argument is missing or empty.
    MissingArgument,

    /// An argument is outside of its allowed range.
    ///
    /// Used for non-positive time-to-live values and limits and for negative grace periods.
    OutOfRange,

    /// The operation is not valid for the current state of the object.
    ///
    /// For example, an empty claim cannot be renewed.
    InvalidOperation,

    /// Waiting for an asynchronous operation was given up.
    ///
    /// Returned when a backoff schedule is exhausted before the operation finishes.
    Cancelled,

    /// Conflict in the request.
    Conflict,

    /// Operation failed to complete.
    OperationFailed,

    /// Failure in the communication protocol layer.
    ProtocolError,

    /// Response received from the server is malformed.
    InvalidResponse,

    /// Internal server error.
    ///
    /// Maps to HTTP 5xx codes.
    InternalServerError,

    /// Invalid clouds.yaml file.
    InvalidConfig,
}

/// Error from an OpenStack call.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
}

impl ErrorKind {
    /// Short description of the error kind.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::AuthenticationFailed => "Failed to authenticate",
            ErrorKind::AccessDenied => "Access to the resource is denied",
            ErrorKind::ResourceNotFound => "Requested resource was not found",
            ErrorKind::EndpointNotFound => "Requested endpoint was not found",
            ErrorKind::InvalidInput => "Input value(s) are invalid or missing",
            ErrorKind::MissingArgument => "Required argument is missing",
            ErrorKind::OutOfRange => "Argument is out of range",
            ErrorKind::InvalidOperation => "Operation is not valid in the current state",
            ErrorKind::Cancelled => "Operation was cancelled",
            ErrorKind::Conflict => "Requested cannot be fulfilled due to a conflict",
            ErrorKind::OperationFailed => "Requested operation has failed",
            ErrorKind::ProtocolError => "Error when accessing the server",
            ErrorKind::InvalidResponse => "Received invalid response",
            ErrorKind::InternalServerError => "Internal server error or bad gateway",
            ErrorKind::InvalidConfig => "configuration file cannot be found or is invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<StatusCode> for ErrorKind {
    fn from(value: StatusCode) -> ErrorKind {
        match value {
            StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationFailed,
            StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
            StatusCode::NOT_FOUND | StatusCode::GONE => ErrorKind::ResourceNotFound,
            StatusCode::NOT_ACCEPTABLE | StatusCode::CONFLICT => ErrorKind::Conflict,
            c if c.is_client_error() => ErrorKind::InvalidInput,
            c if c.is_server_error() => ErrorKind::InternalServerError,
            _ => ErrorKind::InvalidResponse,
        }
    }
}

impl Error {
    /// Create a new error of the provided kind.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code (if available).
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Set the HTTP status code.
    #[inline]
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Add an HTTP status code.
    #[inline]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.set_status(status);
        self
    }

    #[inline]
    pub(crate) fn missing<S: fmt::Display>(argument: S) -> Error {
        Error::new(
            ErrorKind::MissingArgument,
            format!("{} must not be empty", argument),
        )
    }

    #[inline]
    pub(crate) fn out_of_range<S: fmt::Display>(argument: S, constraint: &str) -> Error {
        Error::new(
            ErrorKind::OutOfRange,
            format!("{} must be {}", argument, constraint),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl ::std::error::Error for Error {}

impl From<HttpClientError> for Error {
    fn from(value: HttpClientError) -> Error {
        let msg = value.to_string();
        let kind = if value.is_decode() {
            ErrorKind::InvalidResponse
        } else {
            value
                .status()
                .map(From::from)
                .unwrap_or(ErrorKind::ProtocolError)
        };

        let error = Error::new(kind, msg);
        if let Some(status) = value.status() {
            error.with_status(status)
        } else {
            error
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(value: url::ParseError) -> Error {
        Error::new(ErrorKind::InvalidResponse, value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Error {
        Error::new(
            ErrorKind::InvalidResponse,
            format!("Cannot decode JSON: {}", value),
        )
    }
}

#[cfg(test)]
pub mod test {
    use reqwest::StatusCode;

    use super::{Error, ErrorKind};

    #[test]
    fn test_error_display() {
        let error = Error::new(ErrorKind::InvalidInput, "boom");
        assert_eq!(
            error.to_string(),
            "Input value(s) are invalid or missing: boom"
        );
        assert_eq!(error.message(), "boom");
        assert!(error.status().is_none());
    }

    #[test]
    fn test_error_with_status() {
        let error = Error::new(ErrorKind::ResourceNotFound, "no queue")
            .with_status(StatusCode::NOT_FOUND);
        assert_eq!(error.kind(), ErrorKind::ResourceNotFound);
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_kind_from_status() {
        assert_eq!(
            ErrorKind::from(StatusCode::UNAUTHORIZED),
            ErrorKind::AuthenticationFailed
        );
        assert_eq!(
            ErrorKind::from(StatusCode::FORBIDDEN),
            ErrorKind::AccessDenied
        );
        assert_eq!(ErrorKind::from(StatusCode::GONE), ErrorKind::ResourceNotFound);
        assert_eq!(ErrorKind::from(StatusCode::CONFLICT), ErrorKind::Conflict);
        assert_eq!(
            ErrorKind::from(StatusCode::BAD_REQUEST),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            ErrorKind::from(StatusCode::SERVICE_UNAVAILABLE),
            ErrorKind::InternalServerError
        );
        assert_eq!(
            ErrorKind::from(StatusCode::PERMANENT_REDIRECT),
            ErrorKind::InvalidResponse
        );
    }

    #[test]
    fn test_argument_errors() {
        let missing = Error::missing("queue name");
        assert_eq!(missing.kind(), ErrorKind::MissingArgument);
        assert_eq!(missing.message(), "queue name must not be empty");

        let range = Error::out_of_range("time-to-live", "positive");
        assert_eq!(range.kind(), ErrorKind::OutOfRange);
        assert_eq!(range.message(), "time-to-live must be positive");
    }
}
