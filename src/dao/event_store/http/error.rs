//! Error types shared by the HTTP event store implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::{dao::error::FetchError, state::ModelError};

/// Convenient result alias returning [`HttpDaoError`] failures.
pub type HttpResult<T> = Result<T, HttpDaoError>;

/// Failures that can occur while talking to the event service over HTTP.
#[derive(Debug, Error)]
pub enum HttpDaoError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build event service client")]
    ClientBuilder {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or its response never arrived.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Request path relative to the API root.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The service returned an unexpected status code.
    #[error("unexpected response status {status} for `{path}`")]
    RequestStatus {
        /// Request path relative to the API root.
        path: String,
        /// Status returned by the service.
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        /// Request path relative to the API root.
        path: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Response parsed but violates the domain rules.
    #[error("invalid payload for `{path}`")]
    InvalidPayload {
        /// Request path relative to the API root.
        path: String,
        /// Domain rule that was violated.
        #[source]
        source: ModelError,
    },
}

impl From<HttpDaoError> for FetchError {
    fn from(err: HttpDaoError) -> Self {
        match err {
            HttpDaoError::RequestStatus { path, status } if status == StatusCode::NOT_FOUND => {
                FetchError::NotFound(path)
            }
            HttpDaoError::RequestStatus { path, status } => FetchError::Server {
                path,
                status: status.as_u16(),
            },
            HttpDaoError::DecodeResponse { path, source } => FetchError::Decode {
                path,
                message: source.to_string(),
            },
            HttpDaoError::InvalidPayload { path, source } => FetchError::Decode {
                path,
                message: source.to_string(),
            },
            other @ (HttpDaoError::ClientBuilder { .. } | HttpDaoError::RequestSend { .. }) => {
                FetchError::network(other.to_string(), other)
            }
        }
    }
}
