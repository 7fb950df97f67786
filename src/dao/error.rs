use std::error::Error;
use thiserror::Error;

/// Result alias for event service operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Error raised by event stores regardless of the underlying transport.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The service could not be reached or the exchange broke off.
    #[error("network error: {message}")]
    Network {
        /// Short description of the failure.
        message: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The requested event or match does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The service answered with an unexpected status.
    #[error("server responded with status {status} for `{path}`")]
    Server {
        /// Request path relative to the API root.
        path: String,
        /// HTTP status code.
        status: u16,
    },
    /// The service answered with a payload that cannot be used.
    #[error("invalid response for `{path}`: {message}")]
    Decode {
        /// Request path relative to the API root.
        path: String,
        /// Why the payload was refused.
        message: String,
    },
}

impl FetchError {
    /// Construct a network error from any transport failure.
    pub fn network(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        FetchError::Network {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Server { status, .. } => *status >= 500 || *status == 429,
            FetchError::NotFound(_) | FetchError::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_server_side_failures_are_transient() {
        assert!(FetchError::network("reset", std::io::Error::other("reset")).is_transient());
        assert!(
            FetchError::Server {
                path: "events/1".into(),
                status: 503
            }
            .is_transient()
        );
        assert!(
            !FetchError::Server {
                path: "events/1".into(),
                status: 400
            }
            .is_transient()
        );
        assert!(!FetchError::NotFound("events/1".into()).is_transient());
        assert!(
            !FetchError::Decode {
                path: "events/1".into(),
                message: "bad".into()
            }
            .is_transient()
        );
    }
}
