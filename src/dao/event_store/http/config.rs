use std::time::Duration;

/// Runtime configuration describing how to reach the event service.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL under which `events` lives, e.g. `http://localhost:3000/api`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpConfig {
    /// Settings for `base_url` with a 10 s timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
