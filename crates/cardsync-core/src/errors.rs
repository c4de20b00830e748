use crate::config::ConfigError;

/// Failure of a single call against the tracking service.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("tracking service returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
}

impl RemoteError {
    /// Classify an HTTP response into the appropriate variant. 2xx never
    /// reaches this; callers check success first.
    pub fn from_status(status: u16, body: String) -> Self {
        Self::Http { status, body }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Http { status, .. } => match status {
                401 | 403 => "unauthorized",
                404 => "not_found",
                429 => "rate_limited",
                500..=599 => "server_error",
                _ => "http_error",
            },
            Self::Network(_) => "network_error",
        }
    }
}

/// Why one event's reconciliation was aborted.
///
/// Nothing here is fatal to the process, and none of it propagates to
/// the webhook response: the HTTP layer logs the error and acknowledges
/// 200 regardless, because a non-2xx would make Trello redeliver the
/// event and redelivered creates duplicate master items.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("configuration fault: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ReconcileError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_fault",
            Self::Remote(e) => e.error_kind(),
        }
    }
}
