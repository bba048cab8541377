//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Transport-level failure while delivering a record
    #[error("Delivery to '{endpoint}' failed: {message}")]
    DeliveryFailed { endpoint: String, message: String },

    /// The remote endpoint answered with a status treated as failure
    #[error("Endpoint '{endpoint}' rejected record with status {status}")]
    RejectedStatus { endpoint: String, status: u16 },

    /// Async executor no longer accepts work
    #[error("Async executor has been shut down")]
    ExecutorShutdown,

    /// A handler's background worker has stopped
    #[error("Handler '{0}' has been stopped")]
    HandlerStopped(String),

    /// A handler failed to record an entry
    #[error("Handler '{handler}' failed: {message}")]
    HandlerFailed { handler: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a delivery error
    pub fn delivery(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::DeliveryFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a status rejection error
    pub fn rejected(endpoint: impl Into<String>, status: u16) -> Self {
        LoggerError::RejectedStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Create a handler failure error
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::HandlerFailed {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether retrying the same operation could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LoggerError::IoError(_)
                | LoggerError::DeliveryFailed { .. }
                | LoggerError::RejectedStatus { .. }
        )
    }
}
