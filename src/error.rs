//! Error types for graphbridge operations.
//!
//! Only [`GraphError::UnknownEngine`] is a fatal configuration error; every
//! other condition either propagates with context or degrades to a logged
//! no-op at the session layer.

use thiserror::Error;

/// Result type alias for graphbridge operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type covering connection, storage, and codec failures.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The engine identifier did not match any supported backend.
    ///
    /// This is a configuration error: the caller must not proceed with a
    /// half-initialized session. The hosting application decides whether
    /// to terminate.
    #[error("Unknown graph engine: {name}")]
    UnknownEngine {
        /// The identifier that failed to match, as given by the caller.
        name: String,
    },

    /// Backend storage error (RocksDB, file I/O, etc.)
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The session's engine does not support the requested operation.
    #[error("Operation '{operation}' is not supported by the {engine} engine")]
    Unsupported {
        /// Name of the refused operation
        operation: &'static str,
        /// Normalized identifier of the session's engine
        engine: &'static str,
    },

    /// Vertex not found in the store
    #[error("Vertex not found: {id}")]
    VertexNotFound {
        /// ID of the missing vertex
        id: u64,
    },

    /// Edge not found in the store
    #[error("Edge not found: {id}")]
    EdgeNotFound {
        /// ID of the missing edge
        id: u64,
    },

    /// Pending writes were discarded at close because the session was in
    /// manual-commit mode. Benign; swallowed and logged by `Session::close`.
    #[error("automatic transactions disabled, manual commit required")]
    ManualCommitRequired,

    /// Operation attempted on a session that has already been closed.
    #[error("Session is already closed")]
    SessionClosed,
}

impl GraphError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_engine_message() {
        let err = GraphError::UnknownEngine {
            name: "graphite".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown graph engine: graphite");
    }

    #[test]
    fn test_storage_error_message() {
        let err = GraphError::storage("Failed to write to disk", None::<std::io::Error>);
        assert_eq!(err.to_string(), "Storage error: Failed to write to disk");
    }

    #[test]
    fn test_unsupported_message() {
        let err = GraphError::Unsupported {
            operation: "drop_index",
            engine: "distributed",
        };
        assert_eq!(
            err.to_string(),
            "Operation 'drop_index' is not supported by the distributed engine"
        );
    }
}
