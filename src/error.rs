//! Error handling for tcp-beep
//!
//! This module defines the crate error type and a Result alias used
//! throughout the monitor. Steady-state network faults never surface as
//! `MonitorError` to the caller; probes turn them into stat events. The
//! variants here cover startup failures and the internal plumbing that
//! reports them.

use thiserror::Error;

/// Main error type for tcp-beep operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An address string could not be parsed or resolved
    #[error("Invalid address '{address}': {message}")]
    Address { address: String, message: String },

    /// The echo responder could not bind its listening socket
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the connection
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// The peer sent something other than what the line protocol allows
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A worker thread could not be spawned or joined
    #[error("Thread error: {0}")]
    Thread(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MonitorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an address error
    pub fn address(address: impl Into<String>, message: impl Into<String>) -> Self {
        MonitorError::Address {
            address: address.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for tcp-beep operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MonitorError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| MonitorError::Io(e).with_context(f()))
    }
}
