//! Common types and utilities shared across sitefeed crates.
//!
//! This crate holds the shared error type and the observability helpers used by
//! the binary and the integration tests. It is intentionally lightweight so
//! every crate in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`SitefeedError`] and [`Result`]: Shared error handling at crate edges
//!
//! # Examples
//!
//! ```rust
//! use sitefeed_common::SitefeedError;
//!
//! let err = SitefeedError::Config("missing origin".into());
//! assert_eq!(err.to_string(), "Configuration error: missing origin");
//! ```

pub mod observability;

/// Error types used at the boundaries between sitefeed crates.
#[derive(thiserror::Error, Debug)]
pub enum SitefeedError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream feed could not be reached or decoded.
    #[error("Upstream error: {0}")]
    Upstream(#[from] anyhow::Error),

    /// Cache backend failed to read or write.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`SitefeedError`].
pub type Result<T> = std::result::Result<T, SitefeedError>;
