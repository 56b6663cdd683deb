//! Error Types
//!
//! This module defines the error types used throughout the runtime.
//!
//! # Overview
//!
//! The main error type [`RuntimeError`] covers the failure modes of the
//! pipeline build cache and the ping-pong resource manager:
//! - Pipeline compilation and hot-reload failures
//! - Caller contract violations (reading an unresolved pipeline handle)
//! - Resource-shape mismatches on ping-pong resources
//! - Shader source resolution and I/O errors
//!
//! # Usage
//!
//! Fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, RuntimeError>`.
//!
//! Failures that happen on a build worker never cross the thread boundary as
//! panics; they are turned into a message on the handle's result channel and
//! into a single call on the injected log sink.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the voxel runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// The device rejected the pipeline or produced a structurally invalid one.
    #[error("Pipeline compilation failed: {0}")]
    CompileFailure(String),

    /// A build slot failed to reload. Only the first failure is reported.
    #[error("Pipeline reload failed in slot {slot}: {message}")]
    ReloadFailure {
        /// Index of the first slot that reported an error
        slot: usize,
        /// The slot compiler's error message
        message: String,
    },

    /// The caller read a pipeline handle that is not ready.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(&'static str),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// A ping-pong resource was requested with a different description than
    /// the one it was allocated from.
    #[error("Ping-pong resource '{name}' requested with a different description")]
    ConfigurationMismatch {
        /// Base name of the resource pair
        name: String,
    },

    /// Rejected settings (e.g. a build cache without slots).
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    // ========================================================================
    // Shader Source Errors
    // ========================================================================
    /// No virtual file or file under the root paths matched.
    #[error("Shader source not found: {0}")]
    ShaderNotFound(String),

    /// `#include` nesting went deeper than the configured limit.
    #[error("Include depth {depth} exceeded while expanding {path:?}")]
    IncludeDepthExceeded {
        /// File whose expansion hit the limit
        path: PathBuf,
        /// Configured maximum depth
        depth: usize,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O or thread spawn error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, RuntimeError>`.
pub type Result<T> = std::result::Result<T, RuntimeError>;
