//! Error types for the pattern-loading seam.
//!
//! Loading is the only fallible operation the engine exposes; everything in
//! the live monitoring path swallows failures locally and logs them, so no
//! error type ever crosses that boundary.

use thiserror::Error;

/// Errors that can occur while fetching or compiling detection patterns.
#[derive(Error, Debug)]
pub enum PatternError {
    /// The pattern source could not be reached or read.
    #[error("pattern source unavailable: {0}")]
    Source(String),

    /// The pattern source returned data that is not a valid record list.
    #[error("malformed pattern data: {0}")]
    Parse(#[from] serde_json::Error),

    /// A single pattern's regex failed to compile.
    ///
    /// Surfaced by [`crate::patterns::compile_record`]; set-level compilation
    /// catches this per pattern, logs it, and keeps going.
    #[error("pattern '{id}' failed to compile: {source}")]
    Compile {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for pattern-loading operations.
pub type PatternResult<T> = std::result::Result<T, PatternError>;
