/*!
 * Error types for the cadtranslator application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::PipelineState;

/// Errors that can occur when working with translation service APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors raised while processing a single drawing
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input drawing does not exist
    #[error("Input not found: {0:?}")]
    InputNotFound(PathBuf),

    /// The converter failed or did not produce the expected output
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// The glossary file is missing a header or a language column
    #[error("Glossary format error: {0}")]
    GlossaryFormatError(String),

    /// The translation service failed for one string
    #[error("Translation service error: {0}")]
    ServiceError(#[from] ProviderError),

    /// A text element could not be written back
    #[error("Reinsertion error: {0}")]
    ReinsertionError(String),

    /// The drawing could not be parsed or written
    #[error("Drawing format error: {0}")]
    DrawingFormatError(String),

    /// Another input of the same batch already writes this output
    #[error("Output {0:?} is also produced by another input")]
    OutputConflict(PathBuf),

    /// A run tried to skip or revisit a state
    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    /// Underlying file system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file-level failure, reported with the state the pipeline was in
#[derive(Error, Debug)]
#[error("{input:?} failed while {state}: {error}")]
pub struct FileFailure {
    /// Drawing that failed
    pub input: PathBuf,
    /// State at the time of failure
    pub state: PipelineState,
    /// Cause
    #[source]
    pub error: PipelineError,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the drawing pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
