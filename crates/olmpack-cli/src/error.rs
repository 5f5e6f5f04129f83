//! CLI error types with exit code handling
//!
//! Library errors pass through with their diagnostics intact; the wrapper
//! only decides which exit code the process ends with.

use miette::Diagnostic;
use olmpack_core::CoreError;
use olmpack_csv::CsvError;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Failure while building the ClusterServiceVersion
    #[error(transparent)]
    #[diagnostic(transparent)]
    Csv(#[from] CsvError),

    /// Failure while reading manifests or writing the bundle
    #[error(transparent)]
    #[diagnostic(code(olmpack::cli::core))]
    Core(#[from] CoreError),

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(olmpack::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(olmpack::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Csv(err) => csv_exit_code(err),
            CliError::Core(err) => core_exit_code(err),
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

fn csv_exit_code(err: &CsvError) -> i32 {
    match err {
        CsvError::UnsupportedKind { .. } => exit_codes::VALIDATION_ERROR,
        CsvError::IconFetch { .. } | CsvError::UnsupportedIconMediaType { .. } => {
            exit_codes::NETWORK_ERROR
        }
        CsvError::ChartRead { .. } => exit_codes::IO_ERROR,
        CsvError::Core(core) => core_exit_code(core),
        CsvError::Merge { .. } => exit_codes::ERROR,
        CsvError::Decode { .. }
        | CsvError::UnresolvedRoleRef { .. }
        | CsvError::ChartParse(_)
        | CsvError::ChartAnnotation { .. }
        | CsvError::InvalidVersion { .. }
        | CsvError::Override { .. } => exit_codes::INPUT_ERROR,
    }
}

fn core_exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::Io(_) | CoreError::Write { .. } => exit_codes::IO_ERROR,
        CoreError::ManifestParse { .. }
        | CoreError::InvalidManifest { .. }
        | CoreError::YamlParse(_)
        | CoreError::JsonParse(_) => exit_codes::INPUT_ERROR,
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
