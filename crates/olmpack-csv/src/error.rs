//! Error types for ClusterServiceVersion generation

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building a ClusterServiceVersion
#[derive(Debug, Error, Diagnostic)]
pub enum CsvError {
    // ============ Scanner Errors ============
    #[error("Cannot decode {kind} {name}: {message}")]
    #[diagnostic(code(olmpack::csv::decode))]
    Decode {
        kind: String,
        name: String,
        message: String,
    },

    #[error("RoleBinding {binding} references unknown role {role}")]
    #[diagnostic(
        code(olmpack::csv::unresolved_role),
        help("add the referenced Role or ClusterRole to the input manifests")
    )]
    UnresolvedRoleRef { binding: String, role: String },

    // ============ Merge Errors ============
    #[error("Cannot merge owned CRDs: {message}")]
    #[diagnostic(code(olmpack::csv::merge))]
    Merge { message: String },

    // ============ Metadata Errors ============
    #[error("Cannot read chart file {path}: {source}")]
    #[diagnostic(code(olmpack::csv::chart))]
    ChartRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse chart metadata: {0}")]
    #[diagnostic(code(olmpack::csv::chart))]
    ChartParse(#[source] serde_yaml::Error),

    #[error("Cannot unmarshal {key} in Chart.yaml: {message}")]
    #[diagnostic(code(olmpack::csv::chart_annotation))]
    ChartAnnotation { key: String, message: String },

    #[error("Invalid version {version}: {source}")]
    #[diagnostic(
        code(olmpack::csv::version),
        help("bundle versions must be semantic versions, e.g. 1.2.3")
    )]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    // ============ Icon Errors ============
    #[error("Cannot fetch icon from {url}: {message}")]
    #[diagnostic(code(olmpack::csv::icon))]
    IconFetch { url: String, message: String },

    #[error("Icon media type {media_type} is not supported")]
    #[diagnostic(
        code(olmpack::csv::icon_media_type),
        help("supported media types are image/png and image/svg+xml")
    )]
    UnsupportedIconMediaType { media_type: String },

    // ============ Override Errors ============
    #[error("Cannot apply override file {path}: {message}")]
    #[diagnostic(code(olmpack::csv::overrides))]
    Override { path: String, message: String },

    // ============ Validation Errors ============
    #[error("Kind {kind} ({name}) is not supported by the OLM bundle format")]
    #[diagnostic(
        code(olmpack::csv::unsupported_kind),
        help("remove the resource or ship it outside the bundle")
    )]
    UnsupportedKind { kind: String, name: String },

    #[error(transparent)]
    #[diagnostic(code(olmpack::csv::core))]
    Core(#[from] olmpack_core::CoreError),
}

impl CsvError {
    /// Decode error for a record
    pub fn decode(record: &olmpack_core::Record, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            kind: record.kind.clone(),
            name: record.name.clone(),
            message: err.to_string(),
        }
    }
}

/// Result type for CSV operations
pub type Result<T> = std::result::Result<T, CsvError>;
