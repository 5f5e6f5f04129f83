//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - unparsable manifests, Chart.yaml or override files
pub const INPUT_ERROR: i32 = 2;

/// Validation error - the bundle would contain unsupported kinds
pub const VALIDATION_ERROR: i32 = 3;

/// Network error - the chart icon could not be fetched
pub const NETWORK_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
