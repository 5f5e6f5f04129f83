//! olmpack CSV - ClusterServiceVersion aggregation
//!
//! Turns parsed manifests into an OLM ClusterServiceVersion:
//!
//! | Input record                      | Lands in                                    |
//! |-----------------------------------|---------------------------------------------|
//! | `CustomResourceDefinition`        | `spec.customresourcedefinitions.owned`      |
//! | `Deployment`                      | `spec.install.spec.deployments`             |
//! | `Role` / `ClusterRole`            | rules for the bindings below                |
//! | `RoleBinding`                     | `spec.install.spec.permissions`             |
//! | `ClusterRoleBinding`              | `spec.install.spec.clusterPermissions`      |
//! | anything else                     | residual manifest next to the CSV           |
//!
//! # Example
//!
//! ```no_run
//! use olmpack_core::{ClusterServiceVersion, ManifestParser};
//! use olmpack_csv::{EmbedOptions, Embedder, OlmSupportedKinds, validate};
//!
//! let records = ManifestParser::new()
//!     .with_files(["manifests.yaml"])
//!     .parse()
//!     .unwrap();
//!
//! let mut csv = ClusterServiceVersion::new();
//! let residual = Embedder::new(EmbedOptions::default())
//!     .embed(records, &mut csv)
//!     .unwrap();
//!
//! validate(&residual, &OlmSupportedKinds).unwrap();
//! ```
//!
//! Chart metadata ([`HelmMetadata`]), icons ([`IconFetcher`]) and user
//! override files ([`overrides`]) fill in the rest of the descriptor.

pub mod crd;
pub mod deployment;
pub mod embedder;
pub mod error;
pub mod icon;
pub mod merge;
pub mod metadata;
pub mod overrides;
pub mod scanner;
pub mod validate;

// Re-exports
pub use crd::CrdScanner;
pub use deployment::DeploymentScanner;
pub use embedder::{DEPLOYMENT_STRATEGY, EmbedOptions, Embedder};
pub use error::{CsvError, Result};
pub use icon::IconFetcher;
pub use merge::merge_owned_crds;
pub use metadata::{ChartMetadata, HelmMetadata};
pub use overrides::{override_annotations, override_cluster_service_version};
pub use scanner::{ScanOutcome, ScanState, Scanner};
pub use validate::{OlmSupportedKinds, SupportedKinds, validate};
