//! olmpack Core - Core types for turning Kubernetes manifests into OLM bundles
//!
//! This crate provides the foundational types used throughout olmpack:
//! - `Record`: One parsed input manifest
//! - `ManifestParser`: Multi-document YAML/JSON ingestion
//! - `ClusterServiceVersion`: The aggregate descriptor of a bundle
//! - `Bundle`: The on-disk registry+v1 bundle layout

pub mod bundle;
pub mod csv;
pub mod error;
pub mod parser;
pub mod record;
pub mod values;

pub use bundle::{Bundle, BundleManifest, default_annotations};
pub use csv::{
    AppLink, ClusterServiceVersion, CrdDescription, Icon, InstallMode, InstallStrategy,
    Maintainer, StrategyDeploymentPermissions, StrategyDeploymentSpec,
};
pub use error::{CoreError, Result};
pub use parser::{ManifestParser, parse_documents};
pub use record::Record;
pub use values::deep_merge;
