//! Bundle content validation
//!
//! OLM only installs a fixed set of kinds from a registry+v1 bundle. Anything
//! else left over after embedding would be silently dropped at install time,
//! so generation fails instead.

use olmpack_core::Record;

use crate::error::{CsvError, Result};

/// Decides which kinds may ship in a bundle
pub trait SupportedKinds {
    fn is_supported(&self, kind: &str) -> bool;
}

impl<F> SupportedKinds for F
where
    F: Fn(&str) -> bool,
{
    fn is_supported(&self, kind: &str) -> bool {
        self(kind)
    }
}

/// Kinds accepted by the OLM registry+v1 bundle format
pub const OLM_SUPPORTED_KINDS: &[&str] = &[
    "ClusterServiceVersion",
    "CustomResourceDefinition",
    "Secret",
    "ClusterRole",
    "ClusterRoleBinding",
    "ServiceAccount",
    "Service",
    "ConfigMap",
    "Role",
    "RoleBinding",
    "PrometheusRule",
    "ServiceMonitor",
    "PodDisruptionBudget",
    "PriorityClass",
    "VerticalPodAutoscaler",
    "ConsoleYAMLSample",
    "ConsoleQuickStart",
    "ConsoleCLIDownload",
    "ConsoleLink",
    "NetworkPolicy",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct OlmSupportedKinds;

impl SupportedKinds for OlmSupportedKinds {
    fn is_supported(&self, kind: &str) -> bool {
        OLM_SUPPORTED_KINDS
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(kind))
    }
}

/// Fail on the first record whose kind is not supported
pub fn validate(records: &[Record], kinds: &dyn SupportedKinds) -> Result<()> {
    match records.iter().find(|r| !kinds.is_supported(&r.kind)) {
        Some(record) => Err(CsvError::UnsupportedKind {
            kind: record.kind.clone(),
            name: record.name.clone(),
        }),
        None => Ok(()),
    }
}
