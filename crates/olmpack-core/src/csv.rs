//! ClusterServiceVersion model
//!
//! The subset of the OLM `operators.coreos.com/v1alpha1` ClusterServiceVersion
//! that olmpack fills in. Field names follow the OLM wire format; empty
//! collections and unset values are omitted when serialized so the emitted
//! YAML stays minimal. Fields olmpack does not model (`spec.replaces`,
//! `spec.provider`, `metadata.labels`, ...) are kept in `extra` and
//! serialized back unchanged.

use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::PolicyRule;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const CSV_API_VERSION: &str = "operators.coreos.com/v1alpha1";
pub const CSV_KIND: &str = "ClusterServiceVersion";

/// The aggregate descriptor of an operator bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceVersion {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: CsvMetadata,
    #[serde(default)]
    pub spec: CsvSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ClusterServiceVersion {
    fn default() -> Self {
        Self {
            api_version: CSV_API_VERSION.to_string(),
            kind: CSV_KIND.to_string(),
            metadata: CsvMetadata::default(),
            spec: CsvSpec::default(),
            extra: Map::new(),
        }
    }
}

impl ClusterServiceVersion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned custom resources (`spec.customresourcedefinitions.owned`)
    pub fn owned_crds(&self) -> &[CrdDescription] {
        &self.spec.custom_resource_definitions.owned
    }

    pub fn owned_crds_mut(&mut self) -> &mut Vec<CrdDescription> {
        &mut self.spec.custom_resource_definitions.owned
    }

    pub fn install_strategy(&self) -> &InstallStrategy {
        &self.spec.install
    }

    pub fn install_strategy_mut(&mut self) -> &mut InstallStrategy {
        &mut self.spec.install
    }

    pub fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata.annotations
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<semver::Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_kube_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<AppLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icon: Vec<Icon>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install_modes: Vec<InstallMode>,
    #[serde(rename = "customresourcedefinitions", default)]
    pub custom_resource_definitions: CustomResourceDefinitions,
    #[serde(default)]
    pub install: InstallStrategy,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CsvSpec {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            description: String::new(),
            version: None,
            min_kube_version: None,
            keywords: Vec::new(),
            maintainers: Vec::new(),
            links: Vec::new(),
            icon: Vec::new(),
            install_modes: InstallMode::all_supported(),
            custom_resource_definitions: CustomResourceDefinitions::default(),
            install: InstallStrategy::default(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomResourceDefinitions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owned: Vec<CrdDescription>,
    /// `required` and any other list olmpack does not fill
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An owned custom resource entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdDescription {
    /// Full CRD name (`<plural>.<group>`)
    pub name: String,
    /// Served API version
    #[serde(default)]
    pub version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    #[serde(rename = "base64data")]
    pub data: String,
    #[serde(rename = "mediatype")]
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallMode {
    #[serde(rename = "type")]
    pub mode: String,
    pub supported: bool,
}

impl InstallMode {
    /// Every OLM install mode, all supported
    pub fn all_supported() -> Vec<Self> {
        ["OwnNamespace", "SingleNamespace", "MultiNamespace", "AllNamespaces"]
            .into_iter()
            .map(|mode| Self {
                mode: mode.to_string(),
                supported: true,
            })
            .collect()
    }
}

/// `spec.install`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallStrategy {
    /// Strategy name; set iff at least one Deployment was embedded
    #[serde(rename = "strategy", default, skip_serializing_if = "String::is_empty")]
    pub strategy_name: String,
    #[serde(default)]
    pub spec: StrategyDetailsDeployment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDetailsDeployment {
    #[serde(rename = "deployments", default, skip_serializing_if = "Vec::is_empty")]
    pub deployment_specs: Vec<StrategyDeploymentSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<StrategyDeploymentPermissions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_permissions: Vec<StrategyDeploymentPermissions>,
}

/// A Deployment embedded in the install strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDeploymentSpec {
    pub name: String,
    pub spec: DeploymentSpec,
}

/// RBAC rules granted to one service account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDeploymentPermissions {
    pub service_account_name: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_type_meta() {
        let csv = ClusterServiceVersion::new();
        assert_eq!(csv.api_version, "operators.coreos.com/v1alpha1");
        assert_eq!(csv.kind, "ClusterServiceVersion");
        assert_eq!(csv.spec.install_modes.len(), 4);
    }

    #[test]
    fn test_serialize_omits_empty_strategy() {
        let csv = ClusterServiceVersion::new();
        let value = serde_json::to_value(&csv).unwrap();

        assert!(value["spec"]["install"].get("strategy").is_none());
        assert!(value["spec"]["customresourcedefinitions"].get("owned").is_none());
        assert!(value["metadata"].get("annotations").is_none());
    }

    #[test]
    fn test_wire_names() {
        let mut csv = ClusterServiceVersion::new();
        csv.owned_crds_mut().push(CrdDescription {
            name: "widgets.example.com".to_string(),
            version: "v1".to_string(),
            kind: "Widget".to_string(),
            display_name: "Widget".to_string(),
            description: String::new(),
        });
        csv.install_strategy_mut().strategy_name = "deployment".to_string();
        csv.install_strategy_mut()
            .spec
            .cluster_permissions
            .push(StrategyDeploymentPermissions {
                service_account_name: "operator".to_string(),
                rules: Vec::new(),
            });

        let value = serde_json::to_value(&csv).unwrap();
        let owned = &value["spec"]["customresourcedefinitions"]["owned"][0];
        assert_eq!(owned["displayName"], "Widget");
        assert_eq!(value["spec"]["install"]["strategy"], "deployment");
        assert_eq!(
            value["spec"]["install"]["spec"]["clusterPermissions"][0]["serviceAccountName"],
            "operator"
        );
    }

    #[test]
    fn test_deserialize_partial_document() {
        let csv: ClusterServiceVersion = serde_yaml::from_str(
            r#"
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: demo.v1.0.0
spec:
  version: 1.0.0
  customresourcedefinitions:
    owned:
      - name: widgets.example.com
        version: v1
        kind: Widget
"#,
        )
        .unwrap();

        assert_eq!(csv.metadata.name, "demo.v1.0.0");
        assert_eq!(csv.spec.version, Some(semver::Version::new(1, 0, 0)));
        assert_eq!(csv.owned_crds()[0].kind, "Widget");
        assert!(csv.install_strategy().strategy_name.is_empty());
    }

    #[test]
    fn test_unmodelled_fields_round_trip() {
        let csv: ClusterServiceVersion = serde_yaml::from_str(
            r#"
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: demo.v1.0.0
  labels:
    team: platform
spec:
  replaces: demo.v0.9.0
  maturity: stable
  customresourcedefinitions:
    required:
      - name: certificates.cert-manager.io
        version: v1
        kind: Certificate
"#,
        )
        .unwrap();

        let value = serde_json::to_value(&csv).unwrap();

        assert_eq!(value["metadata"]["labels"]["team"], "platform");
        assert_eq!(value["spec"]["replaces"], "demo.v0.9.0");
        assert_eq!(value["spec"]["maturity"], "stable");
        assert_eq!(
            value["spec"]["customresourcedefinitions"]["required"][0]["kind"],
            "Certificate"
        );
        assert!(value.get("extra").is_none());
    }
}
