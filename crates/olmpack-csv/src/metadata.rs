//! Helm Chart.yaml metadata
//!
//! Copies package-level metadata from a Helm chart into the
//! ClusterServiceVersion. ArtifactHub operator annotations
//! (<https://artifacthub.io/docs/topics/annotations/helm/>) are honoured when
//! the chart declares `artifacthub.io/operator: "true"`.

use olmpack_core::{AppLink, ClusterServiceVersion, CrdDescription, Icon, Maintainer};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CsvError, Result};
use crate::merge::merge_owned_crds;

const OPERATOR_ANNOTATION: &str = "artifacthub.io/operator";
const CAPABILITIES_ANNOTATION: &str = "artifacthub.io/operatorCapabilities";
const MAINTAINERS_ANNOTATION: &str = "artifacthub.io/maintainers";
const CRDS_ANNOTATION: &str = "artifacthub.io/crds";
const CRDS_EXAMPLES_ANNOTATION: &str = "artifacthub.io/crdsExamples";

/// Helm Chart.yaml structure (the fields olmpack uses)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart name
    pub name: String,

    /// Chart version (SemVer)
    pub version: String,

    /// Chart description
    #[serde(default)]
    pub description: Option<String>,

    /// Project home page
    #[serde(default)]
    pub home: Option<String>,

    /// Source code URLs
    #[serde(default)]
    pub sources: Vec<String>,

    /// Keywords for searching
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Maintainers
    #[serde(default)]
    pub maintainers: Vec<ChartMaintainer>,

    /// Icon URL
    #[serde(default)]
    pub icon: Option<String>,

    /// Annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Helm maintainer
#[derive(Debug, Clone, Deserialize)]
pub struct ChartMaintainer {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

impl ChartMetadata {
    /// Parse a Chart.yaml string
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(CsvError::ChartParse)
    }

    /// Read and parse a Chart.yaml file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CsvError::ChartRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Whether the chart opts into ArtifactHub operator annotations
    pub fn is_operator(&self) -> bool {
        self.annotations
            .get(OPERATOR_ANNOTATION)
            .is_some_and(|v| v == "true")
    }

    /// `Home`, then `Source` (or `Source N` when there are several)
    pub fn links(&self) -> Vec<AppLink> {
        let mut links = Vec::new();
        if let Some(home) = self.home.as_deref().filter(|h| !h.is_empty()) {
            links.push(AppLink {
                name: "Home".to_string(),
                url: home.to_string(),
            });
        }

        match self.sources.as_slice() {
            [] => {}
            [source] => links.push(AppLink {
                name: "Source".to_string(),
                url: source.clone(),
            }),
            sources => links.extend(sources.iter().enumerate().map(|(i, url)| AppLink {
                name: format!("Source {}", i + 1),
                url: url.clone(),
            })),
        }

        links
    }

    /// Decode a YAML-valued annotation
    fn annotation<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.annotations
            .get(key)
            .map(|raw| {
                serde_yaml::from_str(raw).map_err(|e| CsvError::ChartAnnotation {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Embeds chart metadata into a ClusterServiceVersion
#[derive(Debug, Clone)]
pub struct HelmMetadata {
    pub chart: ChartMetadata,
    /// Bundle version; Chart.yaml's version when unset
    pub version_override: Option<String>,
    /// Chart annotations take precedence over collected data
    pub helm_chart_overrides: bool,
}

impl HelmMetadata {
    pub fn new(chart: ChartMetadata) -> Self {
        Self {
            chart,
            version_override: None,
            helm_chart_overrides: false,
        }
    }

    /// Load from a Chart.yaml path
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(ChartMetadata::from_file(path)?))
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version_override = version.filter(|v| !v.is_empty());
        self
    }

    pub fn with_overrides(mut self, overrides: bool) -> Self {
        self.helm_chart_overrides = overrides;
        self
    }

    /// Bundle version string
    pub fn version(&self) -> &str {
        self.version_override
            .as_deref()
            .unwrap_or(&self.chart.version)
    }

    /// OLM package name
    pub fn package_name(&self) -> &str {
        &self.chart.name
    }

    /// Copy scalar metadata and annotation-derived fields into `csv`
    ///
    /// The owned CRD list is reconciled separately by [`Self::reconcile_crds`]
    /// once the scanners have run.
    pub fn embed(&self, csv: &mut ClusterServiceVersion, icon: Option<Icon>) -> Result<()> {
        let version_str = self.version();
        let version = semver::Version::parse(version_str.trim_start_matches('v')).map_err(
            |source| CsvError::InvalidVersion {
                version: version_str.to_string(),
                source,
            },
        )?;

        csv.metadata.name = format!("{}.v{}", self.chart.name, version);
        csv.spec.version = Some(version);
        if csv.spec.display_name.is_empty() {
            csv.spec.display_name = self.chart.name.clone();
        }
        csv.spec.description = self.chart.description.clone().unwrap_or_default();
        csv.spec.maintainers = self
            .chart
            .maintainers
            .iter()
            .map(|m| Maintainer {
                name: m.name.clone(),
                email: m.email.clone().unwrap_or_default(),
            })
            .collect();
        csv.spec.links = self.chart.links();
        csv.spec.keywords = self.chart.keywords.clone();
        if let Some(icon) = icon {
            csv.spec.icon = vec![icon];
        }

        if self.chart.is_operator() {
            self.embed_artifacthub(csv)?;
        }
        Ok(())
    }

    fn embed_artifacthub(&self, csv: &mut ClusterServiceVersion) -> Result<()> {
        if let Some(capabilities) = self.chart.annotations.get(CAPABILITIES_ANNOTATION) {
            csv.annotations_mut()
                .insert("capabilities".to_string(), capabilities.clone());
        }

        let maintainers: Option<Vec<Maintainer>> = self.chart.annotation(MAINTAINERS_ANNOTATION)?;
        if self.helm_chart_overrides
            && let Some(maintainers) = maintainers
        {
            csv.spec.maintainers = maintainers;
        }

        let examples: Option<serde_json::Value> = self.chart.annotation(CRDS_EXAMPLES_ANNOTATION)?;
        if let Some(examples) = examples {
            let json = serde_json::to_string(&examples).map_err(|e| CsvError::ChartAnnotation {
                key: CRDS_EXAMPLES_ANNOTATION.to_string(),
                message: e.to_string(),
            })?;
            csv.annotations_mut().insert("alm-examples".to_string(), json);
        }

        Ok(())
    }

    /// Owned CRDs declared in `artifacthub.io/crds`
    pub fn declared_crds(&self) -> Result<Vec<CrdDescription>> {
        if !self.chart.is_operator() {
            return Ok(Vec::new());
        }
        Ok(self.chart.annotation(CRDS_ANNOTATION)?.unwrap_or_default())
    }

    /// Merge the declared owned CRDs with the scanned ones
    pub fn reconcile_crds(&self, csv: &mut ClusterServiceVersion) -> Result<()> {
        let declared = self.declared_crds()?;
        let scanned = std::mem::take(csv.owned_crds_mut());
        *csv.owned_crds_mut() = merge_owned_crds(scanned, declared, self.helm_chart_overrides);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATOR_CHART: &str = r#"
apiVersion: v2
name: widget-operator
version: v1.2.3
description: Manages widgets
home: https://example.com
sources:
  - https://github.com/example/widget-operator
keywords: [widgets, operator]
maintainers:
  - name: Jane
    email: jane@example.com
annotations:
  artifacthub.io/operator: "true"
  artifacthub.io/operatorCapabilities: Basic Install
  artifacthub.io/maintainers: |
    - name: Ops Team
      email: ops@example.com
  artifacthub.io/crds: |
    - name: widgets.example.com
      version: v1
      kind: Widget
      displayName: Widget
      description: A widget
  artifacthub.io/crdsExamples: |
    - apiVersion: example.com/v1
      kind: Widget
      metadata:
        name: sample
"#;

    fn scanned_widget() -> CrdDescription {
        CrdDescription {
            name: "widgets.example.com".to_string(),
            version: "v1".to_string(),
            kind: "Widget".to_string(),
            display_name: "Widget".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_embed_basic_fields() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap());
        let mut csv = ClusterServiceVersion::new();

        metadata.embed(&mut csv, None).unwrap();

        assert_eq!(csv.metadata.name, "widget-operator.v1.2.3");
        assert_eq!(csv.spec.version, Some(semver::Version::new(1, 2, 3)));
        assert_eq!(csv.spec.description, "Manages widgets");
        assert_eq!(csv.spec.keywords, vec!["widgets", "operator"]);
        assert_eq!(csv.spec.maintainers[0].name, "Jane");
        assert_eq!(csv.spec.maintainers[0].email, "jane@example.com");
        assert_eq!(csv.spec.links.len(), 2);
        assert_eq!(csv.spec.links[1].name, "Source");
    }

    #[test]
    fn test_version_override_wins() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap())
            .with_version(Some("2.0.0".to_string()));
        let mut csv = ClusterServiceVersion::new();

        metadata.embed(&mut csv, None).unwrap();

        assert_eq!(csv.metadata.name, "widget-operator.v2.0.0");
    }

    #[test]
    fn test_name_uses_normalized_version() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap())
            .with_version(Some("v2.0.0".to_string()));
        let mut csv = ClusterServiceVersion::new();

        metadata.embed(&mut csv, None).unwrap();

        assert_eq!(csv.metadata.name, "widget-operator.v2.0.0");
        assert_eq!(csv.spec.version, Some(semver::Version::new(2, 0, 0)));
    }

    #[test]
    fn test_invalid_version() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap())
            .with_version(Some("latest".to_string()));

        let err = metadata
            .embed(&mut ClusterServiceVersion::new(), None)
            .unwrap_err();

        assert!(matches!(err, CsvError::InvalidVersion { .. }));
    }

    #[test]
    fn test_artifacthub_annotations() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap());
        let mut csv = ClusterServiceVersion::new();

        metadata.embed(&mut csv, None).unwrap();

        assert_eq!(csv.metadata.annotations["capabilities"], "Basic Install");
        let examples: serde_json::Value =
            serde_json::from_str(&csv.metadata.annotations["alm-examples"]).unwrap();
        assert_eq!(examples[0]["kind"], "Widget");
        // Chart maintainers stay unless overrides are enabled
        assert_eq!(csv.spec.maintainers[0].name, "Jane");
    }

    #[test]
    fn test_artifacthub_maintainers_with_overrides() {
        let metadata =
            HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap()).with_overrides(true);
        let mut csv = ClusterServiceVersion::new();

        metadata.embed(&mut csv, None).unwrap();

        assert_eq!(csv.spec.maintainers.len(), 1);
        assert_eq!(csv.spec.maintainers[0].name, "Ops Team");
    }

    #[test]
    fn test_non_operator_chart_ignores_artifacthub() {
        let chart = ChartMetadata::parse(
            "name: plain\nversion: 0.1.0\nannotations:\n  artifacthub.io/operatorCapabilities: Full Lifecycle\n",
        )
        .unwrap();
        let metadata = HelmMetadata::new(chart);
        let mut csv = ClusterServiceVersion::new();

        metadata.embed(&mut csv, None).unwrap();

        assert!(csv.metadata.annotations.is_empty());
        assert!(metadata.declared_crds().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_annotation() {
        let chart = ChartMetadata::parse(
            "name: broken\nversion: 0.1.0\nannotations:\n  artifacthub.io/operator: \"true\"\n  artifacthub.io/crds: \"{not: [a list\"\n",
        )
        .unwrap();

        let err = HelmMetadata::new(chart).declared_crds().unwrap_err();

        assert!(matches!(err, CsvError::ChartAnnotation { ref key, .. } if key == CRDS_ANNOTATION));
    }

    #[test]
    fn test_reconcile_crds_patches_scanned_list() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap());
        let mut csv = ClusterServiceVersion::new();
        csv.owned_crds_mut().push(scanned_widget());

        metadata.reconcile_crds(&mut csv).unwrap();

        assert_eq!(csv.owned_crds().len(), 1);
        assert_eq!(csv.owned_crds()[0].description, "A widget");
    }

    #[test]
    fn test_links_multiple_sources() {
        let chart = ChartMetadata {
            sources: vec!["https://a".to_string(), "https://b".to_string()],
            ..Default::default()
        };

        let names: Vec<_> = chart.links().into_iter().map(|l| l.name).collect();

        assert_eq!(names, ["Source 1", "Source 2"]);
    }

    #[test]
    fn test_icon_is_set() {
        let metadata = HelmMetadata::new(ChartMetadata::parse(OPERATOR_CHART).unwrap());
        let mut csv = ClusterServiceVersion::new();
        let icon = Icon {
            data: "aWNvbg==".to_string(),
            media_type: "image/png".to_string(),
        };

        metadata.embed(&mut csv, Some(icon.clone())).unwrap();

        assert_eq!(csv.spec.icon, vec![icon]);
    }
}
