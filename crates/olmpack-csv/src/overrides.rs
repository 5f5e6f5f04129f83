//! User-supplied overrides
//!
//! Files dropped into the output directory are merged over the generated
//! output, so hand-maintained fields survive regeneration:
//!
//! - `clusterserviceversion.yaml`: any part of the ClusterServiceVersion
//! - `annotations.yaml`: an `annotations:` map for `metadata/annotations.yaml`

use olmpack_core::{ClusterServiceVersion, deep_merge};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CsvError, Result};

pub const CSV_OVERRIDE_FILE: &str = "clusterserviceversion.yaml";
pub const ANNOTATIONS_OVERRIDE_FILE: &str = "annotations.yaml";

#[derive(Debug, Deserialize)]
struct AnnotationsOverride {
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

/// Merge `<dir>/clusterserviceversion.yaml` over `csv`, if present
pub fn override_cluster_service_version(csv: &mut ClusterServiceVersion, dir: &Path) -> Result<()> {
    let path = dir.join(CSV_OVERRIDE_FILE);
    let Some(overlay) = read_override::<serde_json::Value>(&path)? else {
        return Ok(());
    };
    if overlay.is_null() {
        return Ok(());
    }

    let override_error = |message: String| CsvError::Override {
        path: path.display().to_string(),
        message,
    };

    let mut merged = serde_json::to_value(&*csv).map_err(|e| override_error(e.to_string()))?;
    deep_merge(&mut merged, &overlay);
    *csv = serde_json::from_value(merged).map_err(|e| override_error(e.to_string()))?;

    tracing::debug!(path = %path.display(), "applied ClusterServiceVersion override");
    Ok(())
}

/// Merge the `annotations` map of `<dir>/annotations.yaml`, if present
pub fn override_annotations(annotations: &mut BTreeMap<String, String>, dir: &Path) -> Result<()> {
    let path = dir.join(ANNOTATIONS_OVERRIDE_FILE);
    let Some(overlay) = read_override::<AnnotationsOverride>(&path)? else {
        return Ok(());
    };

    annotations.extend(overlay.annotations);
    tracing::debug!(path = %path.display(), "applied annotations override");
    Ok(())
}

fn read_override<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }

    let override_error = |message: String| CsvError::Override {
        path: path.display().to_string(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| override_error(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| override_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_are_noop() {
        let dir = TempDir::new().unwrap();
        let mut csv = ClusterServiceVersion::new();
        let mut annotations = BTreeMap::from([("a".to_string(), "1".to_string())]);

        override_cluster_service_version(&mut csv, dir.path()).unwrap();
        override_annotations(&mut annotations, dir.path()).unwrap();

        assert_eq!(csv, ClusterServiceVersion::new());
        assert_eq!(annotations.len(), 1);
    }

    #[test]
    fn test_csv_override_deep_merges() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CSV_OVERRIDE_FILE),
            "metadata:\n  annotations:\n    categories: Database\nspec:\n  minKubeVersion: 1.25.0\n  keywords: [db]\n",
        )
        .unwrap();
        let mut csv = ClusterServiceVersion::new();
        csv.metadata.name = "demo.v1.0.0".to_string();
        csv.spec.keywords = vec!["one".to_string(), "two".to_string()];
        csv.annotations_mut()
            .insert("capabilities".to_string(), "Basic Install".to_string());

        override_cluster_service_version(&mut csv, dir.path()).unwrap();

        assert_eq!(csv.metadata.name, "demo.v1.0.0");
        assert_eq!(csv.metadata.annotations["capabilities"], "Basic Install");
        assert_eq!(csv.metadata.annotations["categories"], "Database");
        assert_eq!(csv.spec.min_kube_version.as_deref(), Some("1.25.0"));
        assert_eq!(csv.spec.keywords, vec!["db"]);
    }

    #[test]
    fn test_csv_override_keeps_unmodelled_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CSV_OVERRIDE_FILE),
            "metadata:\n  labels:\n    team: platform\nspec:\n  replaces: demo.v0.9.0\n  provider:\n    name: Example\n  maturity: alpha\n",
        )
        .unwrap();
        let mut csv = ClusterServiceVersion::new();
        csv.metadata.name = "demo.v1.0.0".to_string();

        override_cluster_service_version(&mut csv, dir.path()).unwrap();

        let value = serde_json::to_value(&csv).unwrap();
        assert_eq!(value["metadata"]["name"], "demo.v1.0.0");
        assert_eq!(value["metadata"]["labels"]["team"], "platform");
        assert_eq!(value["spec"]["replaces"], "demo.v0.9.0");
        assert_eq!(value["spec"]["provider"]["name"], "Example");
        assert_eq!(value["spec"]["maturity"], "alpha");
    }

    #[test]
    fn test_annotations_override() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(ANNOTATIONS_OVERRIDE_FILE),
            "annotations:\n  operators.operatorframework.io.bundle.channels.v1: alpha\n  extra: yes-please\n",
        )
        .unwrap();
        let mut annotations = BTreeMap::from([
            (
                "operators.operatorframework.io.bundle.channels.v1".to_string(),
                "stable".to_string(),
            ),
            ("kept".to_string(), "value".to_string()),
        ]);

        override_annotations(&mut annotations, dir.path()).unwrap();

        assert_eq!(
            annotations["operators.operatorframework.io.bundle.channels.v1"],
            "alpha"
        );
        assert_eq!(annotations["extra"], "yes-please");
        assert_eq!(annotations["kept"], "value");
    }

    #[test]
    fn test_malformed_override_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CSV_OVERRIDE_FILE), "spec: [unclosed").unwrap();

        let err = override_cluster_service_version(&mut ClusterServiceVersion::new(), dir.path())
            .unwrap_err();

        assert!(matches!(err, CsvError::Override { .. }));
    }
}
