//! OLM bundle writer
//!
//! Lays out a registry+v1 bundle directory:
//!
//! ```text
//! <package_dir>/bundle/
//! ├── Dockerfile
//! ├── manifests/
//! │   ├── <name>.ClusterServiceVersion.yaml
//! │   └── <name>.<Kind>.yaml
//! └── metadata/
//!     └── annotations.yaml
//! ```

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::csv::{CSV_KIND, ClusterServiceVersion};
use crate::error::{CoreError, Result};
use crate::record::Record;

pub const MEDIATYPE_ANNOTATION: &str = "operators.operatorframework.io.bundle.mediatype.v1";
pub const MANIFESTS_ANNOTATION: &str = "operators.operatorframework.io.bundle.manifests.v1";
pub const METADATA_ANNOTATION: &str = "operators.operatorframework.io.bundle.metadata.v1";
pub const PACKAGE_ANNOTATION: &str = "operators.operatorframework.io.bundle.package.v1";
pub const CHANNELS_ANNOTATION: &str = "operators.operatorframework.io.bundle.channels.v1";
pub const DEFAULT_CHANNEL_ANNOTATION: &str =
    "operators.operatorframework.io.bundle.channel.default.v1";

/// Standard bundle annotations for a package
pub fn default_annotations(
    package: &str,
    channels: &[String],
    default_channel: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MEDIATYPE_ANNOTATION.to_string(), "registry+v1".to_string()),
        (MANIFESTS_ANNOTATION.to_string(), "manifests/".to_string()),
        (METADATA_ANNOTATION.to_string(), "metadata/".to_string()),
        (PACKAGE_ANNOTATION.to_string(), package.to_string()),
        (CHANNELS_ANNOTATION.to_string(), channels.join(",")),
        (DEFAULT_CHANNEL_ANNOTATION.to_string(), default_channel.to_string()),
    ])
}

/// One object written to `manifests/`
#[derive(Debug, Clone)]
pub struct BundleManifest {
    pub name: String,
    pub kind: String,
    pub content: Value,
}

impl BundleManifest {
    pub fn from_csv(csv: &ClusterServiceVersion) -> Result<Self> {
        Ok(Self {
            name: csv.metadata.name.clone(),
            kind: CSV_KIND.to_string(),
            content: serde_json::to_value(csv)?,
        })
    }

    /// File name inside `manifests/`
    pub fn file_name(&self) -> String {
        format!("{}.{}.yaml", clean_name(&self.name), self.kind)
    }
}

impl From<Record> for BundleManifest {
    fn from(record: Record) -> Self {
        Self {
            name: record.name,
            kind: record.kind,
            content: record.payload,
        }
    }
}

#[derive(Serialize)]
struct AnnotationsFile<'a> {
    annotations: &'a BTreeMap<String, String>,
}

/// The final state written to disk
#[derive(Debug)]
pub struct Bundle {
    pub package_dir: PathBuf,
    pub manifests: Vec<BundleManifest>,
    pub annotations: BTreeMap<String, String>,
}

impl Bundle {
    /// Write the bundle and return the bundle directory
    pub fn write(&self) -> Result<PathBuf> {
        let bundle_dir = self.package_dir.join("bundle");
        create_dir(&bundle_dir)?;

        write_file(&bundle_dir.join("Dockerfile"), self.dockerfile())?;
        self.write_manifests(&bundle_dir.join("manifests"))?;
        self.write_annotations(&bundle_dir.join("metadata"))?;

        tracing::debug!(
            dir = %bundle_dir.display(),
            manifests = self.manifests.len(),
            "bundle written"
        );
        Ok(bundle_dir)
    }

    /// Dockerfile content; labels mirror the annotations, sorted by key
    pub fn dockerfile(&self) -> String {
        let mut out = String::from("FROM scratch\n\n");
        for (key, value) in &self.annotations {
            out.push_str(&format!("LABEL {}={}\n", key, value));
        }
        out.push_str("\nCOPY manifests /manifests/\n");
        out.push_str("COPY metadata /metadata/\n");
        out
    }

    fn write_manifests(&self, dir: &Path) -> Result<()> {
        create_dir(dir)?;
        for manifest in &self.manifests {
            let content = serde_yaml::to_string(&manifest.content)?;
            write_file(&dir.join(manifest.file_name()), content)?;
        }
        Ok(())
    }

    fn write_annotations(&self, dir: &Path) -> Result<()> {
        create_dir(dir)?;
        let content = serde_yaml::to_string(&AnnotationsFile {
            annotations: &self.annotations,
        })?;
        write_file(&dir.join("annotations.yaml"), content)
    }
}

fn clean_name(name: &str) -> String {
    name.replace(':', "_")
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, content: String) -> Result<()> {
    fs::write(path, content).map_err(|source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
