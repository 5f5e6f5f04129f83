//! Manifest ingestion
//!
//! Splits YAML (or JSON) streams into [`Record`]s. Documents without
//! `apiVersion` or `kind` are dropped: rendered Helm templates routinely
//! produce empty documents and there is no lint step to reject them.

use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::record::Record;

/// Parses Kubernetes objects from streams and files
#[derive(Default)]
pub struct ManifestParser {
    streams: Vec<(String, Box<dyn Read>)>,
    file_paths: Vec<PathBuf>,
}

impl ManifestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named stream (e.g. stdin)
    pub fn with_stream(mut self, name: impl Into<String>, stream: impl Read + 'static) -> Self {
        self.streams.push((name.into(), Box::new(stream)));
        self
    }

    /// Add files, parsed after all streams
    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.file_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Parse every stream, then every file, in order
    pub fn parse(self) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for (name, mut stream) in self.streams {
            let mut content = String::new();
            stream.read_to_string(&mut content)?;
            records.extend(parse_documents(&content, &name)?);
        }

        for path in &self.file_paths {
            records.extend(parse_file(path)?);
        }

        Ok(records)
    }
}

/// Parse one manifest file
pub fn parse_file(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::ManifestParse {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_documents(&content, &path.display().to_string())
}

/// Parse a multi-document YAML string into records
///
/// Namespaces are stripped: OLM installs namespaced objects into the
/// operator's namespace, which is only known at install time.
pub fn parse_documents(content: &str, source_name: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).map_err(|e| CoreError::ManifestParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

        let has_identity = ["apiVersion", "kind"].iter().all(|key| {
            value
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty())
        });
        if !has_identity {
            tracing::debug!(source = source_name, "skipping document without apiVersion or kind");
            continue;
        }

        let mut record = Record::from_value(value)?;
        record.clear_namespace();
        records.push(record);
    }

    Ok(records)
}
