//! Manifest records
//!
//! A [`Record`] is one parsed Kubernetes manifest. The identifying fields
//! (`apiVersion`, `kind`, `metadata.name`, `metadata.namespace`) are lifted
//! out of the payload so scanners can classify records without walking JSON.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, Result};

/// A single input manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// API version (e.g. `apps/v1`)
    pub api_version: String,
    /// Resource kind (e.g. `Deployment`)
    pub kind: String,
    /// `metadata.name`
    pub name: String,
    /// `metadata.namespace`, empty when unset or cleared
    pub namespace: String,
    /// The full manifest object
    pub payload: Value,
}

impl Record {
    /// Build a record from a manifest object
    ///
    /// Fails when the document is not a mapping or lacks `apiVersion`/`kind`.
    pub fn from_value(payload: Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(CoreError::InvalidManifest {
                message: "document is not a mapping".to_string(),
            });
        }

        let api_version = string_at(&payload, &["apiVersion"]);
        let kind = string_at(&payload, &["kind"]);
        if api_version.is_empty() || kind.is_empty() {
            return Err(CoreError::InvalidManifest {
                message: "missing apiVersion or kind".to_string(),
            });
        }

        Ok(Self {
            api_version,
            kind,
            name: string_at(&payload, &["metadata", "name"]),
            namespace: string_at(&payload, &["metadata", "namespace"]),
            payload,
        })
    }

    /// Case-insensitive kind comparison
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }

    /// Remove `metadata.namespace` from the record and its payload
    pub fn clear_namespace(&mut self) {
        self.namespace.clear();
        if let Some(metadata) = self
            .payload
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
        {
            metadata.remove("namespace");
        }
    }

    /// Decode a field of the payload into a typed value
    ///
    /// A missing field decodes from `null`, so optional and defaulted types
    /// decode fine while required structures report an error.
    pub fn decode_field<T: DeserializeOwned>(&self, field: &str) -> serde_json::Result<T> {
        let value = self.payload.get(field).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
    }

    /// `Kind/name` for log and error messages
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.kind.clone()
        } else {
            format!("{}/{}", self.kind, self.name)
        }
    }
}

fn string_at(value: &Value, path: &[&str]) -> String {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
