//! Owned CRD reconciliation
//!
//! Chart metadata may declare its own list of owned CRDs. It is reconciled
//! against the list the CRD scanner collected:
//!
//! 1. an empty external list keeps the scanned list
//! 2. an empty scanned list takes the external list
//! 3. `override_all` takes the external list
//! 4. any structural conflict (or a patch failure) takes the external list
//! 5. otherwise a two-way patch scanned → external is applied to the scanned list
//!
//! A silent partial merge of ownership metadata is worse than a full
//! replacement, hence the replace-on-conflict fallback.

use olmpack_core::CrdDescription;
use olmpack_core::csv::CustomResourceDefinitions;
use serde_json::{Map, Value};

use crate::error::{CsvError, Result};

/// Reconcile scanned and externally declared owned CRDs
pub fn merge_owned_crds(
    scanned: Vec<CrdDescription>,
    external: Vec<CrdDescription>,
    override_all: bool,
) -> Vec<CrdDescription> {
    if external.is_empty() {
        return scanned;
    }
    if scanned.is_empty() || override_all {
        return external;
    }

    match patch_owned_crds(&scanned, &external) {
        Ok(Some(merged)) => merged,
        Ok(None) => {
            tracing::debug!("owned CRD lists conflict; using the chart declaration");
            external
        }
        Err(err) => {
            tracing::warn!(error = %err, "cannot merge owned CRDs; using the chart declaration");
            external
        }
    }
}

/// Apply the two-way patch, or `None` when the lists conflict
fn patch_owned_crds(
    scanned: &[CrdDescription],
    external: &[CrdDescription],
) -> Result<Option<Vec<CrdDescription>>> {
    let original = owned_container(scanned)?;
    let modified = owned_container(external)?;

    if has_conflicts(&original, &modified) {
        return Ok(None);
    }

    let patch = create_two_way_merge_patch(&original, &modified)?;
    let merged = apply_merge_patch(&original, &patch);
    let container: CustomResourceDefinitions =
        serde_json::from_value(merged).map_err(|e| CsvError::Merge {
            message: format!("cannot decode the merge result: {}", e),
        })?;

    Ok(Some(container.owned))
}

fn owned_container(owned: &[CrdDescription]) -> Result<Value> {
    let container = CustomResourceDefinitions {
        owned: owned.to_vec(),
        ..Default::default()
    };
    serde_json::to_value(container).map_err(|e| CsvError::Merge {
        message: e.to_string(),
    })
}

/// Structural conflict check
///
/// Maps conflict on any shared key whose values conflict. Lists conflict
/// when their lengths differ, otherwise element by element at the same
/// position. Scalars conflict when unequal; differing shapes always conflict.
pub fn has_conflicts(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => l
            .iter()
            .any(|(key, lv)| r.get(key).is_some_and(|rv| has_conflicts(lv, rv))),
        (Value::Array(l), Value::Array(r)) => {
            l.len() != r.len() || l.iter().zip(r).any(|(lv, rv)| has_conflicts(lv, rv))
        }
        (Value::Object(_), _) | (_, Value::Object(_)) => true,
        (Value::Array(_), _) | (_, Value::Array(_)) => true,
        (l, r) => l != r,
    }
}

/// Build a patch turning `original` into `modified`
///
/// Changed or added keys carry the new value, removed keys carry `null`,
/// nested maps are diffed recursively and lists are replaced as a whole.
/// Both documents must be maps.
pub fn create_two_way_merge_patch(original: &Value, modified: &Value) -> Result<Value> {
    match (original, modified) {
        (Value::Object(o), Value::Object(m)) => Ok(Value::Object(diff_maps(o, m))),
        _ => Err(CsvError::Merge {
            message: "merge patches can only be computed between two maps".to_string(),
        }),
    }
}

fn diff_maps(original: &Map<String, Value>, modified: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();

    for key in original.keys() {
        if !modified.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    for (key, new) in modified {
        match original.get(key) {
            Some(old) if old == new => {}
            Some(Value::Object(old)) if new.is_object() => {
                if let Value::Object(new) = new {
                    let nested = diff_maps(old, new);
                    if !nested.is_empty() {
                        patch.insert(key.clone(), Value::Object(nested));
                    }
                }
            }
            _ => {
                patch.insert(key.clone(), new.clone());
            }
        }
    }

    patch
}

/// Apply a merge patch to `target`
///
/// `null` removes a key, maps merge recursively, anything else replaces.
pub fn apply_merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch) = patch else {
        return patch.clone();
    };

    let mut result = match target {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    for (key, value) in patch {
        if value.is_null() {
            result.remove(key);
        } else {
            let current = result.get(key).cloned().unwrap_or(Value::Null);
            result.insert(key.clone(), apply_merge_patch(&current, value));
        }
    }

    Value::Object(result)
}
