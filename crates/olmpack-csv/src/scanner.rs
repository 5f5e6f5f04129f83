//! Scanner contract and per-run scan state
//!
//! A [`Scanner`] inspects one [`Record`] at a time and may write into the
//! [`ClusterServiceVersion`] being built. Cross-record bookkeeping (roles,
//! pending bindings) lives in [`ScanState`], which the embedder creates for
//! each run and drops when the run ends.

use k8s_openapi::api::rbac::v1::PolicyRule;
use olmpack_core::{ClusterServiceVersion, Record, StrategyDeploymentPermissions};
use std::collections::HashMap;

use crate::error::Result;

/// What a scanner did with a record
///
/// `handled` and `exclude_from_residual` are independent: a Role is only
/// bookkeeping for later bindings (not handled) yet must still stay out of
/// the residual manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// The record's content went into the descriptor
    pub handled: bool,
    /// The record must not be written as a standalone manifest
    pub exclude_from_residual: bool,
}

impl ScanOutcome {
    /// The scanner does not care about this record
    pub const IGNORED: Self = Self {
        handled: false,
        exclude_from_residual: false,
    };

    /// The record was embedded into the descriptor
    pub const ABSORBED: Self = Self {
        handled: true,
        exclude_from_residual: true,
    };

    /// The record feeds scanner state only
    pub const CONSUMED: Self = Self {
        handled: false,
        exclude_from_residual: true,
    };
}

/// A unit that classifies records and fills the descriptor
pub trait Scanner {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Inspect one record
    ///
    /// Must not modify the record. Any error aborts the whole run.
    fn scan(
        &self,
        record: &Record,
        csv: &mut ClusterServiceVersion,
        state: &mut ScanState,
    ) -> Result<ScanOutcome>;

    /// Called once after every record was scanned
    fn finish(&self, _csv: &mut ClusterServiceVersion, _state: &mut ScanState) -> Result<()> {
        Ok(())
    }
}

/// Permission scope of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionScope {
    /// RoleBinding → `permissions`
    Namespaced,
    /// ClusterRoleBinding → `clusterPermissions`
    Cluster,
}

/// Role name → rules
///
/// Role and ClusterRole share one table; namespaces are not tracked.
#[derive(Debug, Clone, Default)]
pub struct RoleRuleTable {
    rules: HashMap<String, Vec<PolicyRule>>,
}

impl RoleRuleTable {
    pub fn insert(&mut self, role: impl Into<String>, rules: Vec<PolicyRule>) {
        self.rules.insert(role.into(), rules);
    }

    pub fn get(&self, role: &str) -> Option<&[PolicyRule]> {
        self.rules.get(role).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A binding waiting for the role table to be complete
#[derive(Debug, Clone)]
pub struct PendingBinding {
    pub scope: PermissionScope,
    /// Binding name, for diagnostics
    pub binding: String,
    /// `roleRef.name`
    pub role: String,
    /// ServiceAccount subjects, in declaration order
    pub service_accounts: Vec<String>,
}

/// Ordered permissions, one entry per service account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionSet {
    entries: Vec<StrategyDeploymentPermissions>,
}

impl PermissionSet {
    /// Append `rules` to the entry of `service_account`, creating it if needed
    pub fn grant(&mut self, service_account: &str, rules: &[PolicyRule]) {
        match self
            .entries
            .iter_mut()
            .find(|p| p.service_account_name == service_account)
        {
            Some(entry) => entry.rules.extend_from_slice(rules),
            None => self.entries.push(StrategyDeploymentPermissions {
                service_account_name: service_account.to_string(),
                rules: rules.to_vec(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<StrategyDeploymentPermissions> {
        self.entries
    }
}

/// Accumulator owned by the embedder for the duration of one run
#[derive(Debug, Default)]
pub struct ScanState {
    pub roles: RoleRuleTable,
    pub bindings: Vec<PendingBinding>,
    /// Number of Deployments embedded so far
    pub deployments: usize,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }
}
