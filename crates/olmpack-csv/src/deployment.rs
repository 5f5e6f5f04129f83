//! Deployment and RBAC scanner
//!
//! Deployments are embedded into the install strategy. Roles, ClusterRoles
//! and their bindings are folded into `permissions` / `clusterPermissions`
//! keyed by service account.
//!
//! Input order is arbitrary, so bindings are only resolved in
//! [`Scanner::finish`], once every Role has been seen. The resulting
//! permissions apply to the install strategy as a whole.

use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::{PolicyRule, RoleRef, Subject};
use olmpack_core::{ClusterServiceVersion, Record, StrategyDeploymentSpec};

use crate::error::{CsvError, Result};
use crate::scanner::{PendingBinding, PermissionScope, PermissionSet, ScanOutcome, ScanState, Scanner};

const SERVICE_ACCOUNT_KIND: &str = "ServiceAccount";

/// Embeds Deployments and aggregates RBAC into the install strategy
#[derive(Debug, Clone)]
pub struct DeploymentScanner {
    strategy_name: String,
    strict_role_refs: bool,
}

impl DeploymentScanner {
    pub fn new(strategy_name: impl Into<String>, strict_role_refs: bool) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            strict_role_refs,
        }
    }

    fn scan_deployment(
        &self,
        record: &Record,
        csv: &mut ClusterServiceVersion,
        state: &mut ScanState,
    ) -> Result<ScanOutcome> {
        let spec: DeploymentSpec = record
            .decode_field("spec")
            .map_err(|e| CsvError::decode(record, e))?;

        let strategy = csv.install_strategy_mut();
        strategy.strategy_name = self.strategy_name.clone();
        strategy.spec.deployment_specs.push(StrategyDeploymentSpec {
            name: record.name.clone(),
            spec,
        });
        state.deployments += 1;

        tracing::debug!(deployment = %record.name, "embedding deployment");
        Ok(ScanOutcome::ABSORBED)
    }

    fn scan_role(&self, record: &Record, state: &mut ScanState) -> Result<ScanOutcome> {
        let rules: Option<Vec<PolicyRule>> = record
            .decode_field("rules")
            .map_err(|e| CsvError::decode(record, e))?;

        state.roles.insert(record.name.clone(), rules.unwrap_or_default());
        Ok(ScanOutcome::CONSUMED)
    }

    fn scan_binding(
        &self,
        record: &Record,
        scope: PermissionScope,
        state: &mut ScanState,
    ) -> Result<ScanOutcome> {
        let role_ref: RoleRef = record
            .decode_field("roleRef")
            .map_err(|e| CsvError::decode(record, e))?;
        let subjects: Option<Vec<Subject>> = record
            .decode_field("subjects")
            .map_err(|e| CsvError::decode(record, e))?;

        let service_accounts = subjects
            .unwrap_or_default()
            .into_iter()
            .filter(|s| s.kind == SERVICE_ACCOUNT_KIND)
            .map(|s| s.name)
            .collect();

        state.bindings.push(PendingBinding {
            scope,
            binding: record.name.clone(),
            role: role_ref.name,
            service_accounts,
        });
        Ok(ScanOutcome::CONSUMED)
    }
}

impl Default for DeploymentScanner {
    fn default() -> Self {
        Self::new(crate::embedder::DEPLOYMENT_STRATEGY, false)
    }
}

impl Scanner for DeploymentScanner {
    fn name(&self) -> &'static str {
        "deployment"
    }

    fn scan(
        &self,
        record: &Record,
        csv: &mut ClusterServiceVersion,
        state: &mut ScanState,
    ) -> Result<ScanOutcome> {
        if record.is_kind("Deployment") {
            self.scan_deployment(record, csv, state)
        } else if record.is_kind("Role") || record.is_kind("ClusterRole") {
            self.scan_role(record, state)
        } else if record.is_kind("RoleBinding") {
            self.scan_binding(record, PermissionScope::Namespaced, state)
        } else if record.is_kind("ClusterRoleBinding") {
            self.scan_binding(record, PermissionScope::Cluster, state)
        } else {
            Ok(ScanOutcome::IGNORED)
        }
    }

    fn finish(&self, csv: &mut ClusterServiceVersion, state: &mut ScanState) -> Result<()> {
        let mut permissions = PermissionSet::default();
        let mut cluster_permissions = PermissionSet::default();

        for binding in &state.bindings {
            let rules: &[PolicyRule] = match state.roles.get(&binding.role) {
                Some(rules) => rules,
                None if self.strict_role_refs => {
                    return Err(CsvError::UnresolvedRoleRef {
                        binding: binding.binding.clone(),
                        role: binding.role.clone(),
                    });
                }
                None => {
                    tracing::warn!(
                        binding = %binding.binding,
                        role = %binding.role,
                        "role binding references a role that is not part of the input; granting no rules"
                    );
                    &[]
                }
            };

            let target = match binding.scope {
                PermissionScope::Namespaced => &mut permissions,
                PermissionScope::Cluster => &mut cluster_permissions,
            };
            for service_account in &binding.service_accounts {
                target.grant(service_account, rules);
            }
        }

        if state.deployments == 0 {
            if !permissions.is_empty() || !cluster_permissions.is_empty() {
                tracing::debug!("no deployment embedded; dropping aggregated permissions");
            }
            return Ok(());
        }

        let strategy = &mut csv.install_strategy_mut().spec;
        strategy.permissions = permissions.into_vec();
        strategy.cluster_permissions = cluster_permissions.into_vec();
        Ok(())
    }
}
