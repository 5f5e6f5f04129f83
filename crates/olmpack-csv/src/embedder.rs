//! Embedding orchestrator
//!
//! Runs every registered scanner over every record and splits the input into
//! records absorbed by the ClusterServiceVersion and residual manifests that
//! ship next to it in the bundle.

use olmpack_core::{ClusterServiceVersion, Record};

use crate::crd::CrdScanner;
use crate::deployment::DeploymentScanner;
use crate::error::Result;
use crate::scanner::{ScanState, Scanner};

/// Install strategy name OLM uses for Deployment-based operators
pub const DEPLOYMENT_STRATEGY: &str = "deployment";

/// Options for the embedder
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Value written to `spec.install.strategy`
    pub strategy_name: String,
    /// Fail when a binding references a role missing from the input
    pub strict_role_refs: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            strategy_name: DEPLOYMENT_STRATEGY.to_string(),
            strict_role_refs: false,
        }
    }
}

/// Drives the scanners, in registration order
pub struct Embedder {
    scanners: Vec<Box<dyn Scanner>>,
}

impl Embedder {
    /// Embedder with the built-in scanners: CRDs, then Deployments/RBAC
    pub fn new(options: EmbedOptions) -> Self {
        Self::with_scanners(vec![
            Box::new(CrdScanner),
            Box::new(DeploymentScanner::new(
                options.strategy_name,
                options.strict_role_refs,
            )),
        ])
    }

    pub fn with_scanners(scanners: Vec<Box<dyn Scanner>>) -> Self {
        Self { scanners }
    }

    /// Names of the registered scanners, in order
    pub fn scanner_names(&self) -> Vec<&'static str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    /// Embed `records` into `csv` and return the residual records
    ///
    /// Every scanner sees every record; a record is residual only when no
    /// scanner excluded it. On error `csv` is left untouched.
    pub fn embed(
        &self,
        records: Vec<Record>,
        csv: &mut ClusterServiceVersion,
    ) -> Result<Vec<Record>> {
        let mut working = csv.clone();
        let mut state = ScanState::new();
        let mut residual = Vec::new();

        for record in records {
            let mut excluded = false;
            for scanner in &self.scanners {
                let outcome = scanner.scan(&record, &mut working, &mut state)?;
                if outcome.handled {
                    tracing::debug!(
                        scanner = scanner.name(),
                        record = %record.display_name(),
                        "record embedded"
                    );
                }
                excluded |= outcome.exclude_from_residual;
            }
            if !excluded {
                residual.push(record);
            }
        }

        for scanner in &self.scanners {
            scanner.finish(&mut working, &mut state)?;
        }

        tracing::debug!(
            roles = state.roles.len(),
            bindings = state.bindings.len(),
            deployments = state.deployments,
            residual = residual.len(),
            "embedding finished"
        );

        *csv = working;
        Ok(residual)
    }
}

impl Default for Embedder {
    fn default() -> Self {
        Self::new(EmbedOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsvError;
    use crate::scanner::ScanOutcome;
    use k8s_openapi::api::rbac::v1::PolicyRule;
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn crd() -> Record {
        record(json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "CustomResourceDefinition",
            "metadata": {"name": "widgets.example.com"},
            "spec": {
                "group": "example.com",
                "scope": "Namespaced",
                "names": {"kind": "Widget", "plural": "widgets"},
                "versions": [{"name": "v1", "served": true, "storage": true}]
            }
        }))
    }

    fn deployment() -> Record {
        record(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "app1"},
            "spec": {
                "selector": {"matchLabels": {"app": "app1"}},
                "template": {
                    "metadata": {"labels": {"app": "app1"}},
                    "spec": {"containers": [{"name": "app", "image": "example/app:1"}]}
                }
            }
        }))
    }

    fn role() -> Record {
        record(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "Role",
            "metadata": {"name": "role1"},
            "rules": [{"apiGroups": [""], "resources": ["pods"], "verbs": ["get"]}]
        }))
    }

    fn role_binding() -> Record {
        record(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "RoleBinding",
            "metadata": {"name": "binding1"},
            "roleRef": {"apiGroup": "rbac.authorization.k8s.io", "kind": "Role", "name": "role1"},
            "subjects": [{"kind": "ServiceAccount", "name": "sa1"}]
        }))
    }

    fn config_map() -> Record {
        record(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "settings"},
            "data": {"key": "value"}
        }))
    }

    #[test]
    fn test_end_to_end_embedding() {
        let records = vec![crd(), deployment(), role(), role_binding(), config_map()];
        let mut csv = ClusterServiceVersion::new();

        let residual = Embedder::default().embed(records, &mut csv).unwrap();

        assert_eq!(residual, vec![config_map()]);

        let owned = csv.owned_crds();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].kind, "Widget");
        assert_eq!(owned[0].version, "v1");

        let strategy = csv.install_strategy();
        assert_eq!(strategy.strategy_name, DEPLOYMENT_STRATEGY);
        assert_eq!(strategy.spec.deployment_specs.len(), 1);
        assert_eq!(strategy.spec.deployment_specs[0].name, "app1");
        assert_eq!(strategy.spec.permissions.len(), 1);
        assert_eq!(strategy.spec.permissions[0].service_account_name, "sa1");
        assert_eq!(
            strategy.spec.permissions[0].rules,
            vec![PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["pods".to_string()]),
                verbs: vec!["get".to_string()],
                ..Default::default()
            }]
        );
    }

    #[test]
    fn test_residual_preserves_input_order_exactly_once() {
        let service = record(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web"}
        }));
        let records = vec![config_map(), crd(), service.clone(), role()];
        let mut csv = ClusterServiceVersion::new();

        let residual = Embedder::default().embed(records, &mut csv).unwrap();

        assert_eq!(residual, vec![config_map(), service]);
    }

    #[test]
    fn test_registration_order() {
        assert_eq!(Embedder::default().scanner_names(), vec!["crd", "deployment"]);
    }

    /// Scanner that records the name of every record it sees
    struct Spy {
        seen: Rc<RefCell<Vec<String>>>,
        outcome: ScanOutcome,
    }

    impl Scanner for Spy {
        fn name(&self) -> &'static str {
            "spy"
        }

        fn scan(
            &self,
            record: &Record,
            _csv: &mut ClusterServiceVersion,
            _state: &mut ScanState,
        ) -> Result<ScanOutcome> {
            self.seen.borrow_mut().push(record.name.clone());
            Ok(self.outcome)
        }
    }

    #[test]
    fn test_every_scanner_sees_every_record() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        // The first scanner excludes everything; the second must still run.
        let embedder = Embedder::with_scanners(vec![
            Box::new(Spy {
                seen: first.clone(),
                outcome: ScanOutcome::ABSORBED,
            }),
            Box::new(Spy {
                seen: second.clone(),
                outcome: ScanOutcome::IGNORED,
            }),
        ]);
        let mut csv = ClusterServiceVersion::new();

        let residual = embedder.embed(vec![config_map(), role()], &mut csv).unwrap();

        assert!(residual.is_empty());
        assert_eq!(*first.borrow(), vec!["settings", "role1"]);
        assert_eq!(*second.borrow(), vec!["settings", "role1"]);
    }

    #[test]
    fn test_decode_error_aborts_without_partial_output() {
        let broken = record(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "broken"},
            "spec": {"replicas": "three"}
        }));
        let mut csv = ClusterServiceVersion::new();

        let err = Embedder::default()
            .embed(vec![crd(), broken], &mut csv)
            .unwrap_err();

        assert!(matches!(err, CsvError::Decode { ref name, .. } if name == "broken"));
        assert!(csv.owned_crds().is_empty());
    }

    #[test]
    fn test_strict_role_refs_option() {
        let options = EmbedOptions {
            strict_role_refs: true,
            ..Default::default()
        };
        let mut csv = ClusterServiceVersion::new();

        let err = Embedder::new(options)
            .embed(vec![deployment(), role_binding()], &mut csv)
            .unwrap_err();

        assert!(matches!(err, CsvError::UnresolvedRoleRef { .. }));
    }
}
