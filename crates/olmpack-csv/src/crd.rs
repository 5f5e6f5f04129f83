//! CustomResourceDefinition scanner

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinitionSpec;
use olmpack_core::{ClusterServiceVersion, CrdDescription, Record};

use crate::error::{CsvError, Result};
use crate::scanner::{ScanOutcome, ScanState, Scanner};

const CRD_KIND: &str = "CustomResourceDefinition";

/// Records every CRD as an owned custom resource of the operator
#[derive(Debug, Default)]
pub struct CrdScanner;

impl Scanner for CrdScanner {
    fn name(&self) -> &'static str {
        "crd"
    }

    fn scan(
        &self,
        record: &Record,
        csv: &mut ClusterServiceVersion,
        _state: &mut ScanState,
    ) -> Result<ScanOutcome> {
        if !record.is_kind(CRD_KIND) {
            return Ok(ScanOutcome::IGNORED);
        }

        let spec: CustomResourceDefinitionSpec = record
            .decode_field("spec")
            .map_err(|e| CsvError::decode(record, e))?;

        // First served version in declaration order
        let served = spec
            .versions
            .iter()
            .find(|v| v.served)
            .ok_or_else(|| CsvError::decode(record, "no served version"))?;

        let owned = CrdDescription {
            name: record.name.clone(),
            version: served.name.clone(),
            kind: spec.names.kind.clone(),
            display_name: spec.names.kind.clone(),
            description: String::new(),
        };

        tracing::debug!(crd = %owned.name, version = %owned.version, "embedding owned CRD");
        csv.owned_crds_mut().push(owned);

        Ok(ScanOutcome::ABSORBED)
    }
}
