use crate::error::{self, Result};
use crate::fail_fast::FailFastPolicy;
use kube::core::DynamicObject;
use olmsys_model::{CustomResourceHandle, InstallPlanApproval, Readiness};
use snafu::ResultExt;
use std::collections::BTreeMap;

/// A product CR together with the manifest it is created from.
#[derive(Debug, Clone)]
pub struct ManagedResource {
    pub handle: CustomResourceHandle,
    pub manifest: DynamicObject,
}

impl ManagedResource {
    pub fn from_manifest(
        manifest: DynamicObject,
        default_namespace: &str,
        replicas_pointer: Option<&str>,
        readiness: Readiness,
    ) -> Result<Self> {
        let handle = CustomResourceHandle::for_manifest(
            &manifest,
            default_namespace,
            replicas_pointer,
            readiness,
        )
        .context(error::ManifestModelSnafu)?;
        Ok(Self { handle, manifest })
    }
}

/// Everything the generic lifecycle needs to know about one product: which CRs make up a
/// deployment, how to tell that they are ready, and how the operator should be subscribed.
pub trait ProductAdapter: Send + Sync {
    /// The product id used for configuration lookups, e.g. `kafka`.
    fn product_id(&self) -> &str;

    /// The namespace the operator and the product CRs live in.
    fn namespace(&self) -> &str;

    /// The primary workload CR.
    fn primary(&self) -> Result<ManagedResource>;

    /// CRs that belong to the primary, in creation order. They are deleted in reverse order,
    /// before the primary.
    fn auxiliaries(&self) -> Result<Vec<ManagedResource>> {
        Ok(Vec::new())
    }

    /// Whether an auxiliary CR that does not become ready fails the deployment. Many auxiliary
    /// CRs have no observable ready state, so by default this only logs a warning.
    fn auxiliary_readiness_required(&self) -> bool {
        false
    }

    /// Environment variables to set on the operator's deployment.
    fn operator_env(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Overrides the configured install plan approval.
    fn install_plan_approval(&self) -> Option<InstallPlanApproval> {
        None
    }

    fn fail_fast_policy(&self) -> FailFastPolicy {
        FailFastPolicy::default()
    }
}
