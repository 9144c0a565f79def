/*!

Client-side models of the Operator Lifecycle Manager custom resources. Only the fields that the
provisioner reads are modeled, so these types must never be written back to the cluster. Edits
go through `DynamicObject` with the helpers at the bottom of this module, which keeps every field
OLM set intact.

!*/

use crate::constants::{CSV_PHASE_FAILED, CSV_PHASE_SUCCEEDED};
use crate::InstallPlanApproval;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A request to install an operator package from a catalog source and keep it up to date.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "operators.coreos.com",
    kind = "Subscription",
    namespaced,
    plural = "subscriptions",
    singular = "subscription",
    status = "SubscriptionStatus",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// The package name.
    pub name: String,
    pub source: String,
    pub source_namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_plan_approval: Option<InstallPlanApproval>,
    #[serde(rename = "startingCSV", skip_serializing_if = "Option::is_none")]
    pub starting_csv: Option<String>,
    /// Overrides that OLM applies to the operator's deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<SubscriptionConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// A plain name/value environment variable.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    pub fn list_from(env: &BTreeMap<String, String>) -> Vec<EnvVar> {
        env.iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(rename = "currentCSV", skip_serializing_if = "Option::is_none")]
    pub current_csv: Option<String>,
    #[serde(rename = "installedCSV", skip_serializing_if = "Option::is_none")]
    pub installed_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_plan_ref: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Subscription {
    /// The CSV OLM is currently working towards. With manual approval this can be a pending
    /// upgrade that has not been installed.
    pub fn current_csv(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.current_csv.as_deref())
    }

    /// The CSV OLM last installed for this subscription.
    pub fn installed_csv(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.installed_csv.as_deref())
    }

    /// Every CSV the subscription refers to, installed first, without duplicates.
    pub fn csv_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.installed_csv().into_iter().chain(self.current_csv()) {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    pub fn install_plan_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.install_plan_ref.as_ref())
            .map(|plan| plan.name.as_str())
    }
}

/// The set of resources OLM will create to install or upgrade an operator.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "operators.coreos.com",
    kind = "InstallPlan",
    namespaced,
    plural = "installplans",
    singular = "installplan",
    status = "InstallPlanStatus",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct InstallPlanSpec {
    #[serde(default)]
    pub approval: InstallPlanApproval,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub cluster_service_version_names: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPlanStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// An installed (or installing) operator version along with the deployments that run it.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "operators.coreos.com",
    kind = "ClusterServiceVersion",
    namespaced,
    plural = "clusterserviceversions",
    singular = "clusterserviceversion",
    shortname = "csv",
    status = "ClusterServiceVersionStatus",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceVersionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The install strategy. Kept opaque apart from the deployment specs listed by
    /// [`ClusterServiceVersion::deployment_names`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceVersionStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClusterServiceVersion {
    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    pub fn is_succeeded(&self) -> bool {
        self.phase() == Some(CSV_PHASE_SUCCEEDED)
    }

    pub fn is_failed(&self) -> bool {
        self.phase() == Some(CSV_PHASE_FAILED)
    }

    /// The `spec.install.spec.deployments` array.
    fn deployments(&self) -> Option<&Vec<Value>> {
        self.spec
            .install
            .as_ref()
            .and_then(|install| install.pointer("/spec/deployments"))
            .and_then(Value::as_array)
    }

    /// The names of the operator deployments OLM creates for this CSV.
    pub fn deployment_names(&self) -> Vec<String> {
        self.deployments()
            .into_iter()
            .flatten()
            .filter_map(|deployment| deployment.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Whether the install strategy itself carries `name=value` on every container.
    pub fn has_env(&self, name: &str, value: &str) -> bool {
        deployments_have_env(self.deployments().into_iter().flatten(), name, value)
    }
}

/// Location of the deployment list inside a CSV object.
pub const CSV_DEPLOYMENTS_POINTER: &str = "/spec/install/spec/deployments";

/// The containers of a `Deployment` object or of a CSV deployment entry. Both keep them at
/// `/spec/template/spec/containers`.
fn containers_of(deployment: &Value) -> impl Iterator<Item = &Value> {
    deployment
        .pointer("/spec/template/spec/containers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Returns `true` when every container of every deployment carries `name=value`. No containers
/// means no variable.
pub fn deployments_have_env<'a, I>(deployments: I, name: &str, value: &str) -> bool
where
    I: IntoIterator<Item = &'a Value>,
{
    let containers: Vec<&Value> = deployments.into_iter().flat_map(containers_of).collect();
    !containers.is_empty()
        && containers.iter().all(|container| {
            container
                .get("env")
                .and_then(Value::as_array)
                .map(|env| {
                    env.iter().any(|var| {
                        var.get("name").and_then(Value::as_str) == Some(name)
                            && var.get("value").and_then(Value::as_str) == Some(value)
                    })
                })
                .unwrap_or(false)
        })
}

/// Set `name=value` on every container of every deployment, replacing a variable of the same
/// name. Everything else in the deployments is left alone. Returns `false` if there was no
/// container to modify.
pub fn set_deployments_env<'a, I>(deployments: I, name: &str, value: &str) -> bool
where
    I: IntoIterator<Item = &'a mut Value>,
{
    let mut modified = false;
    for deployment in deployments {
        let containers = match deployment
            .pointer_mut("/spec/template/spec/containers")
            .and_then(Value::as_array_mut)
        {
            None => continue,
            Some(containers) => containers,
        };
        for container in containers.iter_mut().filter_map(Value::as_object_mut) {
            let env = container
                .entry("env")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Some(env) = env.as_array_mut() {
                env.retain(|var| var.get("name").and_then(Value::as_str) != Some(name));
                env.push(serde_json::json!({ "name": name, "value": value }));
                modified = true;
            }
        }
    }
    modified
}

/// A registry of operator packages. The provisioner only checks that it exists.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "operators.coreos.com",
    kind = "CatalogSource",
    namespaced,
    plural = "catalogsources",
    singular = "catalogsource",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
