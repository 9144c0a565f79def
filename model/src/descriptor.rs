use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// Whether OLM installs new operator versions on its own or waits for someone to approve the
/// `InstallPlan`.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum InstallPlanApproval {
    #[default]
    Automatic,
    Manual,
}

derive_display_from_serialize!(InstallPlanApproval);
derive_fromstr_from_deserialize!(InstallPlanApproval);

/// Which flavor of an operator package is being installed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    #[default]
    Community,
    Productized,
}

derive_display_from_serialize!(Distribution);
derive_fromstr_from_deserialize!(Distribution);

/// Everything needed to subscribe to an operator package through OLM. Resolved once per
/// provisioner from configuration and never modified afterwards.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDescriptor {
    /// The package name as published in the catalog (`PackageManifest` name).
    pub package_manifest_id: String,
    pub catalog_source_name: String,
    pub catalog_source_namespace: String,
    /// Index image backing the catalog source. `None` means use whatever the catalog source
    /// already points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_image: Option<String>,
    /// Subscription channel. `None` lets OLM pick the package's default channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_csv: Option<String>,
    pub install_plan_approval: InstallPlanApproval,
    pub distribution: Distribution,
}

/// The lifecycle of an operator subscription as seen by the provisioner.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SubscriptionState {
    #[default]
    Absent,
    Subscribing,
    Subscribed,
    Unsubscribing,
}

derive_display_from_serialize!(SubscriptionState);
