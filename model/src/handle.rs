use crate::error::{self, Result};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::ApiResource;
use kube::ResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};

/// Default location of the replica count in a product CR.
pub const DEFAULT_REPLICAS_POINTER: &str = "/spec/replicas";

/// How to tell that a product CR has reached its ready state. Readiness is always evaluated
/// against the live cluster and knows nothing about specific products.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Readiness {
    /// The CR exists. Used for CRs that have no observable ready state.
    Exists,
    /// Exactly the desired number of pods matching `selector` are `Running` and none are
    /// terminating.
    PodsRunning { selector: String },
    /// `status.conditions` holds an entry with this `type` and `status`.
    #[serde(rename_all = "camelCase")]
    Condition {
        #[serde(rename = "type")]
        condition_type: String,
        #[serde(default = "condition_true")]
        status: String,
    },
    /// The value at the JSON `pointer` equals `value`.
    StatusField { pointer: String, value: Value },
    /// Every inner readiness check passes.
    All(Vec<Readiness>),
}

fn condition_true() -> String {
    String::from("True")
}

impl Default for Readiness {
    fn default() -> Self {
        Self::Exists
    }
}

impl Readiness {
    /// The pod label selector this readiness depends on, if any.
    pub fn pod_selector(&self) -> Option<&str> {
        match self {
            Readiness::PodsRunning { selector } => Some(selector),
            Readiness::All(inner) => inner.iter().find_map(Readiness::pod_selector),
            _ => None,
        }
    }

    /// Evaluate every part of the readiness that can be decided from the object alone. Pod
    /// based checks are treated as satisfied here and must be evaluated separately.
    pub fn object_satisfies(&self, object: &DynamicObject) -> bool {
        match self {
            Readiness::Exists | Readiness::PodsRunning { .. } => true,
            Readiness::Condition {
                condition_type,
                status,
            } => object
                .data
                .pointer("/status/conditions")
                .and_then(Value::as_array)
                .map(|conditions| {
                    conditions.iter().any(|condition| {
                        condition.get("type").and_then(Value::as_str)
                            == Some(condition_type.as_str())
                            && condition.get("status").and_then(Value::as_str)
                                == Some(status.as_str())
                    })
                })
                .unwrap_or(false),
            Readiness::StatusField { pointer, value } => {
                object.data.pointer(pointer) == Some(value)
            }
            Readiness::All(inner) => inner.iter().all(|r| r.object_satisfies(object)),
        }
    }
}

/// One product CR instance managed by the provisioner.
///
/// A handle is created when the CR is about to be deployed. The lifecycle marks it as created
/// once the API server acknowledged the create call, and refuses to wait on handles that were
/// never created.
#[derive(Clone, Debug)]
pub struct CustomResourceHandle {
    pub resource: ApiResource,
    pub name: String,
    pub namespace: String,
    pub desired_replicas: Option<i32>,
    /// JSON pointer to the replica count within the CR.
    pub replicas_pointer: String,
    pub readiness: Readiness,
    created: bool,
}

impl CustomResourceHandle {
    pub fn new<S1, S2>(resource: ApiResource, namespace: S1, name: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            resource,
            name: name.into(),
            namespace: namespace.into(),
            desired_replicas: None,
            replicas_pointer: DEFAULT_REPLICAS_POINTER.to_string(),
            readiness: Readiness::default(),
            created: false,
        }
    }

    /// Build a handle describing `manifest`. The manifest's namespace wins over
    /// `default_namespace`. The desired replica count is read from `replicas_pointer` when
    /// present.
    pub fn for_manifest(
        manifest: &DynamicObject,
        default_namespace: &str,
        replicas_pointer: Option<&str>,
        readiness: Readiness,
    ) -> Result<Self> {
        let resource = api_resource_for(manifest)?;
        let name = manifest
            .metadata
            .name
            .clone()
            .context(error::ManifestFieldSnafu {
                field: "metadata.name",
            })?;
        let namespace = manifest
            .namespace()
            .unwrap_or_else(|| default_namespace.to_string());
        let replicas_pointer = replicas_pointer.unwrap_or(DEFAULT_REPLICAS_POINTER);
        let desired_replicas = manifest
            .data
            .pointer(replicas_pointer)
            .and_then(Value::as_i64)
            .and_then(|replicas| i32::try_from(replicas).ok());
        Ok(Self {
            resource,
            name,
            namespace,
            desired_replicas,
            replicas_pointer: replicas_pointer.to_string(),
            readiness,
            created: false,
        })
    }

    pub fn kind(&self) -> &str {
        &self.resource.kind
    }

    /// Whether the API server has acknowledged the creation of this CR.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Record that the CR exists in the cluster.
    pub fn mark_created(&mut self) {
        self.created = true;
    }

    /// Record that a delete request for the CR was issued.
    pub fn mark_deleted(&mut self) {
        self.created = false;
    }

    /// The number of pods expected when the CR is ready. CRs without a replica count are
    /// expected to run a single pod.
    pub fn expected_pods(&self) -> usize {
        self.desired_replicas
            .map(|replicas| usize::try_from(replicas).unwrap_or(0))
            .unwrap_or(1)
    }
}

/// Determine the `ApiResource` of a manifest from its `apiVersion` and `kind`.
pub fn api_resource_for(manifest: &DynamicObject) -> Result<ApiResource> {
    let types = manifest
        .types
        .as_ref()
        .context(error::ManifestFieldSnafu {
            field: "apiVersion/kind",
        })?;
    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", types.api_version.as_str()),
    };
    Ok(ApiResource::from_gvk(&GroupVersionKind::gvk(
        group,
        version,
        &types.kind,
    )))
}

/// Parse a YAML or JSON document into a `DynamicObject`.
pub fn manifest_from_yaml(yaml: &str) -> Result<DynamicObject> {
    Ok(serde_yaml::from_str(yaml).context(error::ManifestParseSnafu)?)
}
