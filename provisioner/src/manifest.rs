/*!

A [`ProductAdapter`] described by a YAML document, so that a product can be provisioned without
writing any code.

```yaml
product: kafka
namespace: kafka-test
replicas: 1
operatorEnv:
  RELATED_IMAGE_KAFKA: quay.io/example/kafka:latest
primary:
  replicasPointer: /spec/kafka/replicas
  readiness:
    condition:
      type: Ready
  manifest:
    apiVersion: kafka.strimzi.io/v1beta2
    kind: Kafka
    metadata:
      name: my-cluster
    spec: {}
auxiliaries:
  - manifest:
      apiVersion: kafka.strimzi.io/v1beta2
      kind: KafkaTopic
      metadata:
        name: my-topic
```

!*/

use crate::adapter::{ManagedResource, ProductAdapter};
use crate::error::{self, Result};
use crate::fail_fast::FailFastPolicy;
use crate::lifecycle::set_pointer;
use kube::core::DynamicObject;
use olmsys_model::{InstallPlanApproval, Readiness, DEFAULT_REPLICAS_POINTER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{ensure, ResultExt};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductManifest {
    pub product: String,
    pub namespace: String,
    /// Written to the primary CR's replicas pointer when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_plan_approval: Option<InstallPlanApproval>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operator_env: BTreeMap<String, String>,
    #[serde(default)]
    pub auxiliary_readiness_required: bool,
    #[serde(default)]
    pub fail_fast: FailFastSettings,
    pub primary: ResourceTemplate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auxiliaries: Vec<ResourceTemplate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas_pointer: Option<String>,
    #[serde(default)]
    pub readiness: Readiness,
    pub manifest: DynamicObject,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailFastSettings {
    /// Only events for objects whose name starts with this prefix are considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ManifestAdapter {
    manifest: ProductManifest,
}

impl ManifestAdapter {
    pub fn new(manifest: ProductManifest) -> Result<Self> {
        ensure!(
            !manifest.product.trim().is_empty(),
            error::ManifestSnafu {
                message: "'product' must not be empty",
            }
        );
        ensure!(
            !manifest.namespace.trim().is_empty(),
            error::ManifestSnafu {
                message: "'namespace' must not be empty",
            }
        );
        if let Some(replicas) = manifest.replicas {
            ensure!(
                replicas >= 0,
                error::ManifestSnafu {
                    message: format!("'replicas' must not be negative, got {}", replicas),
                }
            );
        }
        Ok(Self { manifest })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::new(serde_yaml::from_str(yaml).context(error::ManifestParseSnafu)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).context(error::ManifestReadSnafu { path })?;
        Self::from_yaml(&yaml)
    }

    pub fn manifest(&self) -> &ProductManifest {
        &self.manifest
    }

    fn managed(&self, template: &ResourceTemplate, replicas: Option<i32>) -> Result<ManagedResource> {
        let mut manifest = template.manifest.clone();
        if let Some(replicas) = replicas {
            let pointer = template
                .replicas_pointer
                .as_deref()
                .unwrap_or(DEFAULT_REPLICAS_POINTER);
            ensure!(
                set_pointer(&mut manifest.data, pointer, Value::from(replicas)),
                error::ManifestSnafu {
                    message: format!("cannot set replicas at '{}'", pointer),
                }
            );
        }
        ManagedResource::from_manifest(
            manifest,
            &self.manifest.namespace,
            template.replicas_pointer.as_deref(),
            template.readiness.clone(),
        )
    }
}

impl ProductAdapter for ManifestAdapter {
    fn product_id(&self) -> &str {
        &self.manifest.product
    }

    fn namespace(&self) -> &str {
        &self.manifest.namespace
    }

    fn primary(&self) -> Result<ManagedResource> {
        self.managed(&self.manifest.primary, self.manifest.replicas)
    }

    fn auxiliaries(&self) -> Result<Vec<ManagedResource>> {
        self.manifest
            .auxiliaries
            .iter()
            .map(|template| self.managed(template, None))
            .collect()
    }

    fn auxiliary_readiness_required(&self) -> bool {
        self.manifest.auxiliary_readiness_required
    }

    fn operator_env(&self) -> BTreeMap<String, String> {
        self.manifest.operator_env.clone()
    }

    fn install_plan_approval(&self) -> Option<InstallPlanApproval> {
        self.manifest.install_plan_approval
    }

    fn fail_fast_policy(&self) -> FailFastPolicy {
        let settings = &self.manifest.fail_fast;
        let mut policy = FailFastPolicy::default();
        if let Some(prefix) = &settings.app_prefix {
            policy = policy.for_app(prefix.as_str());
        }
        for reason in &settings.extra_reasons {
            policy = policy.with_reason(reason.as_str());
        }
        for reason in &settings.ignored_reasons {
            policy = policy.without_reason(reason);
        }
        policy
    }
}
