use crate::clients::error::{self, Result};
use crate::clients::{AllowNotFound, PlatformClient};
use crate::ClusterEvent;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::{Api, Client, Config};
use log::trace;
use serde_json::Value;
use snafu::ResultExt;
use std::path::Path;

/// A [`PlatformClient`] backed by a `kube::Client`.
///
/// # Example
///
/// ```
///# use olmsys_model::clients::KubePlatform;
///# async fn no_run() {
/// let platform = KubePlatform::new().await.unwrap();
///# }
/// ```
#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
}

impl KubePlatform {
    /// Create a `KubePlatform` using the default `kube::Client`.
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context(error::InitializationSnafu)?;
        Ok(Self::new_from_k8s_client(client))
    }

    /// Create a `KubePlatform` from the path to a kubeconfig file.
    pub async fn new_from_kubeconfig_path(kubeconfig_path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(kubeconfig_path).context(error::KubeconfigSnafu)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(error::KubeconfigSnafu)?;
        let client = Client::try_from(config).context(error::InitializationSnafu)?;
        Ok(Self::new_from_k8s_client(client))
    }

    pub fn new_from_k8s_client(client: Client) -> Self {
        Self { client }
    }

    pub fn k8s_client(&self) -> &Client {
        &self.client
    }

    fn api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}

fn object_name(object: &DynamicObject) -> &str {
    object.metadata.name.as_deref().unwrap_or("")
}

#[async_trait::async_trait]
impl PlatformClient for KubePlatform {
    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        trace!(
            "creating {} '{}' in '{}'",
            resource.kind,
            object_name(object),
            namespace
        );
        Ok(self
            .api(resource, namespace)
            .create(&PostParams::default(), object)
            .await
            .context(error::KubeApiCallSnafu {
                method: "create",
                what: resource.kind.clone(),
            })?)
    }

    async fn replace(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object_name(object);
        trace!("replacing {} '{}' in '{}'", resource.kind, name, namespace);
        Ok(self
            .api(resource, namespace)
            .replace(name, &PostParams::default(), object)
            .await
            .context(error::KubeApiCallSnafu {
                method: "replace",
                what: resource.kind.clone(),
            })?)
    }

    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self
            .api(resource, namespace)
            .get(name)
            .await
            .allow_not_found(|_| ())
            .context(error::KubeApiCallSnafu {
                method: "get",
                what: resource.kind.clone(),
            })?)
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let mut list_params = ListParams::default();
        if let Some(selector) = label_selector {
            list_params = list_params.labels(selector);
        }
        Ok(self
            .api(resource, namespace)
            .list(&list_params)
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: format!("{}s", resource.kind),
            })?
            .items)
    }

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool> {
        trace!("deleting {} '{}' in '{}'", resource.kind, name, namespace);
        Ok(self
            .api(resource, namespace)
            .delete(name, &DeleteParams::background())
            .await
            .allow_not_found(|_| ())
            .context(error::KubeApiCallSnafu {
                method: "delete",
                what: resource.kind.clone(),
            })?
            .is_some())
    }

    async fn patch_merge(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<DynamicObject> {
        trace!("patching {} '{}' in '{}'", resource.kind, name, namespace);
        Ok(self
            .api(resource, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .context(error::KubeApiCallSnafu {
                method: "patch",
                what: resource.kind.clone(),
            })?)
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        Ok(Api::<Pod>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default().labels(label_selector))
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: "pods",
            })?
            .items)
    }

    async fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>> {
        Ok(Api::<Event>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: "events",
            })?
            .items
            .iter()
            .filter_map(ClusterEvent::from_event)
            .collect())
    }
}
