/*!

Create, replace, scale and delete product custom resources, and observe them reaching or leaving
their ready state. Nothing here knows about specific products: what "ready" means comes from the
handle's [`Readiness`](olmsys_model::Readiness).

!*/

use crate::error::{self, Result};
use crate::wait::{wait_for, Outcome, WaitSpec};
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use log::{debug, info};
use olmsys_model::clients::{self, HttpStatusCode, PlatformClient};
use olmsys_model::constants::POD_PHASE_RUNNING;
use olmsys_model::CustomResourceHandle;
use serde_json::{Map, Value};
use snafu::{ensure, OptionExt, ResultExt};

pub struct CustomResourceLifecycle<'a, P>
where
    P: PlatformClient,
{
    platform: &'a P,
}

impl<'a, P> CustomResourceLifecycle<'a, P>
where
    P: PlatformClient,
{
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    /// Create the CR described by `handle` from `manifest`. An existing CR of the same name is a
    /// `ResourceConflict`; use [`Self::replace`] to overwrite it.
    pub async fn create(
        &self,
        handle: &mut CustomResourceHandle,
        manifest: &DynamicObject,
    ) -> Result<()> {
        let object = object_for(handle, manifest);
        if let Err(e) = self
            .platform
            .create(&handle.resource, &handle.namespace, &object)
            .await
        {
            return Err(self.mutation_error(e, "create", handle));
        }
        handle.mark_created();
        info!(
            "Created {} '{}' in '{}'",
            handle.kind(),
            handle.name,
            handle.namespace
        );
        Ok(())
    }

    /// Create the CR, or replace it in place if it already exists.
    pub async fn replace(
        &self,
        handle: &mut CustomResourceHandle,
        manifest: &DynamicObject,
    ) -> Result<()> {
        let existing = self.get(handle).await?;
        let existing = match existing {
            Some(existing) => existing,
            None => return self.create(handle, manifest).await,
        };
        let mut object = object_for(handle, manifest);
        object.metadata.resource_version = existing.metadata.resource_version;
        if let Err(e) = self
            .platform
            .replace(&handle.resource, &handle.namespace, &object)
            .await
        {
            return Err(self.mutation_error(e, "replace", handle));
        }
        handle.mark_created();
        info!(
            "Replaced {} '{}' in '{}'",
            handle.kind(),
            handle.name,
            handle.namespace
        );
        Ok(())
    }

    /// Request deletion of the CR. Returns `false` if it was already gone.
    pub async fn delete(&self, handle: &mut CustomResourceHandle) -> Result<bool> {
        let deleted = self
            .platform
            .delete(&handle.resource, &handle.namespace, &handle.name)
            .await
            .context(error::ClientSnafu {
                action: format!("delete {} '{}'", handle.kind(), handle.name),
            })?;
        handle.mark_deleted();
        if deleted {
            info!(
                "Deleted {} '{}' in '{}'",
                handle.kind(),
                handle.name,
                handle.namespace
            );
        } else {
            debug!("{} '{}' was already gone", handle.kind(), handle.name);
        }
        Ok(deleted)
    }

    /// Whether the CR exists in the cluster right now.
    pub async fn exists(&self, handle: &CustomResourceHandle) -> Result<bool> {
        Ok(self.get(handle).await?.is_some())
    }

    /// Evaluate the handle's readiness against the live cluster.
    ///
    /// Pod based readiness requires exactly the desired number of matching pods, all `Running`
    /// and none terminating. This makes the same check usable after a scale down.
    pub async fn is_ready(&self, handle: &CustomResourceHandle) -> Result<bool> {
        let object = match self.get(handle).await? {
            Some(object) => object,
            None => return Ok(false),
        };
        if !handle.readiness.object_satisfies(&object) {
            return Ok(false);
        }
        let selector = match handle.readiness.pod_selector() {
            Some(selector) => selector,
            None => return Ok(true),
        };
        let pods = self.pods(handle, selector).await?;
        let running = pods.iter().filter(|pod| is_running(pod)).count();
        let expected = handle.expected_pods();
        debug!(
            "{} '{}' has {}/{} running pods ({} total)",
            handle.kind(),
            handle.name,
            running,
            expected,
            pods.len()
        );
        Ok(running == expected && pods.len() == expected)
    }

    /// Whether the CR is gone and, for pod based readiness, no matching pods remain.
    pub async fn is_absent(&self, handle: &CustomResourceHandle) -> Result<bool> {
        if self.exists(handle).await? {
            return Ok(false);
        }
        match handle.readiness.pod_selector() {
            Some(selector) => Ok(self.pods(handle, selector).await?.is_empty()),
            None => Ok(true),
        }
    }

    /// Wait for the CR to become ready. The CR must have been created first.
    pub async fn wait_ready(
        &self,
        handle: &CustomResourceHandle,
        spec: &WaitSpec<'_>,
    ) -> Result<Outcome> {
        ensure!(
            handle.is_created(),
            error::NotCreatedSnafu {
                kind: handle.kind(),
                name: handle.name.clone(),
            }
        );
        Ok(wait_for(spec, || self.is_ready(handle)).await)
    }

    /// Wait for the CR and its pods to disappear.
    pub async fn wait_absent(
        &self,
        handle: &CustomResourceHandle,
        spec: &WaitSpec<'_>,
    ) -> Result<Outcome> {
        Ok(wait_for(spec, || self.is_absent(handle)).await)
    }

    /// Set the CR's replica count with a read-modify-write of the whole object and optionally
    /// wait for it to become ready with the new count.
    ///
    /// There is no retry on conflict: if someone else modifies the CR between the read and the
    /// write, the API server rejects the write and this returns `ResourceConflict`.
    pub async fn scale(
        &self,
        handle: &mut CustomResourceHandle,
        replicas: i32,
        wait: Option<&WaitSpec<'_>>,
    ) -> Result<Outcome> {
        let mut object = self.get(handle).await?.context(error::LifecycleSnafu {
            action: format!("scale {} '{}'", handle.kind(), handle.name),
            reason: "because it does not exist",
        })?;
        ensure!(
            set_pointer(&mut object.data, &handle.replicas_pointer, Value::from(replicas)),
            error::LifecycleSnafu {
                action: format!("scale {} '{}'", handle.kind(), handle.name),
                reason: format!("at '{}'", handle.replicas_pointer),
            }
        );
        if let Err(e) = self
            .platform
            .replace(&handle.resource, &handle.namespace, &object)
            .await
        {
            return Err(self.mutation_error(e, "scale", handle));
        }
        handle.desired_replicas = Some(replicas);
        info!(
            "Scaled {} '{}' to {} replicas",
            handle.kind(),
            handle.name,
            replicas
        );

        match wait {
            Some(spec) => self.wait_ready(handle, spec).await,
            None => Ok(Outcome::Success),
        }
    }

    async fn get(&self, handle: &CustomResourceHandle) -> Result<Option<DynamicObject>> {
        self.platform
            .get(&handle.resource, &handle.namespace, &handle.name)
            .await
            .context(error::ClientSnafu {
                action: format!("get {} '{}'", handle.kind(), handle.name),
            })
    }

    async fn pods(&self, handle: &CustomResourceHandle, selector: &str) -> Result<Vec<Pod>> {
        self.platform
            .list_pods(&handle.namespace, selector)
            .await
            .context(error::ClientSnafu {
                action: format!("list pods matching '{}'", selector),
            })
    }

    fn mutation_error(
        &self,
        e: clients::Error,
        action: &str,
        handle: &CustomResourceHandle,
    ) -> error::Error {
        if e.is_conflict() {
            error::Error::ResourceConflict {
                kind: handle.kind().to_string(),
                name: handle.name.clone(),
                namespace: handle.namespace.clone(),
            }
        } else {
            error::Error::Client {
                action: format!("{} {} '{}'", action, handle.kind(), handle.name),
                source: e,
            }
        }
    }
}

/// `manifest` with the handle's name and namespace.
fn object_for(handle: &CustomResourceHandle, manifest: &DynamicObject) -> DynamicObject {
    let mut object = manifest.clone();
    object.metadata.name = Some(handle.name.clone());
    object.metadata.namespace = Some(handle.namespace.clone());
    object
}

fn is_running(pod: &Pod) -> bool {
    pod.metadata.deletion_timestamp.is_none()
        && pod.status.as_ref().and_then(|status| status.phase.as_deref())
            == Some(POD_PHASE_RUNNING)
}

/// Set the value at a JSON `pointer`, creating intermediate objects as needed. Returns `false`
/// if the path runs through something that is not an object.
pub(crate) fn set_pointer(target: &mut Value, pointer: &str, value: Value) -> bool {
    let tokens: Vec<String> = match pointer.strip_prefix('/') {
        Some(rest) => rest
            .split('/')
            .map(|token| token.replace("~1", "/").replace("~0", "~"))
            .collect(),
        None => return false,
    };
    let (last, parents) = match tokens.split_last() {
        Some(split) => split,
        None => return false,
    };
    let mut current = target;
    for token in parents {
        current = match current {
            Value::Object(map) => map
                .entry(token.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return false,
        };
    }
    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_pointer_replaces_and_creates() {
        let mut value = json!({"spec": {"replicas": 1, "image": "x"}});
        assert!(set_pointer(&mut value, "/spec/replicas", json!(3)));
        assert_eq!(value, json!({"spec": {"replicas": 3, "image": "x"}}));

        let mut value = json!({"spec": {}});
        assert!(set_pointer(&mut value, "/spec/kafka/replicas", json!(0)));
        assert_eq!(value, json!({"spec": {"kafka": {"replicas": 0}}}));

        let mut value = json!({"spec": {"a/b": {}}});
        assert!(set_pointer(&mut value, "/spec/a~1b/size", json!(2)));
        assert_eq!(value.pointer("/spec/a~1b/size"), Some(&json!(2)));
    }

    #[test]
    fn set_pointer_refuses_non_objects() {
        let mut value = json!({"spec": {"replicas": [1]}});
        assert!(!set_pointer(&mut value, "/spec/replicas/count", json!(1)));
        assert!(!set_pointer(&mut value, "spec/replicas", json!(1)));
    }
}
