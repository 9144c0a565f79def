use crate::clients::error::{self, Result};
use crate::ClusterEvent;
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use snafu::ResultExt;

/// The narrow view of a Kubernetes cluster that the provisioner needs: generic object CRUD,
/// label-selected pod queries and the namespace event stream.
///
/// Everything is expressed in terms of `DynamicObject` so that product CRs of any kind can be
/// handled without generated models. The typed helpers convert to and from the OLM models (or
/// any other `kube::Resource`) through serde.
///
/// [`KubePlatform`](crate::clients::KubePlatform) implements this against a real API server.
/// Tests can provide an in-memory implementation.
#[async_trait::async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create `object`. Returns a CONFLICT error if an object of the same name exists.
    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Replace an existing object in place. Returns a NOT_FOUND error if it does not exist.
    async fn replace(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Get an object, `None` if it does not exist.
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;

    /// Request deletion of an object. Returns `false` if the object did not exist.
    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool>;

    /// Apply a JSON merge patch to an object.
    async fn patch_merge(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<DynamicObject>;

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    /// All events currently recorded for the namespace.
    async fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>>;

    async fn get_typed<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned + Send,
    {
        let resource = ApiResource::erase::<K>(&());
        match self.get(&resource, namespace, name).await? {
            None => Ok(None),
            Some(object) => Ok(Some(from_dynamic(object)?)),
        }
    }

    async fn list_typed<K>(&self, namespace: &str) -> Result<Vec<K>>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned + Send,
    {
        let resource = ApiResource::erase::<K>(&());
        self.list(&resource, namespace, None)
            .await?
            .into_iter()
            .map(from_dynamic)
            .collect()
    }

    async fn create_typed<K>(&self, namespace: &str, object: &K) -> Result<K>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Send + Sync,
    {
        let resource = ApiResource::erase::<K>(&());
        let created = self
            .create(&resource, namespace, &to_dynamic(object)?)
            .await?;
        from_dynamic(created)
    }

    async fn delete_typed<K>(&self, namespace: &str, name: &str) -> Result<bool>
    where
        K: Resource<DynamicType = ()> + Send,
    {
        let resource = ApiResource::erase::<K>(&());
        self.delete(&resource, namespace, name).await
    }
}

/// Convert any serializable Kubernetes object into a `DynamicObject`.
pub fn to_dynamic<K>(object: &K) -> Result<DynamicObject>
where
    K: Serialize,
{
    Ok(serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .context(error::SerdeSnafu {
            what: std::any::type_name::<K>(),
        })?)
}

/// Convert a `DynamicObject` into a typed Kubernetes object.
pub fn from_dynamic<K>(object: DynamicObject) -> Result<K>
where
    K: DeserializeOwned,
{
    Ok(serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .context(error::SerdeSnafu {
            what: std::any::type_name::<K>(),
        })?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clients::HttpStatusCode;
    use crate::olm::{Subscription, SubscriptionSpec};
    use serde_json::json;

    #[test]
    fn dynamic_conversion_keeps_typed_fields() {
        let mut subscription = Subscription::new(
            "amq-streams",
            SubscriptionSpec {
                name: "amq-streams".to_string(),
                source: "redhat-operators".to_string(),
                source_namespace: "openshift-marketplace".to_string(),
                channel: Some("stable".to_string()),
                ..Default::default()
            },
        );
        subscription.metadata.namespace = Some("kafka".to_string());
        let object = to_dynamic(&subscription).unwrap();
        assert_eq!(object.types.as_ref().unwrap().kind, "Subscription");
        assert_eq!(object.data["spec"]["sourceNamespace"], "openshift-marketplace");
        assert_eq!(from_dynamic::<Subscription>(object).unwrap(), subscription);
    }

    #[test]
    fn mismatched_object_is_a_serde_error() {
        let object = DynamicObject::new("amq-streams", &ApiResource::erase::<Subscription>(&()))
            .within("kafka")
            .data(json!({ "spec": { "name": 7 } }));
        let error = from_dynamic::<Subscription>(object).unwrap_err();
        assert_eq!(error.status_code(), None);
        assert!(!error.is_not_found());
        assert!(error.to_string().contains("Subscription"), "{}", error);
    }
}
