pub(crate) mod mock;

use mock::FakePlatform;
use olm_provisioner::{CustomResourceLifecycle, Error, Outcome, WaitSpec};
use olmsys_model::{manifest_from_yaml, CustomResourceHandle, Readiness};
use std::time::Duration;

const NAMESPACE: &str = "cache-test";

fn cache_manifest(replicas: i32) -> kube::core::DynamicObject {
    manifest_from_yaml(&format!(
        r#"
apiVersion: example.com/v1
kind: Cache
metadata:
  name: my-cache
spec:
  replicas: {}
"#,
        replicas
    ))
    .unwrap()
}

fn handle(replicas: i32) -> CustomResourceHandle {
    CustomResourceHandle::for_manifest(
        &cache_manifest(replicas),
        NAMESPACE,
        None,
        Readiness::PodsRunning {
            selector: "app.kubernetes.io/instance=my-cache".to_string(),
        },
    )
    .unwrap()
}

fn spec() -> WaitSpec<'static> {
    WaitSpec::new("cache", Duration::from_secs(60), Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn waiting_requires_a_created_resource() {
    let platform = FakePlatform::new();
    let lifecycle = CustomResourceLifecycle::new(&platform);
    let error = lifecycle.wait_ready(&handle(1), &spec()).await.unwrap_err();
    assert!(matches!(error, Error::NotCreated { .. }));
}

#[tokio::test(start_paused = true)]
async fn create_then_wait_ready() {
    let platform = FakePlatform::new();
    let lifecycle = CustomResourceLifecycle::new(&platform);
    let mut handle = handle(2);
    lifecycle
        .create(&mut handle, &cache_manifest(2))
        .await
        .unwrap();
    assert!(handle.is_created());
    assert_eq!(
        lifecycle.wait_ready(&handle, &spec()).await.unwrap(),
        Outcome::Success
    );
    assert_eq!(platform.pod_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn second_create_is_a_conflict() {
    let platform = FakePlatform::new();
    let lifecycle = CustomResourceLifecycle::new(&platform);
    let mut handle = handle(1);
    lifecycle
        .create(&mut handle, &cache_manifest(1))
        .await
        .unwrap();
    let error = lifecycle
        .create(&mut handle, &cache_manifest(1))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::ResourceConflict { .. }));
}

#[tokio::test(start_paused = true)]
async fn replace_creates_or_overwrites() {
    let platform = FakePlatform::new();
    let lifecycle = CustomResourceLifecycle::new(&platform);
    let mut handle = handle(1);
    lifecycle
        .replace(&mut handle, &cache_manifest(1))
        .await
        .unwrap();
    lifecycle
        .replace(&mut handle, &cache_manifest(3))
        .await
        .unwrap();
    assert_eq!(
        platform.calls(),
        vec!["create Cache my-cache", "replace Cache my-cache"]
    );
    assert_eq!(platform.pod_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn scale_down_waits_for_terminating_pods() {
    let platform = FakePlatform::new().with_pod_termination_polls(3);
    let lifecycle = CustomResourceLifecycle::new(&platform);
    let mut handle = handle(3);
    lifecycle
        .create(&mut handle, &cache_manifest(3))
        .await
        .unwrap();

    let outcome = lifecycle.scale(&mut handle, 1, Some(&spec())).await.unwrap();
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(handle.desired_replicas, Some(1));
    assert_eq!(platform.pod_count(), 1);
    let cache = platform.object("Cache", NAMESPACE, "my-cache").unwrap();
    assert_eq!(
        cache.data.pointer("/spec/replicas"),
        Some(&serde_json::Value::from(1))
    );
}

#[tokio::test(start_paused = true)]
async fn delete_and_wait_absent() {
    let platform = FakePlatform::new().with_pod_termination_polls(2);
    let lifecycle = CustomResourceLifecycle::new(&platform);
    let mut handle = handle(1);
    lifecycle
        .create(&mut handle, &cache_manifest(1))
        .await
        .unwrap();
    assert!(lifecycle.delete(&mut handle).await.unwrap());
    assert!(!handle.is_created());
    // The CR is gone right away but its pod is still terminating.
    assert!(!lifecycle.is_absent(&handle).await.unwrap());
    assert_eq!(
        lifecycle.wait_absent(&handle, &spec()).await.unwrap(),
        Outcome::Success
    );
    assert_eq!(platform.pod_count(), 0);
    assert!(!lifecycle.delete(&mut handle).await.unwrap());
}
