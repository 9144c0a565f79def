/*!

`olm-provisioner` installs operators through the Operator Lifecycle Manager and drives product
custom resources to a ready state and back to absent.

The [`LifecycleOrchestrator`] is generic over a [`PlatformClient`](olmsys_model::clients::PlatformClient),
which provides access to the cluster, and a [`ProductAdapter`], which describes the product's
custom resources. Every wait goes through [`wait_for`], which polls at a fixed interval under a
timeout and aborts early when the [`FailFastGuard`] sees a fatal cluster event.

# Example

```no_run
# use olm_provisioner::{LifecycleOrchestrator, ManifestAdapter};
# use olmsys_model::clients::KubePlatform;
# use olmsys_model::EnvConfig;
# use std::path::Path;
# async fn run() -> olm_provisioner::Result<()> {
let platform = KubePlatform::new().await.unwrap();
let adapter = ManifestAdapter::from_path(Path::new("kafka.yaml"))?;
let mut orchestrator = LifecycleOrchestrator::new(platform, adapter);
orchestrator.configure(&EnvConfig::new("OLMSYS_"))?;
orchestrator.subscribe().await?;
let deployed = orchestrator.deploy().await;
orchestrator.undeploy().await?;
orchestrator.unsubscribe().await?;
deployed
# }
```

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

mod adapter;
mod catalog;
mod error;
pub mod fail_fast;
mod lifecycle;
mod manifest;
mod orchestrator;
mod subscription;
pub mod wait;

pub use adapter::{ManagedResource, ProductAdapter};
pub use catalog::CatalogResolver;
pub use error::{Error, Result, Stage};
pub use fail_fast::{FailFastBaseline, FailFastCheck, FailFastGuard, FailFastPolicy};
pub use lifecycle::CustomResourceLifecycle;
pub use manifest::{FailFastSettings, ManifestAdapter, ProductManifest, ResourceTemplate};
pub use orchestrator::LifecycleOrchestrator;
pub use subscription::SubscriptionManager;
pub use wait::{wait_for, Outcome, WaitPolicy, WaitSpec};
