/*!

This library provides the cluster-facing models used to provision operators through the Operator
Lifecycle Manager: the OLM custom resources, operator descriptors, handles for product custom
resources, cluster events, configuration sources and the `PlatformClient` API seam.

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

pub use configuration::{
    ConfigSource, ConfigSourceExt, EnvConfig, LayeredConfig, MapConfig, YamlConfig,
};
pub use descriptor::{Distribution, InstallPlanApproval, OperatorDescriptor, SubscriptionState};
pub use error::{Error, Result};
pub use event::{ClusterEvent, EventSeverity};
pub use handle::{
    api_resource_for, manifest_from_yaml, CustomResourceHandle, Readiness,
    DEFAULT_REPLICAS_POINTER,
};

pub mod clients;
mod configuration;
pub mod constants;
mod descriptor;
mod error;
mod event;
mod handle;
pub mod olm;
