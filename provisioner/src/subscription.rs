/*!

Drives an OLM `Subscription` and the `ClusterServiceVersion` it installs to the installed state
and back to absent.

```text
Absent --subscribe()--> Subscribing --(CSV Succeeded)--> Subscribed
Subscribed --unsubscribe()--> Unsubscribing --(Subscription and CSV deleted)--> Absent
```

!*/

use crate::error::{self, Result, Stage};
use crate::fail_fast::FailFastCheck;
use crate::wait::{wait_for, WaitPolicy};
use k8s_openapi::api::apps::v1::Deployment;
use kube::discovery::ApiResource;
use log::{debug, info, warn};
use maplit::btreemap;
use olmsys_model::clients::{HttpStatusCode, PlatformClient};
use olmsys_model::constants::{APP_MANAGED_BY, FIELD_MANAGER};
use olmsys_model::olm::{
    deployments_have_env, set_deployments_env, CatalogSource, ClusterServiceVersion, EnvVar,
    InstallPlan, Subscription, SubscriptionConfig, SubscriptionSpec, CSV_DEPLOYMENTS_POINTER,
};
use olmsys_model::{InstallPlanApproval, OperatorDescriptor, SubscriptionState};
use serde_json::{json, Value};
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeMap;

/// Owns the subscription of one operator package in one namespace.
#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    namespace: String,
    name: String,
    state: SubscriptionState,
    current_csv: Option<String>,
}

impl SubscriptionManager {
    pub fn new<S1, S2>(namespace: S1, name: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            state: SubscriptionState::Absent,
            current_csv: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// The CSV installed by the subscription (its `installedCSV`), known once the state is
    /// `Subscribed`. A pending upgrade that has not been approved is never recorded here.
    pub fn current_csv(&self) -> Option<&str> {
        self.current_csv.as_deref()
    }

    /// Subscribe to the package described by `descriptor` and wait for its CSV to succeed.
    ///
    /// With `Manual` approval the pending `InstallPlan` is approved explicitly, and the state
    /// only advances once that has happened. Entries in `extra_env` are passed to OLM through
    /// the subscription's `config.env` and are verified on the operator `Deployment`s. If OLM
    /// did not apply them, they are written into the install strategy of the CSV and the
    /// deployments are awaited again.
    pub async fn subscribe<P>(
        &mut self,
        platform: &P,
        descriptor: &OperatorDescriptor,
        approval: InstallPlanApproval,
        extra_env: &BTreeMap<String, String>,
        policy: &WaitPolicy,
        fail_fast: Option<&dyn FailFastCheck>,
    ) -> Result<()>
    where
        P: PlatformClient,
    {
        ensure!(
            self.state == SubscriptionState::Absent,
            error::LifecycleSnafu {
                action: format!("subscribe to '{}'", descriptor.package_manifest_id),
                reason: format!("while the subscription is {}", self.state),
            }
        );

        let catalog = platform
            .get_typed::<CatalogSource>(
                &descriptor.catalog_source_namespace,
                &descriptor.catalog_source_name,
            )
            .await
            .context(error::ClientSnafu {
                action: "look up the catalog source",
            })?;
        ensure!(
            catalog.is_some(),
            error::ConfigurationSnafu {
                message: format!(
                    "catalog source '{}' not found in namespace '{}'",
                    descriptor.catalog_source_name, descriptor.catalog_source_namespace
                ),
            }
        );

        self.state = SubscriptionState::Subscribing;
        if let Err(e) = self
            .create_subscription(platform, descriptor, approval, extra_env)
            .await
        {
            self.state = SubscriptionState::Absent;
            return Err(e);
        }

        if approval == InstallPlanApproval::Manual {
            let spec = policy.spec(
                Stage::Subscribe,
                format!("an install plan for subscription '{}'", self.name),
                fail_fast,
            );
            wait_for(&spec, || {
                has_install_plan(platform, &self.namespace, &self.name)
            })
            .await
            .into_result(Stage::Subscribe, &spec)?;
            self.approve_install_plan(platform).await?;
        }

        self.wait_for_csv(platform, policy, fail_fast).await?;
        let csv_name = self.installed_csv_from_status(platform).await?.context(
            error::LifecycleSnafu {
                action: format!("subscribe to '{}'", descriptor.package_manifest_id),
                reason: "because the subscription lost its installed CSV",
            },
        )?;

        if !extra_env.is_empty()
            && !operator_has_env(platform, &self.namespace, &csv_name, extra_env).await?
            && self.apply_env(platform, &csv_name, extra_env).await?
        {
            self.wait_for_csv(platform, policy, fail_fast).await?;
            let spec = policy.spec(
                Stage::Subscribe,
                format!("the operator deployments of CSV '{}' to pick up their environment", csv_name),
                fail_fast,
            );
            wait_for(&spec, || {
                operator_has_env(platform, &self.namespace, &csv_name, extra_env)
            })
            .await
            .into_result(Stage::Subscribe, &spec)?;
        }

        info!(
            "Subscription '{}' in '{}' installed CSV '{}'",
            self.name, self.namespace, csv_name
        );
        self.current_csv = Some(csv_name);
        self.state = SubscriptionState::Subscribed;
        Ok(())
    }

    /// Delete the subscription and its CSVs: the installed one and, when OLM has moved on to a
    /// pending upgrade, that one too. Objects that do not exist are skipped, so calling this when
    /// nothing is subscribed is a no-op.
    pub async fn unsubscribe<P>(&mut self, platform: &P) -> Result<()>
    where
        P: PlatformClient,
    {
        let mut csv_names: Vec<String> = self.current_csv.iter().cloned().collect();
        if let Some(subscription) = self.get_subscription(platform).await? {
            for name in subscription.csv_names() {
                if !csv_names.contains(&name) {
                    csv_names.push(name);
                }
            }
        }

        self.state = SubscriptionState::Unsubscribing;
        let deleted = platform
            .delete_typed::<Subscription>(&self.namespace, &self.name)
            .await
            .context(error::ClientSnafu {
                action: format!("delete subscription '{}'", self.name),
            })?;
        if deleted {
            info!("Deleted subscription '{}' in '{}'", self.name, self.namespace);
        } else {
            debug!("subscription '{}' was already gone", self.name);
        }

        for csv_name in csv_names {
            let deleted = platform
                .delete_typed::<ClusterServiceVersion>(&self.namespace, &csv_name)
                .await
                .context(error::ClientSnafu {
                    action: format!("delete CSV '{}'", csv_name),
                })?;
            if deleted {
                info!("Deleted CSV '{}' in '{}'", csv_name, self.namespace);
            }
        }

        self.current_csv = None;
        self.state = SubscriptionState::Absent;
        Ok(())
    }

    /// Start tracking a subscription that already exists in the cluster. Returns `false` if
    /// there is none.
    pub async fn adopt<P>(&mut self, platform: &P) -> Result<bool>
    where
        P: PlatformClient,
    {
        let subscription = match self.get_subscription(platform).await? {
            Some(subscription) => subscription,
            None => return Ok(false),
        };
        self.current_csv = subscription.installed_csv().map(str::to_string);
        self.state = match &self.current_csv {
            Some(csv_name) => {
                let succeeded = platform
                    .get_typed::<ClusterServiceVersion>(&self.namespace, csv_name)
                    .await
                    .context(error::ClientSnafu {
                        action: format!("get CSV '{}'", csv_name),
                    })?
                    .map(|csv| csv.is_succeeded())
                    .unwrap_or(false);
                if succeeded {
                    SubscriptionState::Subscribed
                } else {
                    SubscriptionState::Subscribing
                }
            }
            None => SubscriptionState::Subscribing,
        };
        info!(
            "Adopted subscription '{}' in '{}' ({})",
            self.name, self.namespace, self.state
        );
        Ok(true)
    }

    async fn create_subscription<P>(
        &self,
        platform: &P,
        descriptor: &OperatorDescriptor,
        approval: InstallPlanApproval,
        extra_env: &BTreeMap<String, String>,
    ) -> Result<()>
    where
        P: PlatformClient,
    {
        let mut subscription = Subscription::new(
            &self.name,
            SubscriptionSpec {
                name: descriptor.package_manifest_id.clone(),
                source: descriptor.catalog_source_name.clone(),
                source_namespace: descriptor.catalog_source_namespace.clone(),
                channel: descriptor.channel.clone(),
                install_plan_approval: Some(approval),
                starting_csv: descriptor.starting_csv.clone(),
                config: if extra_env.is_empty() {
                    None
                } else {
                    Some(SubscriptionConfig {
                        env: EnvVar::list_from(extra_env),
                    })
                },
            },
        );
        subscription.metadata.namespace = Some(self.namespace.clone());
        subscription.metadata.labels = Some(btreemap! {
            APP_MANAGED_BY.to_string() => FIELD_MANAGER.to_string(),
        });

        match platform.create_typed(&self.namespace, &subscription).await {
            Ok(_) => {
                info!(
                    "Created subscription '{}' to '{}' from '{}' ({} approval)",
                    self.name, descriptor.package_manifest_id, descriptor.catalog_source_name, approval
                );
                Ok(())
            }
            Err(e) if e.is_conflict() => error::ResourceConflictSnafu {
                kind: "Subscription",
                name: self.name.clone(),
                namespace: self.namespace.clone(),
            }
            .fail(),
            Err(e) => Err(e).context(error::ClientSnafu {
                action: format!("create subscription '{}'", self.name),
            }),
        }
    }

    async fn approve_install_plan<P>(&self, platform: &P) -> Result<()>
    where
        P: PlatformClient,
    {
        let plan_name = self
            .get_subscription(platform)
            .await?
            .and_then(|subscription| subscription.install_plan_name().map(str::to_string))
            .context(error::LifecycleSnafu {
                action: "approve the install plan",
                reason: format!("because subscription '{}' does not reference one", self.name),
            })?;
        platform
            .patch_merge(
                &ApiResource::erase::<InstallPlan>(&()),
                &self.namespace,
                &plan_name,
                &json!({ "spec": { "approved": true } }),
            )
            .await
            .context(error::ClientSnafu {
                action: format!("approve install plan '{}'", plan_name),
            })?;
        info!("Approved install plan '{}'", plan_name);
        Ok(())
    }

    async fn wait_for_csv<P>(
        &self,
        platform: &P,
        policy: &WaitPolicy,
        fail_fast: Option<&dyn FailFastCheck>,
    ) -> Result<()>
    where
        P: PlatformClient,
    {
        let spec = policy.spec(
            Stage::Subscribe,
            format!("the CSV of subscription '{}' to succeed", self.name),
            fail_fast,
        );
        wait_for(&spec, || csv_succeeded(platform, &self.namespace, &self.name))
            .await
            .into_result(Stage::Subscribe, &spec)
    }

    /// Writes every entry of `env` that is missing into the deployments of the CSV's install
    /// strategy. The CSV is edited as a `DynamicObject` so that the fields the typed model does
    /// not know about survive the replace. Returns `false` if the CSV has no operator containers
    /// to carry the environment.
    async fn apply_env<P>(
        &self,
        platform: &P,
        csv_name: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<bool>
    where
        P: PlatformClient,
    {
        let resource = ApiResource::erase::<ClusterServiceVersion>(&());
        let mut csv = platform
            .get(&resource, &self.namespace, csv_name)
            .await
            .context(error::ClientSnafu {
                action: format!("get CSV '{}'", csv_name),
            })?
            .context(error::LifecycleSnafu {
                action: "apply operator environment",
                reason: format!("because CSV '{}' is gone", csv_name),
            })?;

        let deployments = match csv
            .data
            .pointer_mut(CSV_DEPLOYMENTS_POINTER)
            .and_then(Value::as_array_mut)
        {
            Some(deployments) => deployments,
            None => {
                warn!(
                    "CSV '{}' has no deployments, its operator environment is left alone",
                    csv_name
                );
                return Ok(false);
            }
        };
        let mut changed = false;
        for (name, value) in env {
            if deployments_have_env(deployments.iter(), name, value) {
                continue;
            }
            debug!("setting {} on the deployments of CSV '{}'", name, csv_name);
            if !set_deployments_env(deployments.iter_mut(), name, value) {
                warn!(
                    "CSV '{}' has no operator containers, its operator environment is left alone",
                    csv_name
                );
                return Ok(false);
            }
            changed = true;
        }
        if !changed {
            return Ok(true);
        }

        match platform.replace(&resource, &self.namespace, &csv).await {
            Ok(_) => {
                info!("Updated the operator environment of CSV '{}'", csv_name);
                Ok(true)
            }
            Err(e) if e.is_conflict() => error::ResourceConflictSnafu {
                kind: "ClusterServiceVersion",
                name: csv_name,
                namespace: self.namespace.clone(),
            }
            .fail(),
            Err(e) => Err(e).context(error::ClientSnafu {
                action: format!("update CSV '{}'", csv_name),
            }),
        }
    }

    async fn get_subscription<P>(&self, platform: &P) -> Result<Option<Subscription>>
    where
        P: PlatformClient,
    {
        platform
            .get_typed::<Subscription>(&self.namespace, &self.name)
            .await
            .context(error::ClientSnafu {
                action: format!("get subscription '{}'", self.name),
            })
    }

    async fn installed_csv_from_status<P>(&self, platform: &P) -> Result<Option<String>>
    where
        P: PlatformClient,
    {
        Ok(self
            .get_subscription(platform)
            .await?
            .and_then(|subscription| subscription.installed_csv().map(str::to_string)))
    }
}

/// Whether OLM has created an install plan for the subscription.
async fn has_install_plan<P>(platform: &P, namespace: &str, name: &str) -> Result<bool>
where
    P: PlatformClient,
{
    Ok(platform
        .get_typed::<Subscription>(namespace, name)
        .await
        .context(error::ClientSnafu {
            action: format!("get subscription '{}'", name),
        })?
        .map(|subscription| subscription.install_plan_name().is_some())
        .unwrap_or(false))
}

/// Whether the subscription's installed CSV exists and has succeeded. `currentCSV` is not used
/// because it moves to a pending upgrade before that upgrade is approved.
async fn csv_succeeded<P>(platform: &P, namespace: &str, name: &str) -> Result<bool>
where
    P: PlatformClient,
{
    let csv_name = match platform
        .get_typed::<Subscription>(namespace, name)
        .await
        .context(error::ClientSnafu {
            action: format!("get subscription '{}'", name),
        })?
        .and_then(|subscription| subscription.installed_csv().map(str::to_string))
    {
        Some(csv_name) => csv_name,
        None => return Ok(false),
    };
    let csv = platform
        .get_typed::<ClusterServiceVersion>(namespace, &csv_name)
        .await
        .context(error::ClientSnafu {
            action: format!("get CSV '{}'", csv_name),
        })?;
    Ok(match csv {
        Some(csv) if csv.is_failed() => {
            warn!(
                "CSV '{}' failed: {}",
                csv_name,
                csv.status
                    .as_ref()
                    .and_then(|status| status.message.as_deref())
                    .unwrap_or("no message")
            );
            false
        }
        Some(csv) => csv.is_succeeded(),
        None => false,
    })
}

/// Whether every operator `Deployment` of the CSV exists and carries all of `env`. OLM applies a
/// subscription's `config.env` to these deployments, not to the CSV.
async fn operator_has_env<P>(
    platform: &P,
    namespace: &str,
    csv_name: &str,
    env: &BTreeMap<String, String>,
) -> Result<bool>
where
    P: PlatformClient,
{
    let deployment_names = match platform
        .get_typed::<ClusterServiceVersion>(namespace, csv_name)
        .await
        .context(error::ClientSnafu {
            action: format!("get CSV '{}'", csv_name),
        })? {
        Some(csv) => csv.deployment_names(),
        None => return Ok(false),
    };
    if deployment_names.is_empty() {
        return Ok(false);
    }

    let resource = ApiResource::erase::<Deployment>(&());
    let mut deployments = Vec::new();
    for name in deployment_names {
        match platform
            .get(&resource, namespace, &name)
            .await
            .context(error::ClientSnafu {
                action: format!("get deployment '{}'", name),
            })? {
            Some(deployment) => deployments.push(deployment.data),
            None => return Ok(false),
        }
    }
    Ok(env
        .iter()
        .all(|(name, value)| deployments_have_env(deployments.iter(), name, value)))
}
