/*!

The `LifecycleOrchestrator` sequences the provisioning of one product:

1. [`configure`](LifecycleOrchestrator::configure) resolves the operator descriptor and wait
   timings. Nothing in the cluster is touched.
2. [`subscribe`](LifecycleOrchestrator::subscribe) installs the operator through OLM.
3. [`deploy`](LifecycleOrchestrator::deploy) creates the primary CR and its auxiliary CRs and
   waits for them to become ready.
4. [`scale`](LifecycleOrchestrator::scale) changes the primary CR's replica count.
5. [`undeploy`](LifecycleOrchestrator::undeploy) deletes the CRs, auxiliaries first, and waits for
   the primary and its pods to disappear.
6. [`unsubscribe`](LifecycleOrchestrator::unsubscribe) removes the subscription and its CSV.

A failing step leaves whatever it already created in place so that it can be inspected. Cleanup
is up to the caller, which should run `undeploy` and `unsubscribe` no matter how the earlier
steps ended. Both are safe to call when there is nothing to remove.

!*/

use crate::adapter::{ManagedResource, ProductAdapter};
use crate::catalog::CatalogResolver;
use crate::error::{self, Result, Stage};
use crate::fail_fast::{self, FailFastBaseline, FailFastGuard, FailFastPolicy};
use crate::lifecycle::CustomResourceLifecycle;
use crate::subscription::SubscriptionManager;
use crate::wait::{Outcome, WaitPolicy};
use log::{info, warn};
use olmsys_model::clients::PlatformClient;
use olmsys_model::{ConfigSource, InstallPlanApproval, OperatorDescriptor, SubscriptionState};
use snafu::{ensure, OptionExt};

pub struct LifecycleOrchestrator<P, A>
where
    P: PlatformClient,
    A: ProductAdapter,
{
    platform: P,
    adapter: A,
    descriptor: Option<OperatorDescriptor>,
    wait_policy: WaitPolicy,
    subscription: Option<SubscriptionManager>,
    primary: Option<ManagedResource>,
    /// In creation order.
    auxiliaries: Vec<ManagedResource>,
    baseline: Option<FailFastBaseline>,
}

impl<P, A> LifecycleOrchestrator<P, A>
where
    P: PlatformClient,
    A: ProductAdapter,
{
    pub fn new(platform: P, adapter: A) -> Self {
        // Pin the fallback baseline before anything can happen in the cluster.
        fail_fast::process_start();
        Self {
            platform,
            adapter,
            descriptor: None,
            wait_policy: WaitPolicy::default(),
            subscription: None,
            primary: None,
            auxiliaries: Vec::new(),
            baseline: None,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn descriptor(&self) -> Option<&OperatorDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn wait_policy(&self) -> &WaitPolicy {
        &self.wait_policy
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        self.subscription
            .as_ref()
            .map(SubscriptionManager::state)
            .unwrap_or_default()
    }

    pub fn current_csv(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .and_then(SubscriptionManager::current_csv)
    }

    pub fn primary(&self) -> Option<&ManagedResource> {
        self.primary.as_ref()
    }

    pub fn auxiliaries(&self) -> &[ManagedResource] {
        &self.auxiliaries
    }

    /// The baseline captured by the last `deploy`.
    pub fn baseline(&self) -> Option<&FailFastBaseline> {
        self.baseline.as_ref()
    }

    /// Resolve the operator descriptor and wait timings from `config`. Calling this again
    /// re-resolves both but keeps tracking the existing subscription.
    pub fn configure(&mut self, config: &dyn ConfigSource) -> Result<&OperatorDescriptor> {
        let product = self.adapter.product_id().to_string();
        let descriptor = CatalogResolver::new(config).resolve(&product)?;
        self.wait_policy = WaitPolicy::from_config(config, &product)?;
        if self.subscription.is_none() {
            self.subscription = Some(SubscriptionManager::new(
                self.adapter.namespace(),
                descriptor.package_manifest_id.as_str(),
            ));
        }
        info!(
            "Configured '{}': package '{}' from catalog source '{}/{}'",
            product,
            descriptor.package_manifest_id,
            descriptor.catalog_source_namespace,
            descriptor.catalog_source_name
        );
        Ok(self.descriptor.insert(descriptor))
    }

    /// Subscribe to the product's operator and wait for it to be installed.
    ///
    /// The approval mode is the adapter's override if it has one, `Manual` if the adapter asks
    /// for operator environment overrides, and the configured mode otherwise. Fatal events are
    /// judged with the default [`FailFastPolicy`], whatever the adapter's own policy is.
    pub async fn subscribe(&mut self) -> Result<()> {
        let descriptor = self.descriptor.as_ref().context(error::LifecycleSnafu {
            action: "subscribe",
            reason: "before configure",
        })?;
        let subscription = self.subscription.as_mut().context(error::LifecycleSnafu {
            action: "subscribe",
            reason: "before configure",
        })?;

        let extra_env = self.adapter.operator_env();
        let approval = match self.adapter.install_plan_approval() {
            Some(approval) => approval,
            None if !extra_env.is_empty() => InstallPlanApproval::Manual,
            None => descriptor.install_plan_approval,
        };

        // Operator pods are not named after the product, so the adapter's policy does not apply.
        let baseline = fail_fast::capture(&self.platform, self.adapter.namespace()).await?;
        let guard = FailFastGuard::new(&self.platform, baseline, FailFastPolicy::default());
        subscription
            .subscribe(
                &self.platform,
                descriptor,
                approval,
                &extra_env,
                &self.wait_policy,
                Some(&guard),
            )
            .await
    }

    /// Create the primary and auxiliary CRs and wait for them to become ready.
    pub async fn deploy(&mut self) -> Result<()> {
        ensure!(
            self.descriptor.is_some(),
            error::LifecycleSnafu {
                action: "deploy",
                reason: "before configure",
            }
        );
        ensure!(
            self.primary.is_none() && self.auxiliaries.is_empty(),
            error::LifecycleSnafu {
                action: "deploy",
                reason: "while a previous deployment is still tracked, undeploy it first",
            }
        );
        let mut primary = self.adapter.primary()?;
        let auxiliaries = self.adapter.auxiliaries()?;

        let baseline = fail_fast::capture(&self.platform, self.adapter.namespace()).await?;
        self.baseline = Some(baseline.clone());
        let lifecycle = CustomResourceLifecycle::new(&self.platform);

        lifecycle.create(&mut primary.handle, &primary.manifest).await?;
        let primary = self.primary.insert(primary);
        for mut auxiliary in auxiliaries {
            lifecycle
                .create(&mut auxiliary.handle, &auxiliary.manifest)
                .await?;
            self.auxiliaries.push(auxiliary);
        }

        let guard = FailFastGuard::new(&self.platform, baseline, self.adapter.fail_fast_policy());
        let spec = self.wait_policy.spec(
            Stage::Deploy,
            format!("{} '{}' to be ready", primary.handle.kind(), primary.handle.name),
            Some(&guard),
        );
        lifecycle
            .wait_ready(&primary.handle, &spec)
            .await?
            .into_result(Stage::Deploy, &spec)?;

        for auxiliary in &self.auxiliaries {
            let spec = self.wait_policy.spec(
                Stage::Deploy,
                format!(
                    "{} '{}' to be ready",
                    auxiliary.handle.kind(),
                    auxiliary.handle.name
                ),
                Some(&guard),
            );
            let outcome = lifecycle.wait_ready(&auxiliary.handle, &spec).await?;
            if self.adapter.auxiliary_readiness_required() {
                outcome.into_result(Stage::Deploy, &spec)?;
            } else if outcome != Outcome::Success {
                warn!(
                    "{} '{}' did not become ready, continuing: {:?}",
                    auxiliary.handle.kind(),
                    auxiliary.handle.name,
                    outcome
                );
            }
        }
        info!("Deployed '{}'", self.adapter.product_id());
        Ok(())
    }

    /// Scale the primary CR to `replicas`, waiting for exactly that many ready pods if `wait`.
    pub async fn scale(&mut self, replicas: i32, wait: bool) -> Result<()> {
        let primary = self.primary.as_mut().context(error::LifecycleSnafu {
            action: "scale",
            reason: "before deploy",
        })?;
        let baseline = fail_fast::capture(&self.platform, self.adapter.namespace()).await?;
        let guard = FailFastGuard::new(&self.platform, baseline, self.adapter.fail_fast_policy());
        let spec = self.wait_policy.spec(
            Stage::Scale,
            format!(
                "{} '{}' to be ready with {} replicas",
                primary.handle.kind(),
                primary.handle.name,
                replicas
            ),
            Some(&guard),
        );
        CustomResourceLifecycle::new(&self.platform)
            .scale(&mut primary.handle, replicas, wait.then(|| &spec))
            .await?
            .into_result(Stage::Scale, &spec)
    }

    /// Delete the auxiliary CRs in reverse creation order, then the primary CR, and wait until
    /// the primary and its pods are gone.
    pub async fn undeploy(&mut self) -> Result<()> {
        let lifecycle = CustomResourceLifecycle::new(&self.platform);
        while let Some(mut auxiliary) = self.auxiliaries.pop() {
            if let Err(e) = lifecycle.delete(&mut auxiliary.handle).await {
                self.auxiliaries.push(auxiliary);
                return Err(e);
            }
        }

        let primary = match self.primary.as_mut() {
            Some(primary) => primary,
            None => return Ok(()),
        };
        lifecycle.delete(&mut primary.handle).await?;
        let spec = self.wait_policy.spec(
            Stage::Undeploy,
            format!(
                "{} '{}' and its pods to be removed",
                primary.handle.kind(),
                primary.handle.name
            ),
            None,
        );
        lifecycle
            .wait_absent(&primary.handle, &spec)
            .await?
            .into_result(Stage::Undeploy, &spec)?;
        self.primary = None;
        info!("Undeployed '{}'", self.adapter.product_id());
        Ok(())
    }

    /// Remove the subscription and its CSV. Does nothing if there is no subscription.
    pub async fn unsubscribe(&mut self) -> Result<()> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.unsubscribe(&self.platform).await,
            None => Ok(()),
        }
    }

    /// Start tracking the product's CRs and subscription that already exist in the cluster, so
    /// that they can be torn down by this orchestrator.
    pub async fn adopt(&mut self) -> Result<()> {
        let subscription = self.subscription.as_mut().context(error::LifecycleSnafu {
            action: "adopt",
            reason: "before configure",
        })?;
        subscription.adopt(&self.platform).await?;

        let lifecycle = CustomResourceLifecycle::new(&self.platform);
        if self.primary.is_none() {
            let mut primary = self.adapter.primary()?;
            if lifecycle.exists(&primary.handle).await? {
                primary.handle.mark_created();
                info!(
                    "Adopted {} '{}'",
                    primary.handle.kind(),
                    primary.handle.name
                );
                self.primary = Some(primary);
            }
        }
        if self.auxiliaries.is_empty() {
            for mut auxiliary in self.adapter.auxiliaries()? {
                if lifecycle.exists(&auxiliary.handle).await? {
                    auxiliary.handle.mark_created();
                    info!(
                        "Adopted {} '{}'",
                        auxiliary.handle.kind(),
                        auxiliary.handle.name
                    );
                    self.auxiliaries.push(auxiliary);
                }
            }
        }
        Ok(())
    }

    /// End the orchestrator's life and hand back the platform client.
    pub fn dismiss(self) -> P {
        if self.subscription_state() != SubscriptionState::Absent {
            warn!(
                "Dismissed '{}' while its subscription is {}",
                self.adapter.product_id(),
                self.subscription_state()
            );
        }
        if self.primary.is_some() || !self.auxiliaries.is_empty() {
            warn!(
                "Dismissed '{}' while {} custom resources are still deployed",
                self.adapter.product_id(),
                self.auxiliaries.len() + usize::from(self.primary.is_some())
            );
        }
        self.platform
    }
}
