use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use log::{error, info};
use olm_provisioner::{LifecycleOrchestrator, ManifestAdapter};
use olmsys_model::clients::KubePlatform;
use olmsys_model::ConfigSource;
use std::path::PathBuf;

/// Subscribe to the operator of the product described in a manifest, deploy the product and
/// optionally scale it. Everything is removed again afterwards unless `--keep` is given.
#[derive(Debug, Parser)]
pub(crate) struct Run {
    /// Path to the product manifest YAML file.
    #[clap(long = "manifest", short = 'm', value_parser = value_parser!(PathBuf))]
    pub(crate) manifest: PathBuf,

    /// Scale the primary resource to this many replicas once it is ready.
    #[clap(long = "scale")]
    pub(crate) scale: Option<i32>,

    /// Leave the product and its subscription in the cluster.
    #[clap(long = "keep")]
    pub(crate) keep: bool,
}

impl Run {
    pub(crate) async fn run(self, platform: KubePlatform, config: &dyn ConfigSource) -> Result<()> {
        let adapter = ManifestAdapter::from_path(&self.manifest).context(format!(
            "Unable to read product manifest '{}'",
            self.manifest.display()
        ))?;
        let mut orchestrator = LifecycleOrchestrator::new(platform, adapter);
        orchestrator
            .configure(config)
            .context("Unable to configure provisioner")?;

        let provisioned = provision(&mut orchestrator, self.scale).await;
        if self.keep {
            orchestrator.dismiss();
            return provisioned;
        }
        if let Err(e) = &provisioned {
            error!("Provisioning failed, cleaning up: {:?}", e);
        }
        let cleaned = cleanup(&mut orchestrator).await;
        orchestrator.dismiss();
        provisioned?;
        cleaned?;
        println!("Product was provisioned and removed successfully.");
        Ok(())
    }
}

async fn provision(
    orchestrator: &mut LifecycleOrchestrator<KubePlatform, ManifestAdapter>,
    scale: Option<i32>,
) -> Result<()> {
    orchestrator
        .subscribe()
        .await
        .context("Unable to subscribe to operator")?;
    orchestrator
        .deploy()
        .await
        .context("Unable to deploy product")?;
    info!("Product is ready");
    if let Some(replicas) = scale {
        orchestrator
            .scale(replicas, true)
            .await
            .context(format!("Unable to scale product to {} replicas", replicas))?;
        info!("Product is scaled to {} replicas", replicas);
    }
    Ok(())
}

/// Teardown shared by `run` and `teardown`. Unsubscribing is attempted even when undeploying
/// fails.
pub(crate) async fn cleanup(
    orchestrator: &mut LifecycleOrchestrator<KubePlatform, ManifestAdapter>,
) -> Result<()> {
    let undeployed = orchestrator
        .undeploy()
        .await
        .context("Unable to undeploy product (some resources may be left behind)");
    if let Err(e) = &undeployed {
        error!("{:?}", e);
    }
    orchestrator
        .unsubscribe()
        .await
        .context("Unable to remove operator subscription")?;
    undeployed
}
