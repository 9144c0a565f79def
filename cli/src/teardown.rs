use crate::run::cleanup;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use olm_provisioner::{LifecycleOrchestrator, ManifestAdapter};
use olmsys_model::clients::KubePlatform;
use olmsys_model::ConfigSource;
use std::path::PathBuf;

/// Remove everything a `run --keep` left in the cluster for the product described in a manifest.
#[derive(Debug, Parser)]
pub(crate) struct Teardown {
    /// Path to the product manifest YAML file used for the run.
    #[clap(long = "manifest", short = 'm', value_parser = value_parser!(PathBuf))]
    manifest: PathBuf,
}

impl Teardown {
    pub(crate) async fn run(self, platform: KubePlatform, config: &dyn ConfigSource) -> Result<()> {
        let adapter = ManifestAdapter::from_path(&self.manifest).context(format!(
            "Unable to read product manifest '{}'",
            self.manifest.display()
        ))?;
        let mut orchestrator = LifecycleOrchestrator::new(platform, adapter);
        orchestrator
            .configure(config)
            .context("Unable to configure provisioner")?;
        orchestrator
            .adopt()
            .await
            .context("Unable to find existing resources")?;
        let cleaned = cleanup(&mut orchestrator).await;
        orchestrator.dismiss();
        cleaned?;
        println!("Product and operator subscription were removed.");
        Ok(())
    }
}
