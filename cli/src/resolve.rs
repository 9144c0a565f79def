use anyhow::{Context, Result};
use clap::Parser;
use olm_provisioner::CatalogResolver;
use olmsys_model::ConfigSource;

/// Resolve the operator descriptor for a product and print it as YAML. Nothing is read from the
/// cluster.
#[derive(Debug, Parser)]
pub(crate) struct Resolve {
    /// The product identifier used as the configuration key prefix, e.g. `kafka`.
    #[clap(long = "product", short = 'p')]
    product: String,
}

impl Resolve {
    pub(crate) fn run(self, config: &dyn ConfigSource) -> Result<()> {
        let descriptor = CatalogResolver::new(config)
            .resolve(&self.product)
            .context(format!("Unable to resolve operator for '{}'", self.product))?;
        let yaml = serde_yaml::to_string(&descriptor).context("Unable to serialize descriptor")?;
        print!("{}", yaml);
        Ok(())
    }
}
