/*!

Resolves the OLM subscription parameters of a product from layered configuration.

Every field is looked up in order under a product-specific key (`<product>.operators.<field>`),
then under a global key (`olm.operators.<field>`) where one exists, and finally falls back to a
hard-coded default. Optional fields that resolve to nothing are left as `None` so that OLM's own
defaults apply.

!*/

use crate::error::{self, Result};
use log::debug;
use olmsys_model::constants::{
    DEFAULT_CATALOG_NAMESPACE, DEFAULT_COMMUNITY_CATALOG, DEFAULT_PRODUCTIZED_CATALOG,
    KEY_GLOBAL_APPROVAL, KEY_GLOBAL_CATALOG_NAMESPACE, KEY_GLOBAL_CATALOG_SOURCE,
    KEY_GLOBAL_INDEX_IMAGE,
};
use olmsys_model::{
    ConfigSource, ConfigSourceExt, Distribution, InstallPlanApproval, OperatorDescriptor,
};
use snafu::ResultExt;

pub struct CatalogResolver<'a> {
    config: &'a dyn ConfigSource,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(config: &'a dyn ConfigSource) -> Self {
        Self { config }
    }

    /// Resolve the `OperatorDescriptor` for `product`. This is a pure read of the configuration.
    pub fn resolve(&self, product: &str) -> Result<OperatorDescriptor> {
        let key = |field: &str| format!("{}.operators.{}", product, field);

        let (distribution, package_manifest_id) = self.package_manifest(product);

        let hard_default_catalog = match distribution {
            Distribution::Community => DEFAULT_COMMUNITY_CATALOG,
            Distribution::Productized => DEFAULT_PRODUCTIZED_CATALOG,
        };
        let catalog_source_name = self
            .config
            .first_of(&[&key("catalog_source"), KEY_GLOBAL_CATALOG_SOURCE])
            .unwrap_or_else(|| hard_default_catalog.to_string());

        let catalog_source_namespace = self
            .config
            .first_of(&[&key("namespace"), KEY_GLOBAL_CATALOG_NAMESPACE])
            .unwrap_or_else(|| DEFAULT_CATALOG_NAMESPACE.to_string());

        let index_image = self
            .config
            .first_of(&[&key("index_image"), KEY_GLOBAL_INDEX_IMAGE]);
        let channel = self.config.get(&key("channel"));
        let starting_csv = self.config.get(&key("starting_csv"));

        let approval_key = key("install_plan_approval");
        let install_plan_approval = match self
            .config
            .parse::<InstallPlanApproval>(&approval_key)
            .context(error::ConfigurationValueSnafu)?
        {
            Some(approval) => approval,
            None => self
                .config
                .parse::<InstallPlanApproval>(KEY_GLOBAL_APPROVAL)
                .context(error::ConfigurationValueSnafu)?
                .unwrap_or_default(),
        };

        let descriptor = OperatorDescriptor {
            package_manifest_id,
            catalog_source_name,
            catalog_source_namespace,
            index_image,
            channel,
            starting_csv,
            install_plan_approval,
            distribution,
        };
        debug!("resolved operator descriptor for '{}': {:?}", product, descriptor);
        Ok(descriptor)
    }

    /// The package manifest id and the distribution it belongs to. A productized package key
    /// takes precedence over a community one.
    fn package_manifest(&self, product: &str) -> (Distribution, String) {
        let key = |field: &str| format!("{}.operators.{}", product, field);
        if let Some(id) = self.config.get(&key("productized.package_manifest")) {
            return (Distribution::Productized, id);
        }
        if let Some(id) = self.config.get(&key("community.package_manifest")) {
            return (Distribution::Community, id);
        }
        let id = self
            .config
            .get(&key("package_manifest"))
            .unwrap_or_else(|| product.to_string());
        (Distribution::Community, id)
    }
}
