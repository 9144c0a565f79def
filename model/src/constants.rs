/// Helper macro to avoid retyping the base domain-like name of our system when creating further
/// string constants from it. When given no parameters, this returns the base domain-like name of
/// the system. When given a string literal parameter it adds `/parameter` to the end.
macro_rules! olmsys {
    () => {
        "olmsys.io"
    };
    ($s:literal) => {
        concat!(olmsys!(), "/", $s)
    };
}

// System identifiers
pub const OLMSYS: &str = olmsys!();
pub const FIELD_MANAGER: &str = "olmsys";

// OLM API
pub const OLM_GROUP: &str = "operators.coreos.com";
pub const OLM_VERSION: &str = "v1alpha1";
pub const OLM_API_VERSION: &str = "operators.coreos.com/v1alpha1";

// Label keys
pub const LABEL_PRODUCT: &str = olmsys!("product");
pub const LABEL_COMPONENT: &str = olmsys!("component");

// Standard tags https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
pub const APP_NAME: &str = "app.kubernetes.io/name";
pub const APP_INSTANCE: &str = "app.kubernetes.io/instance";
pub const APP_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

// Hard-coded fallbacks used when configuration is silent
pub const DEFAULT_COMMUNITY_CATALOG: &str = "community-operators";
pub const DEFAULT_PRODUCTIZED_CATALOG: &str = "redhat-operators";
pub const DEFAULT_CATALOG_NAMESPACE: &str = "openshift-marketplace";

// Global configuration keys
pub const KEY_GLOBAL_CATALOG_SOURCE: &str = "olm.operators.catalog_source";
pub const KEY_GLOBAL_CATALOG_NAMESPACE: &str = "olm.operators.namespace";
pub const KEY_GLOBAL_INDEX_IMAGE: &str = "olm.operators.index_image";
pub const KEY_GLOBAL_APPROVAL: &str = "olm.operators.install_plan_approval";

// Phases and states reported by OLM
pub const CSV_PHASE_SUCCEEDED: &str = "Succeeded";
pub const CSV_PHASE_FAILED: &str = "Failed";
pub const POD_PHASE_RUNNING: &str = "Running";

// Environment variable prefix used by the command line interface
pub const ENV_PREFIX: &str = "OLMSYS_";

#[test]
fn olmsys_constants_macro_test() {
    assert_eq!("olmsys.io", olmsys!());
    assert_eq!("olmsys.io/product", LABEL_PRODUCT);
    assert_eq!("olmsys.io/foo", olmsys!("foo"));
}
