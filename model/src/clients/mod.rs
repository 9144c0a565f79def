mod error;
mod http_status_code;
mod kube_platform;
mod platform;

pub use error::{Error, Result};
pub use http_status_code::{AllowNotFound, HttpStatusCode, StatusCode};
pub use kube_platform::KubePlatform;
pub use platform::{from_dynamic, to_dynamic, PlatformClient};
