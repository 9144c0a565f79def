use olmsys_model::ClusterEvent;
use serde::{Deserialize, Serialize};
use serde_plain::derive_display_from_serialize;
use snafu::Snafu;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// The lifecycle step during which an error occurred.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Configure,
    Subscribe,
    Deploy,
    Scale,
    Undeploy,
    Unsubscribe,
}

derive_display_from_serialize!(Stage);

/// The error type returned by the provisioner.
///
/// `TimedOut` and `FailFastAbort` are kept apart so callers can tell a cluster that is still
/// converging from one that has already reported a failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Something required is missing or misconfigured. Not retryable, no wait was attempted.
    #[snafu(display("Configuration error: {}", message))]
    Configuration { message: String },

    #[snafu(display("Invalid configuration: {}", source))]
    ConfigurationValue { source: olmsys_model::Error },

    #[snafu(display(
        "Timed out during {} after {:?} waiting for {}",
        stage,
        timeout,
        what
    ))]
    TimedOut {
        stage: Stage,
        what: String,
        timeout: Duration,
    },

    #[snafu(display("Aborted {} while waiting for {}: {}", stage, what, event))]
    FailFastAbort {
        stage: Stage,
        what: String,
        event: Box<ClusterEvent>,
    },

    #[snafu(display("{} '{}' already exists in namespace '{}'", kind, name, namespace))]
    ResourceConflict {
        kind: String,
        name: String,
        namespace: String,
    },

    #[snafu(display("{} '{}' has not been created, it cannot be waited on", kind, name))]
    NotCreated { kind: String, name: String },

    #[snafu(display("Cannot {} {}", action, reason))]
    Lifecycle { action: String, reason: String },

    #[snafu(display("Invalid product manifest: {}", message))]
    Manifest { message: String },

    #[snafu(display("Unable to read product manifest '{}': {}", path.display(), source))]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to deserialize product manifest: {}", source))]
    ManifestParse { source: serde_yaml::Error },

    #[snafu(display("Unable to parse product manifest: {}", source))]
    ManifestModel { source: olmsys_model::Error },

    #[snafu(display("Unable to {}: {}", action, source))]
    Client {
        action: String,
        source: olmsys_model::clients::Error,
    },
}

impl Error {
    /// The stage that timed out or failed fast, if this is a wait failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::TimedOut { stage, .. } | Error::FailFastAbort { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Error::TimedOut { .. })
    }

    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Error::FailFastAbort { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::ConfigurationValue { .. }
        )
    }
}
