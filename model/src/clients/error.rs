use crate::clients::{HttpStatusCode, StatusCode};
use snafu::Snafu;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("Error serializing object '{}': {}", what, source))]
    Serde {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Error initializing the Kubernetes client: {}", source))]
    Initialization { source: kube::Error },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    Kubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to {} {}: {}", method, what, source))]
    KubeApiCall {
        method: String,
        what: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to {} {}: {} ({})", method, what, message, status))]
    Status {
        method: String,
        what: String,
        status: StatusCode,
        message: String,
    },
}

impl Error {
    /// Create an error carrying an HTTP status, for `PlatformClient` implementations that do not
    /// talk to a real API server.
    pub fn with_status<S1, S2, S3>(method: S1, what: S2, status: StatusCode, message: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Error(InnerError::Status {
            method: method.into(),
            what: what.into(),
            status,
            message: message.into(),
        })
    }

    pub fn not_found<S1, S2>(method: S1, what: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::with_status(method, what, StatusCode::NOT_FOUND, "not found")
    }

    pub fn conflict<S1, S2>(method: S1, what: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::with_status(method, what, StatusCode::CONFLICT, "already exists")
    }
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::Serde { .. }
            | InnerError::Initialization { .. }
            | InnerError::Kubeconfig { .. } => None,
            InnerError::KubeApiCall { source: e, .. } => e.status_code(),
            InnerError::Status { status, .. } => Some(*status),
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}
