pub use http::StatusCode;
use kube::Error;

pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }

    fn is_not_found(&self) -> bool {
        self.is_status_code(StatusCode::NOT_FOUND)
    }

    fn is_conflict(&self) -> bool {
        self.is_status_code(StatusCode::CONFLICT)
    }
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        if let Error::Api(error_response) = self {
            StatusCode::from_u16(error_response.code).ok()
        } else {
            None
        }
    }
}

impl<T, E> HttpStatusCode for std::result::Result<T, E>
where
    E: HttpStatusCode,
{
    fn status_code(&self) -> Option<StatusCode> {
        self.as_ref().err().and_then(|e| e.status_code())
    }
}

/// Converts a NOT_FOUND error into `Ok(None)` so that "already gone" can be handled as success.
pub trait AllowNotFound<T, E> {
    /// Any NOT_FOUND error is passed to `f` and then discarded. All other errors are returned.
    fn allow_not_found<F>(self, f: F) -> std::result::Result<Option<T>, E>
    where
        F: FnOnce(E);
}

impl<T, E> AllowNotFound<T, E> for std::result::Result<T, E>
where
    E: HttpStatusCode,
{
    fn allow_not_found<F>(self, f: F) -> std::result::Result<Option<T>, E>
    where
        F: FnOnce(E),
    {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                f(e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
