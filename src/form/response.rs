#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ResponseStatus {
    Info,
    Success,
    Error,
}

/// Outcome of the latest submit attempt, rendered by the host UI.
///
/// The form keeps an `Option<Response>`; `None` is the empty response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: ResponseStatus,
    pub message: String,
}

impl Response {
    pub fn new(status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}
