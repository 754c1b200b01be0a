use super::gps::GpsError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    /// A well-formed response whose envelope says the call did not succeed.
    #[error("invalid server response: {0}")]
    InvalidResponse(String),

    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("no authentication token available")]
    MissingToken,

    #[error(transparent)]
    Gps(#[from] GpsError),

    #[error("step {step} is outside of {first}..={last}")]
    StepOutOfRange { step: u8, first: u8, last: u8 },

    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The park catalogue failed to load; carries the form's message.
    #[error("{0}")]
    ParksUnavailable(String),

    #[error("no park with upid {0}")]
    UnknownPark(String),
}

impl Error {
    /// 401 and 403 need a fresh token, retrying as-is will not help.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Error::MissingToken => true,
            Error::Status { status, .. } => status.as_u16() == 401 || status.as_u16() == 403,
            _ => false,
        }
    }
}
