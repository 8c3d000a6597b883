//! Error types for the c2cads crate.

use displaydoc::Display;
use reqwest::header::InvalidHeaderValue;
use url::ParseError as UrlParseError;

use crate::form::FormState;

/// Alias for Result that contains the error type for this crate
pub type Result<T> = core::result::Result<T, Error>;

/// An error that can be generated while talking to the exchange
#[derive(Display, Debug)]
pub enum Error {
    /// Failed forming URI: {0}
    Url(UrlParseError),
    /// Reqwest error: {0}
    Reqwest(reqwest::Error),
    /// exchange returned bad status code {status}: {message:?}
    BadStatus {
        /// Http status code returned by the exchange
        status: u16,
        /// The `msg` field of the exchange's error body, if there was one
        message: Option<String>,
    },
    /// exchange returned bad status code {0} with an empty body
    EmptyErrorBody(u16),
    /// json deserialization failed: {0}, body was: {1}
    Json(serde_json::Error, String),
    /// Error serializing ad payload: {0}
    SerializingPayload(serde_json::Error),
    /// Missing credentials required for signed APIs
    MissingCredentials,
    /// Time error (preventing timestamp computation)
    TimeError,
    /// Invalid header value: {0}
    InvalidHeader(InvalidHeaderValue),
}

impl From<UrlParseError> for Error {
    fn from(src: UrlParseError) -> Self {
        Self::Url(src)
    }
}

impl From<reqwest::Error> for Error {
    fn from(src: reqwest::Error) -> Self {
        Self::Reqwest(src)
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(src: InvalidHeaderValue) -> Self {
        Self::InvalidHeader(src)
    }
}

impl std::error::Error for Error {}

/// An error building a config object
#[derive(Display, Debug, Clone, Eq, PartialEq)]
pub enum BuilderError {
    /// Invalid base url: {0}
    InvalidBaseUrl(UrlParseError),
    /// Base url must use http or https, found: {0}
    UnsupportedScheme(String),
    /// Timeout must be non-zero
    ZeroTimeout,
}

impl std::error::Error for BuilderError {}

/// An action was attempted that the ad form does not allow right now
#[derive(Display, Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    /// Cannot {action} while in state {state:?}
    InvalidTransition {
        /// What was attempted
        action: &'static str,
        /// State the form was in
        state: FormState,
    },
    /// Please fill in all required fields
    MissingFields,
    /// Payment method {0} was not returned by the fetched ad
    UnknownPayId(String),
    /// Please select a payment method
    NoMethodSelected,
    /// Could not build the ad payload: {0}
    Payload(String),
    /// Disclaimer must be acknowledged first ({0}s remaining)
    NotAcknowledged(u32),
}

impl std::error::Error for FormError {}
