//! The two proxy endpoints, and the axum router serving them.
//!
//! Every response is either the exchange's json passed through untouched, or
//! `{"error": "..."}` with a status code:
//! * 400 when a required parameter is missing (no call to the exchange is made)
//! * the exchange's own status when it rejects the call
//! * 500 for anything else. Details are logged here and never sent to the caller.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use displaydoc::Display;
use http::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{fmt, sync::Arc};

use crate::{C2cRestAPI, Credentials, Error};

/// Body of a `/get-ad-details` request
///
/// Fields are kept as raw json so that any falsy value (`null`, `false`, `0`,
/// `""`) is reported as a missing parameter rather than a malformed body.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdDetailsRequest {
    /// User's api key
    #[serde(default)]
    pub api_key: Option<Value>,
    /// User's secret key
    #[serde(default)]
    pub secret_key: Option<Value>,
    /// Number of an existing ad whose payment methods we want, string or number
    #[serde(default)]
    pub ad_id: Option<Value>,
}

impl AdDetailsRequest {
    /// Make a request for an ad's details
    pub fn new(creds: &Credentials, ad_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(Value::String(creds.api_key.clone())),
            secret_key: Some(Value::String(creds.secret_key.clone())),
            ad_id: Some(Value::String(ad_id.into())),
        }
    }
}

impl fmt::Debug for AdDetailsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdDetailsRequest")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("ad_id", &self.ad_id)
            .finish()
    }
}

/// Body of a `/create-ad` request
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdRequest {
    /// User's api key
    #[serde(default)]
    pub api_key: Option<Value>,
    /// User's secret key
    #[serde(default)]
    pub secret_key: Option<Value>,
    /// The ad payload to forward
    #[serde(default)]
    pub ad_data: Option<Value>,
}

impl CreateAdRequest {
    /// Make a request to create an ad
    pub fn new(creds: &Credentials, ad_data: Value) -> Self {
        Self {
            api_key: Some(Value::String(creds.api_key.clone())),
            secret_key: Some(Value::String(creds.secret_key.clone())),
            ad_data: Some(ad_data),
        }
    }
}

impl fmt::Debug for CreateAdRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateAdRequest")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("ad_data", &self.ad_data)
            .finish()
    }
}

/// Failure of a proxy call, as reported to the caller
#[derive(Display, Debug, Clone, Eq, PartialEq)]
pub enum ProxyError {
    /// Missing required parameters
    MissingParameters,
    /// {message}
    UpstreamRejected {
        /// Status code the exchange answered with
        status: StatusCode,
        /// The exchange's message, or a generic one
        message: String,
    },
    /// Internal server error
    InternalFailure,
}

impl ProxyError {
    /// Translate a client error. `fallback` is used when the exchange rejected
    /// the call without a message.
    fn from_exchange(err: Error, fallback: &str) -> Self {
        match err {
            Error::BadStatus { status, message } => {
                log::warn!("exchange rejected call with status {}: {:?}", status, message);
                Self::UpstreamRejected {
                    status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    message: message.unwrap_or_else(|| fallback.to_string()),
                }
            }
            Error::MissingCredentials => Self::MissingParameters,
            other => {
                log::error!("{}: {}", fallback, other);
                Self::InternalFailure
            }
        }
    }

    /// Http status of this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameters => StatusCode::BAD_REQUEST,
            Self::UpstreamRejected { status, .. } => *status,
            Self::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Fallback message when the exchange rejects a details lookup without saying why
pub const DETAILS_FALLBACK: &str = "Failed to fetch ad details";
/// Fallback message when the exchange rejects an ad without saying why
pub const CREATE_FALLBACK: &str = "Failed to create ad";

/// Look up an ad's details on the exchange, passing the response through
pub async fn fetch_ad_details(api: &C2cRestAPI, req: AdDetailsRequest) -> Result<Value, ProxyError> {
    let (Some(api_key), Some(secret_key), Some(ad_id)) = (
        req.api_key.filter(is_truthy),
        req.secret_key.filter(is_truthy),
        req.ad_id.filter(is_truthy),
    ) else {
        return Err(ProxyError::MissingParameters);
    };
    let creds = Credentials::new(as_text(api_key)?, as_text(secret_key)?);
    let ad_id = as_text(ad_id)?;
    log::info!("Fetching details of ad {}", ad_id);
    api.get_ad_details(&creds, &ad_id)
        .await
        .map_err(|err| ProxyError::from_exchange(err, DETAILS_FALLBACK))
}

/// Create an ad on the exchange, passing the response through
pub async fn create_ad(api: &C2cRestAPI, req: CreateAdRequest) -> Result<Value, ProxyError> {
    let (Some(api_key), Some(secret_key), Some(ad_data)) = (
        req.api_key.filter(is_truthy),
        req.secret_key.filter(is_truthy),
        req.ad_data.filter(is_truthy),
    ) else {
        return Err(ProxyError::MissingParameters);
    };
    let creds = Credentials::new(as_text(api_key)?, as_text(secret_key)?);
    log::info!("Creating ad");
    api.create_ad(&creds, &ad_data)
        .await
        .map_err(|err| ProxyError::from_exchange(err, CREATE_FALLBACK))
}

// Parameters are sent as text. Only strings and numbers have a text form.
fn as_text(value: Value) -> Result<String, ProxyError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => {
            log::error!("Expected a string or number parameter, found {}", json_type(&other));
            Err(ProxyError::InternalFailure)
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Absent, null, false, 0 and "" all count as missing.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ProxyError> {
    serde_json::from_slice(body).map_err(|err| {
        log::error!("Could not parse request body: {}", err);
        ProxyError::InternalFailure
    })
}

async fn get_ad_details_handler(State(api): State<Arc<C2cRestAPI>>, body: Bytes) -> Result<Json<Value>, ProxyError> {
    let req: AdDetailsRequest = parse_body(&body)?;
    fetch_ad_details(&api, req).await.map(Json)
}

async fn create_ad_handler(State(api): State<Arc<C2cRestAPI>>, body: Bytes) -> Result<Json<Value>, ProxyError> {
    let req: CreateAdRequest = parse_body(&body)?;
    create_ad(&api, req).await.map(Json)
}

/// Routes for both proxy endpoints, at the bare paths and under `/api/binance`
pub fn router(api: Arc<C2cRestAPI>) -> Router {
    Router::new()
        .route("/get-ad-details", post(get_ad_details_handler))
        .route("/create-ad", post(create_ad_handler))
        .route("/api/binance/get-ad-details", post(get_ad_details_handler))
        .route("/api/binance/create-ad", post(create_ad_handler))
        .with_state(api)
}
