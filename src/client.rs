//! Async low-level https connection to the Binance C2C REST API.
//!
//! Unlike most exchange clients, this one holds no credentials. Each call is
//! handed the credentials of the user it is made for, and they are dropped
//! when the call returns.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Value, json};
use std::convert::TryFrom;
use url::Url;

use crate::{
    Credentials, Error, ProxyConfig, Result,
    query::{QueryParams, timestamp_millis},
};

// c2cads version
const C2CADS_VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Header carrying the api key on signed Binance calls
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";
/// Ad detail lookup endpoint
pub const AD_DETAILS_PATH: &str = "/sapi/v1/c2c/ads/getDetailByNo";
/// Ad creation endpoint
pub const CREATE_AD_PATH: &str = "/sapi/v1/c2c/ads/post";

/// An async low-level https connection to Binance that executes signed methods.
pub struct C2cRestClient {
    /// Http client
    client: reqwest::Client,
    /// Base url to contact the exchange at
    base_url: Url,
}

impl TryFrom<&ProxyConfig> for C2cRestClient {
    type Error = Error;
    fn try_from(config: &ProxyConfig) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(format!("c2cads/{}", C2CADS_VERSION.unwrap_or("unknown")))
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url().clone(),
        })
    }
}

impl C2cRestClient {
    /// Try to create a new C2cRestClient from config
    ///
    /// Note: This is the same as using `TryFrom::try_from` to construct an instance
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        Self::try_from(config)
    }

    /// Execute a signed API call.
    ///
    /// `recvWindow` and `timestamp` are appended to `params`, the result is
    /// signed with the secret key, and the optional body is sent as json.
    /// Returns the raw response text on a 2xx status.
    pub async fn query_signed<B: Serialize + ?Sized>(
        &self,
        creds: &Credentials,
        url_path: &str,
        params: QueryParams,
        body: Option<&B>,
    ) -> Result<String> {
        if creds.is_incomplete() {
            return Err(Error::MissingCredentials);
        }

        let signed = params.timestamped(timestamp_millis()?).sign(&creds.secret_key)?;

        let mut url = self.base_url.join(url_path)?;
        url.set_query(Some(&signed.to_query_string()));

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(&creds.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        log::debug!("POST {} ({})", url_path, signed.canonical());

        let mut request = self.client.post(url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(rejection(status.as_u16(), text));
        }
        Ok(text)
    }
}

// Classify a non-2xx answer by its body. Only a json body is a rejection we
// can report; anything else failed to parse.
fn rejection(status: u16, text: String) -> Error {
    if text.is_empty() {
        return Error::EmptyErrorBody(status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(body) => Error::BadStatus {
            status,
            message: body.get("msg").and_then(Value::as_str).map(str::to_string),
        },
        Err(err) => Error::Json(err, text),
    }
}

/// An async connection to the Binance C2C ad endpoints
pub struct C2cRestAPI {
    client: C2cRestClient,
}

impl C2cRestAPI {
    /// Try to create async RestAPI instance from config
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        Ok(Self {
            client: C2cRestClient::new(config)?,
        })
    }

    /// (Signed) Get the details of one of the user's ads, including its payment methods
    ///
    /// Arguments:
    /// * creds: The user's api key and secret
    /// * ad_id: The ad number (`adsNo`)
    pub async fn get_ad_details(&self, creds: &Credentials, ad_id: &str) -> Result<Value> {
        let params = QueryParams::new().param("adsNo", ad_id);
        let text = self
            .client
            .query_signed::<Value>(creds, AD_DETAILS_PATH, params, None)
            .await?;
        serde_json::from_str(&text).map_err(|err| Error::Json(err, text))
    }

    /// (Signed) Create an ad
    ///
    /// Arguments:
    /// * creds: The user's api key and secret
    /// * ad_data: The json body describing the ad. It is not part of the signature.
    ///
    /// Binance sometimes answers with an empty body. On success that is reported
    /// as `{"success": true}`, on failure as a rejection without a message.
    pub async fn create_ad(&self, creds: &Credentials, ad_data: &Value) -> Result<Value> {
        let text = self
            .client
            .query_signed(creds, CREATE_AD_PATH, QueryParams::new(), Some(ad_data))
            .await
            .map_err(|err| match err {
                Error::EmptyErrorBody(status) => Error::BadStatus { status, message: None },
                other => other,
            })?;
        if text.is_empty() {
            return Ok(json!({ "success": true }));
        }
        serde_json::from_str(&text).map_err(|err| Error::Json(err, text))
    }
}

impl TryFrom<&ProxyConfig> for C2cRestAPI {
    type Error = Error;
    fn try_from(src: &ProxyConfig) -> Result<Self> {
        Self::new(src)
    }
}
