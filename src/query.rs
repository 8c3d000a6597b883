//! Construction of signed query strings.
//!
//! Binance recomputes the signature over the query string it receives, so the
//! order of parameters matters: the signature is computed over exactly the
//! `key=value&...` string that is later transmitted, and `signature` is always
//! the last parameter.

use std::{fmt::Display, time::SystemTime};
use url::form_urlencoded;

use crate::{Error, Result, signer};

/// Tolerance (in milliseconds) that Binance allows between our timestamp and its clock
pub const RECV_WINDOW: u64 = 5000;

/// An ordered list of query parameters, not yet signed
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Values are stringified with `Display`.
    pub fn param(mut self, key: &str, value: impl Display) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Append `recvWindow` and `timestamp`, in that order
    pub fn timestamped(self, timestamp: u64) -> Self {
        self.param("recvWindow", RECV_WINDOW).param("timestamp", timestamp)
    }

    /// The parameters, in insertion order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// The canonical form used as signature input: `k1=v1&k2=v2...`, no url-encoding
    pub fn canonical(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Sign the canonical form with the secret key, producing the query to transmit
    pub fn sign(self, secret_key: &str) -> Result<SignedQuery> {
        let canonical = self.canonical();
        let signature = signer::sign(&canonical, secret_key)?;
        Ok(SignedQuery {
            params: self,
            canonical,
            signature,
        })
    }
}

/// Query parameters together with their signature
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedQuery {
    params: QueryParams,
    canonical: String,
    signature: String,
}

impl SignedQuery {
    /// The exact string the signature was computed over
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Lowercase hex signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// All pairs to transmit, with `signature` last
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once(("signature", self.signature.as_str())))
    }

    /// The form-urlencoded query string for transmission
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(self.pairs()).finish()
    }
}

/// Current time in milliseconds since the unix epoch, used as the `timestamp` parameter
pub fn timestamp_millis() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_err(|_| Error::TimeError)?
        .as_millis() as u64)
}
