use std::{net::SocketAddr, time::Duration};
use url::Url;

use crate::{BuilderError, TradeMethodTagging};

/// Where Binance's REST API lives
pub const BINANCE_BASE_URL: &str = "https://api.binance.com/";

/// Configuration for the exchange client and the proxy server.
///
/// There are deliberately no credentials here: they arrive with each request.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ProxyConfig {
    /// Base url of the exchange REST API
    pub(crate) base_url: Url,
    /// Timeout for each outbound call
    pub(crate) timeout: Duration,
    /// Address the proxy server listens on
    pub(crate) bind: SocketAddr,
    /// How the form tags the selected payment method
    pub(crate) tagging: TradeMethodTagging,
}

impl ProxyConfig {
    /// Get a builder for the ProxyConfig object
    pub fn builder() -> ProxyConfigBuilder {
        Default::default()
    }

    /// Base url of the exchange REST API
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Timeout for each outbound call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Address the proxy server listens on
    pub fn bind(&self) -> SocketAddr {
        self.bind
    }

    /// How the form tags the selected payment method
    pub fn tagging(&self) -> TradeMethodTagging {
        self.tagging
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(BINANCE_BASE_URL).expect("constant url is valid"),
            timeout: Duration::from_secs(30),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            tagging: TradeMethodTagging::default(),
        }
    }
}

/// Builder for the ProxyConfig object
#[derive(Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
    base_url: Option<String>,
}

impl ProxyConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Base url of the exchange. Defaults to https://api.binance.com/
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Timeout for each outbound call. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Address for the proxy server to listen on. Defaults to 127.0.0.1:3000
    pub fn bind(mut self, bind: SocketAddr) -> Self {
        self.config.bind = bind;
        self
    }

    /// How the selected payment method is tagged in the ad payload
    pub fn tagging(mut self, tagging: TradeMethodTagging) -> Self {
        self.config.tagging = tagging;
        self
    }

    /// Build a valid ProxyConfig if possible
    pub fn build(mut self) -> Result<ProxyConfig, BuilderError> {
        if let Some(base_url) = self.base_url {
            let url = Url::parse(&base_url).map_err(BuilderError::InvalidBaseUrl)?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(BuilderError::UnsupportedScheme(url.scheme().to_string()));
            }
            self.config.base_url = url;
        }
        if self.config.timeout.is_zero() {
            return Err(BuilderError::ZeroTimeout);
        }
        Ok(self.config)
    }
}
