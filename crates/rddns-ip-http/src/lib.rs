// # HTTP IP Resolver
//
// This crate provides the public-IP resolver for the router-gated DDNS updater.
//
// ## Architecture
//
// Issues one GET against an IP echo service (e.g., ifconfig.me, icanhazip.com)
// per call and returns the trimmed body as an IPv4 address. Anything that is
// not a dotted quad is rejected so an error page can never end up as DNS
// content.

use rddns_core::config::UpdaterConfig;
use rddns_core::traits::IpResolver;
use rddns_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

/// Longest body excerpt quoted in error messages
const MAX_BODY_EXCERPT: usize = 64;

/// HTTP-based public IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch the IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: URL returning the caller's IPv4 address as plain text
    /// - `timeout`: Upper bound for the whole request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create a resolver from the updater configuration
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        Self::new(config.engine.ip_echo_url.clone(), config.engine.resolve_timeout())
    }
}

/// Parse an IP echo body into an IPv4 address
///
/// Surrounding whitespace is ignored; anything else must be a dotted quad.
pub fn parse_ip_body(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    text.parse::<Ipv4Addr>().map_err(|_| {
        let excerpt: String = text.chars().take(MAX_BODY_EXCERPT).collect();
        Error::resolution(format!("Invalid IPv4 address in response: {:?}", excerpt))
    })
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Failed to read response: {}", e)))?;

        let ip = parse_ip_body(&body)?;
        tracing::info!("The current IP is: {}", ip);
        Ok(ip)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
