// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare DNS provider for the router-gated DDNS updater.
//
// ## Behavior
//
// - One GET per record lookup, at most one PUT per record update
// - Authenticates every request with the account email and global API key
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode: lookups happen, updates are only logged
// - No retry, no caching: the engine's next tick is the retry
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Provider construction fails if credentials or zone are empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=A`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use rddns_core::config::{Mode, ProviderCredentials, UpdaterConfig};
use rddns_core::traits::{DnsProvider, DnsRecord};
use rddns_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Envelope around every Cloudflare API v4 response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            let messages: Vec<String> = self
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider(
                PROVIDER,
                format!("API reported failure: {}", messages.join("; ")),
            ));
        }
        self.result
            .ok_or_else(|| Error::provider(PROVIDER, "Invalid response format: missing result"))
    }
}

/// Body of a record update
///
/// Every field is sent so the record keeps its type, name, ttl, and proxied flag.
#[derive(Debug, Serialize)]
struct UpdatePayload<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

impl<'a> From<&'a DnsRecord> for UpdatePayload<'a> {
    fn from(record: &'a DnsRecord) -> Self {
        Self {
            record_type: &record.record_type,
            name: &record.name,
            content: &record.content,
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (record lookup)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Account email and global API key
    /// ⚠️ NEVER log the key
    credentials: ProviderCredentials,

    /// Zone holding the managed records
    zone_id: String,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: Account email and global API key
    /// - `zone_id`: Zone holding the managed records
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    pub fn new(credentials: ProviderCredentials, zone_id: impl Into<String>, dry_run: bool) -> Result<Self> {
        Self::with_base_url(credentials, zone_id, dry_run, CLOUDFLARE_API_BASE)
    }

    /// Create a provider talking to a different API base URL
    ///
    /// Mainly useful for testing against a mock server.
    pub fn with_base_url(
        credentials: ProviderCredentials,
        zone_id: impl Into<String>,
        dry_run: bool,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        credentials.validate()?;

        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            zone_id,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from the updater configuration
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        let dry_run = config.engine.mode == Mode::DryRun;
        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        Self::new(config.credentials.clone(), config.zone_id.clone(), dry_run)
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Auth-Email", self.credentials.email.as_str())
            .header("X-Auth-Key", self.credentials.api_key.as_str())
    }

    /// Map a non-success HTTP status to a typed error
    async fn status_error(response: reqwest::Response, context: &str) -> Error {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "Invalid API credentials or insufficient permissions. Status: {}",
                status
            )),
            404 => Error::not_found(format!("{}: {}", context, status)),
            409 => Error::provider(
                PROVIDER,
                format!("Conflict: Record is being updated by another process. Status: {}", status),
            ),
            429 => Error::rate_limited(format!("Rate limit exceeded. Please retry later. Status: {}", status)),
            500..=599 => Error::provider(
                PROVIDER,
                format!("Cloudflare server error (transient): {} - {}", status, error_text),
            ),
            _ => Error::provider(PROVIDER, format!("{}: {} - {}", context, status, error_text)),
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up the first "A" record with the given name
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=example.com&type=A
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    /// ```
    async fn find_a_record(&self, record_name: &str) -> Result<Option<DnsRecord>> {
        tracing::debug!("Looking up A record: {}", record_name);

        let response = self
            .authorized(self.client.get(self.records_url()))
            .query(&[("name", record_name), ("type", "A")])
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, "Record lookup failed").await);
        }

        let body: ApiResponse<Vec<DnsRecord>> = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        let record = body.into_result()?.into_iter().next();
        if let Some(ref record) = record {
            tracing::debug!("Found record {} -> {}", record.name, record.content);
        }
        Ok(record)
    }

    /// Overwrite a record with its full payload
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "...", "content": "...", "ttl": 1, "proxied": false}
    /// ```
    async fn update_record(&self, record: &DnsRecord) -> Result<()> {
        if record.id.is_empty() {
            return Err(Error::invalid_input(format!("Record {} has no id", record.name)));
        }

        let url = format!("{}/{}", self.records_url(), record.id);
        let payload = UpdatePayload::from(record);

        if self.dry_run {
            let body = serde_json::to_string(&payload).map_err(|e| {
                Error::provider(PROVIDER, format!("Failed to encode payload: {}", e))
            })?;
            tracing::info!("[DRY-RUN] Would send PUT request to {} with payload: {}", url, body);
            return Ok(());
        }

        let response = self
            .authorized(self.client.put(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, "Failed to update record").await);
        }

        let body: ApiResponse<DnsRecord> = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;
        body.into_result()?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ProviderCredentials {
        ProviderCredentials {
            email: "admin@example.com".to_string(),
            api_key: "secret_key_12345".to_string(),
        }
    }

    fn provider(server: &MockServer, dry_run: bool) -> CloudflareProvider {
        CloudflareProvider::with_base_url(credentials(), "zone-123", dry_run, server.uri()).unwrap()
    }

    fn record_json(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "rec-1",
            "zone_id": "zone-123",
            "name": "home.example.com",
            "type": "A",
            "content": content,
            "ttl": 120,
            "proxied": true
        })
    }

    fn sample_record() -> DnsRecord {
        DnsRecord {
            id: "rec-1".to_string(),
            name: "home.example.com".to_string(),
            record_type: "A".to_string(),
            content: "203.0.113.7".to_string(),
            ttl: 120,
            proxied: true,
        }
    }

    #[tokio::test]
    async fn test_find_record_sends_auth_and_filters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/zones/zone-123/dns_records"))
            .and(query_param("name", "home.example.com"))
            .and(query_param("type", "A"))
            .and(header("X-Auth-Email", "admin@example.com"))
            .and(header("X-Auth-Key", "secret_key_12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "errors": [],
                "result": [record_json("198.51.100.1")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = provider(&server, false)
            .find_a_record("home.example.com")
            .await
            .unwrap()
            .expect("record exists");

        assert_eq!(record.id, "rec-1");
        assert_eq!(record.content, "198.51.100.1");
        assert_eq!(record.ttl, 120);
        assert!(record.proxied);

        // Lookups carry no body, so no content type either
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("content-type").is_none());
    }

    #[tokio::test]
    async fn test_find_record_empty_result_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/zones/zone-123/dns_records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "errors": [],
                "result": []
            })))
            .mount(&server)
            .await;

        let record = provider(&server, false).find_a_record("missing.example.com").await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_update_sends_full_payload() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/zones/zone-123/dns_records/rec-1"))
            .and(header("X-Auth-Key", "secret_key_12345"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({
                "type": "A",
                "name": "home.example.com",
                "content": "203.0.113.7",
                "ttl": 120,
                "proxied": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "errors": [],
                "result": record_json("203.0.113.7")
            })))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server, false).update_record(&sample_record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dry_run_skips_put() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        provider(&server, true).update_record(&sample_record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_codes_map_to_typed_errors() {
        let cases = [
            (403, "auth"),
            (404, "not_found"),
            (429, "rate_limited"),
            (502, "provider"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;

            let err = provider(&server, false)
                .find_a_record("home.example.com")
                .await
                .unwrap_err();

            let matched = match expected {
                "auth" => matches!(err, Error::Authentication(_)),
                "not_found" => matches!(err, Error::NotFound(_)),
                "rate_limited" => matches!(err, Error::RateLimited(_)),
                _ => matches!(err, Error::Provider { .. }),
            };
            assert!(matched, "status {} produced {:?}", status, err);
        }
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "errors": [{"code": 9005, "message": "Content for A record is invalid"}],
                "result": null
            })))
            .mount(&server)
            .await;

        let err = provider(&server, false).update_record(&sample_record()).await.unwrap_err();
        match err {
            Error::Provider { message, .. } => assert!(message.contains("9005")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_zone_rejected() {
        assert!(matches!(
            CloudflareProvider::new(credentials(), "", false),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_key_rejected() {
        let creds = ProviderCredentials {
            email: "admin@example.com".to_string(),
            api_key: String::new(),
        };
        assert!(CloudflareProvider::new(creds, "zone-123", false).is_err());
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let provider = CloudflareProvider::new(credentials(), "zone-123", false).unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn test_provider_name() {
        let provider = CloudflareProvider::new(credentials(), "zone-123", false).unwrap();
        assert_eq!(provider.provider_name(), "cloudflare");
    }
}
