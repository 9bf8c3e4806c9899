// # DNS Provider Trait
//
// Defines the interface for reading and overwriting DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `rddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use rddns_core::DnsProvider;
//
// if let Some(record) = provider.find_a_record("example.com").await? {
//     if record.content != "203.0.113.7" {
//         provider.update_record(&record.with_content("203.0.113.7")).await?;
//     }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A DNS record as stored at the provider
///
/// The synchronizer only ever replaces `content`; every other field is
/// written back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned record id
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type ("A")
    #[serde(rename = "type")]
    pub record_type: String,
    /// Current record content (the address text)
    pub content: String,
    /// Time-to-live (1 means "automatic" at Cloudflare)
    pub ttl: u32,
    /// Whether traffic is routed through the provider's edge
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Copy of this record with `content` replaced
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers are stateless, single-shot API clients. Credentials and the
/// zone are bound at construction time.
///
/// ## Allowed Capabilities
/// - Perform HTTP/HTTPS API calls to their endpoints only
/// - Parse provider-specific responses
/// - Return success or a typed failure
///
/// ## Forbidden Capabilities
/// - Implement retry logic or backoff (the next tick is the retry)
/// - Decide whether an update is needed (owned by the synchronizer)
/// - Create or delete records
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the "A" record with the given name in the zone
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: The first matching record
    /// - `Ok(None)`: No such record in the zone
    /// - `Err(Error)`: The request failed
    async fn find_a_record(&self, record_name: &str) -> Result<Option<DnsRecord>, crate::Error>;

    /// Overwrite a record with the given full payload
    ///
    /// `record.id` selects the record; type, name, content, ttl, and proxied
    /// are all sent.
    async fn update_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
