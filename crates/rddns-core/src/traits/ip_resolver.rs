// # IP Resolver Trait
//
// Defines the interface for discovering the caller's public IPv4 address.
//
// ## Implementations
//
// - HTTP IP echo services: `rddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use rddns_core::IpResolver;
//
// let ip = resolver.resolve().await?;
// println!("public IP: {}", ip);
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolver implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// ## Allowed Capabilities
/// - Perform HTTP/HTTPS requests to their configured endpoint only
/// - Validate and parse the response
///
/// ## Forbidden Capabilities
/// - Retry within one call (the engine retries on the next tick)
/// - Cache the address between calls (the engine owns the last observed IP)
/// - Decide whether DNS needs updating
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Fetch the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The validated public address
    /// - `Err(Error::Resolution)`: Network error, non-2xx status, or a body
    ///   that is not a dotted-quad IPv4 address
    async fn resolve(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Endpoint description (for logging)
    fn endpoint(&self) -> &str;
}
