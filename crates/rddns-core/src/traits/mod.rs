//! Core traits for the DDNS updater
//!
//! This module defines the abstract interfaces for the three external services.
//!
//! - [`ReachabilityProbe`]: Check whether the router answers
//! - [`IpResolver`]: Discover the public IPv4 address
//! - [`DnsProvider`]: Read and overwrite DNS records via provider APIs

pub mod reachability;
pub mod ip_resolver;
pub mod dns_provider;

pub use reachability::ReachabilityProbe;
pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, DnsRecord};
