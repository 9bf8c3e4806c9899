// # Reachability Probe Trait
//
// Defines the interface for checking whether the router answers.
//
// ## Implementations
//
// - ICMP echo: `rddns-probe-icmp` crate
//
// ## Usage
//
// ```rust,ignore
// use rddns_core::ReachabilityProbe;
//
// let rtt = probe.probe().await?;
// println!("router up, {:.2} ms", rtt.as_secs_f64() * 1000.0);
// ```

use async_trait::async_trait;
use std::time::Duration;

/// Trait for reachability probe implementations
///
/// A probe is bound to one target at construction time. Each call sends a
/// single probe and waits at most the probe's own timeout.
///
/// ## Allowed Capabilities
/// - Perform platform-specific network I/O (ICMP sockets)
/// - Run short blocking work on the blocking pool
///
/// ## Forbidden Capabilities
/// - Retry within one call (the engine retries on the next tick)
/// - Spawn tasks that outlive the call
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Probe the target once
    ///
    /// # Returns
    ///
    /// - `Ok(Duration)`: Round-trip time of the echo
    /// - `Err(Error::Unreachable)`: Timeout, lookup failure, or socket error
    async fn probe(&self) -> Result<Duration, crate::Error>;

    /// Human-readable description of the target (for logging)
    fn target(&self) -> &str;
}
