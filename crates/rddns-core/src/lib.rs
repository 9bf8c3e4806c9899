// # rddns-core
//
// Core library for the router-gated DDNS updater.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping DNS "A" records in
// line with the public IP of a network whose router is up:
// - **ReachabilityProbe**: Trait for checking that the router answers
// - **IpResolver**: Trait for discovering the public IPv4 address
// - **DnsProvider**: Trait for reading and overwriting DNS records
// - **sync**: Per-record compare-and-update pass
// - **UpdaterEngine**: Fixed-interval loop tying the above together
//
// ## Design Principles
//
// 1. **Explicit configuration**: Built once from the environment, passed down
// 2. **Typed failures**: Each stage has its own error variants
// 3. **Next tick is the retry**: Nothing retries within a tick
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod traits;
pub mod engine;
pub mod sync;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsRecord, IpResolver, ReachabilityProbe};
pub use engine::{EngineEvent, TickOutcome, UpdaterEngine};
pub use sync::{RecordOutcome, SyncReport};
pub use config::{EngineConfig, Mode, ProviderCredentials, UpdaterConfig};
pub use error::{Error, Result};
