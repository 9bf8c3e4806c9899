//! Test doubles and common utilities for engine contract tests
//!
//! Every double is a cheap handle around shared state: clone it, hand one
//! copy to the engine, and keep the other to inspect call counts.

#![allow(dead_code)]

use rddns_core::config::{EngineConfig, ProviderCredentials, UpdaterConfig};
use rddns_core::error::{Error, Result};
use rddns_core::traits::{DnsProvider, DnsRecord, IpResolver, ReachabilityProbe};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A probe that answers from a script, repeating the last entry forever
#[derive(Clone)]
pub struct ScriptedProbe {
    /// `true` = reachable
    script: Arc<Mutex<VecDeque<bool>>>,
    last: Arc<Mutex<bool>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn reachable() -> Self {
        Self::scripted(&[true])
    }

    pub fn unreachable() -> Self {
        Self::scripted(&[false])
    }

    pub fn scripted(script: &[bool]) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.iter().copied().collect())),
            last: Arc::new(Mutex::new(script.last().copied().unwrap_or(true))),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn probe(&self) -> Result<Duration> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let up = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.last.lock().unwrap());
        if up {
            Ok(Duration::from_micros(1500))
        } else {
            Err(Error::unreachable("request timed out"))
        }
    }

    fn target(&self) -> &str {
        "192.168.1.1"
    }
}

/// A resolver that answers from a script, repeating the last entry forever
///
/// `None` entries fail the resolution.
#[derive(Clone)]
pub struct ScriptedResolver {
    script: Arc<Mutex<VecDeque<Option<Ipv4Addr>>>>,
    last: Arc<Mutex<Option<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::scripted(&[Some(ip)])
    }

    pub fn failing() -> Self {
        Self::scripted(&[None])
    }

    pub fn scripted(script: &[Option<Ipv4Addr>]) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.iter().copied().collect())),
            last: Arc::new(Mutex::new(script.last().copied().flatten())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.last.lock().unwrap());
        next.ok_or_else(|| Error::resolution("HTTP error: 503 Service Unavailable"))
    }

    fn endpoint(&self) -> &str {
        "https://ifconfig.me/ip"
    }
}

/// An in-memory zone that tracks lookups and updates
#[derive(Clone)]
pub struct MockDnsProvider {
    records: Arc<Mutex<HashMap<String, DnsRecord>>>,
    /// Names whose update fails while listed
    failing_updates: Arc<Mutex<Vec<String>>>,
    lookup_count: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<DnsRecord>>>,
}

impl MockDnsProvider {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(
                records.into_iter().map(|r| (r.name.clone(), r)).collect(),
            )),
            failing_updates: Arc::new(Mutex::new(Vec::new())),
            lookup_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make updates for `name` fail until [`MockDnsProvider::heal`] is called
    pub fn fail_updates_for(&self, name: &str) {
        self.failing_updates.lock().unwrap().push(name.to_string());
    }

    pub fn heal(&self) {
        self.failing_updates.lock().unwrap().clear();
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    /// Number of provider calls of any kind
    pub fn call_count(&self) -> usize {
        self.lookup_count() + self.updates.lock().unwrap().len()
    }

    /// Successful updates, in order
    pub fn updates(&self) -> Vec<DnsRecord> {
        self.updates.lock().unwrap().clone()
    }

    pub fn content_of(&self, name: &str) -> Option<String> {
        self.records.lock().unwrap().get(name).map(|r| r.content.clone())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_a_record(&self, record_name: &str) -> Result<Option<DnsRecord>> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(record_name).cloned())
    }

    async fn update_record(&self, record: &DnsRecord) -> Result<()> {
        if self
            .failing_updates
            .lock()
            .unwrap()
            .iter()
            .any(|n| *n == record.name)
        {
            return Err(Error::provider("mock", "500 Internal Server Error"));
        }
        self.updates.lock().unwrap().push(record.clone());
        self.records
            .lock()
            .unwrap()
            .insert(record.name.clone(), record.clone());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An "A" record with distinctive non-default fields
pub fn a_record(name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: format!("id-{}", name),
        name: name.to_string(),
        record_type: "A".to_string(),
        content: content.to_string(),
        ttl: 120,
        proxied: true,
    }
}

/// Helper to create a minimal UpdaterConfig for testing
pub fn minimal_config(records: &[&str]) -> UpdaterConfig {
    UpdaterConfig {
        router: "192.168.1.1".to_string(),
        credentials: ProviderCredentials {
            email: "admin@example.com".to_string(),
            api_key: "test-key".to_string(),
        },
        zone_id: "zone-123".to_string(),
        records: records.iter().map(|s| s.to_string()).collect(),
        engine: EngineConfig {
            check_interval_secs: 1,
            event_channel_capacity: 100,
            ..EngineConfig::default()
        },
    }
}

pub const OLD_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 1);
pub const NEW_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);
