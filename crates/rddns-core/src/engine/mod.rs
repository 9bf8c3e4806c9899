//! Core DDNS engine
//!
//! The UpdaterEngine is responsible for:
//! - Probing the router once per tick
//! - Resolving the public IP when the router is up
//! - Synchronizing DNS records when the IP changed
//! - Sleeping a fixed interval and repeating until shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐   up    ┌──────────────┐  changed  ┌──────────────┐
//! │ ReachabilityProbe │───────▶│  IpResolver  │─────────▶│ DnsProvider  │
//! └───────────────────┘         └──────────────┘           └──────────────┘
//!          │ down                      │ failed / same             │
//!          └───────────────────────────┴───────────────────────────┘
//!                                      ▼
//!                              sleep(interval)
//! ```
//!
//! ## Tick Flow
//!
//! 1. Probe the router; unreachable ends the tick
//! 2. Resolve the public IP; failure ends the tick
//! 3. Same IP as last observed ends the tick
//! 4. Synchronize every record
//! 5. Remember the IP only if no record failed

use crate::config::UpdaterConfig;
use crate::error::Result;
use crate::sync::{self, RecordOutcome, SyncReport};
use crate::traits::{DnsProvider, IpResolver, ReachabilityProbe};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the UpdaterEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        records_count: usize,
    },

    /// Router answered the probe
    RouterReachable {
        rtt: Duration,
    },

    /// Router did not answer the probe
    RouterUnreachable {
        error: String,
    },

    /// Public IP resolved
    IpResolved {
        ip: Ipv4Addr,
    },

    /// Public IP could not be resolved
    ResolutionFailed {
        error: String,
    },

    /// Public IP is the same as the last observed value
    IpUnchanged {
        ip: Ipv4Addr,
    },

    /// DNS record overwritten
    RecordUpdated {
        record_name: String,
        previous: String,
        new_ip: Ipv4Addr,
    },

    /// DNS record already matched
    RecordUnchanged {
        record_name: String,
    },

    /// DNS record does not exist at the provider
    RecordMissing {
        record_name: String,
    },

    /// DNS record lookup or update failed
    RecordFailed {
        record_name: String,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// What one tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Router did not answer; nothing else ran
    RouterUnreachable,
    /// IP echo failed; no provider call ran
    ResolutionFailed,
    /// IP matches the last observed value; no provider call ran
    IpUnchanged(Ipv4Addr),
    /// Records were synchronized against this IP
    Synced {
        ip: Ipv4Addr,
        report: SyncReport,
    },
}

/// Core DDNS engine
///
/// The engine drives the probe → resolve → sync cycle on a fixed interval.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdaterEngine::new()`]
/// 2. Start with [`UpdaterEngine::run_until()`] or [`UpdaterEngine::run_with_shutdown()`]
/// 3. Engine runs until the shutdown future completes
///
/// ## State
///
/// The only state carried between ticks is the last observed public IP,
/// owned by the run loop. Nothing is persisted.
pub struct UpdaterEngine {
    /// Reachability probe for the router
    probe: Box<dyn ReachabilityProbe>,

    /// Public IP resolver
    resolver: Box<dyn IpResolver>,

    /// DNS provider for reading and updating records
    provider: Box<dyn DnsProvider>,

    /// DNS records to manage
    records: Vec<String>,

    /// Sleep between ticks
    check_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl UpdaterEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        probe: Box<dyn ReachabilityProbe>,
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        config: UpdaterConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            probe,
            resolver,
            provider,
            check_interval: config.engine.check_interval(),
            records: config.records,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until `shutdown` completes
    ///
    /// The first tick starts immediately. A tick or sleep that is in progress
    /// when `shutdown` completes is abandoned.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.emit_event(EngineEvent::Started {
            records_count: self.records.len(),
        });
        info!(
            "Starting updater: router {}, {} record(s), every {:?}",
            self.probe.target(),
            self.records.len(),
            self.check_interval
        );

        let mut last_ip: Option<Ipv4Addr> = None;
        tokio::pin!(shutdown);

        loop {
            let cycle = async {
                self.tick(&mut last_ip).await;
                tokio::time::sleep(self.check_interval).await;
            };

            tokio::select! {
                _ = cycle => {}
                _ = &mut shutdown => {
                    info!("Shutting down updater");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Run with a programmatic shutdown channel
    ///
    /// Dropping the sender also stops the engine.
    pub async fn run_with_shutdown(&self, shutdown_rx: tokio::sync::oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Run one tick
    ///
    /// `last_ip` is the last IP for which every record synced without error;
    /// it is advanced only when a sync pass completes.
    pub async fn tick(&self, last_ip: &mut Option<Ipv4Addr>) -> TickOutcome {
        match self.probe.probe().await {
            Ok(rtt) => {
                info!(
                    "Router {} is UP - {:.2} ms",
                    self.probe.target(),
                    rtt.as_secs_f64() * 1000.0
                );
                self.emit_event(EngineEvent::RouterReachable { rtt });
            }
            Err(e) => {
                warn!("Router {} is unreachable: {}", self.probe.target(), e);
                self.emit_event(EngineEvent::RouterUnreachable {
                    error: e.to_string(),
                });
                return TickOutcome::RouterUnreachable;
            }
        }

        let ip = match self.resolver.resolve().await {
            Ok(ip) => {
                debug!("Public IP from {}: {}", self.resolver.endpoint(), ip);
                self.emit_event(EngineEvent::IpResolved { ip });
                ip
            }
            Err(e) => {
                error!("Error fetching current IP: {}", e);
                self.emit_event(EngineEvent::ResolutionFailed {
                    error: e.to_string(),
                });
                return TickOutcome::ResolutionFailed;
            }
        };

        if *last_ip == Some(ip) {
            info!("Public IP has not changed");
            self.emit_event(EngineEvent::IpUnchanged { ip });
            return TickOutcome::IpUnchanged(ip);
        }

        info!(
            "Public IP changed: {} -> {}",
            last_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "None".to_string()),
            ip
        );

        let report = sync::sync_records(self.provider.as_ref(), ip, &self.records).await;
        self.emit_report(ip, &report);

        if report.is_complete() {
            *last_ip = Some(ip);
        } else {
            warn!(
                "{} record(s) failed to sync, retrying next tick",
                report.failed_count()
            );
        }

        TickOutcome::Synced { ip, report }
    }

    fn emit_report(&self, new_ip: Ipv4Addr, report: &SyncReport) {
        for (record_name, outcome) in &report.outcomes {
            let record_name = record_name.clone();
            let event = match outcome {
                RecordOutcome::Updated { previous } => EngineEvent::RecordUpdated {
                    record_name,
                    previous: previous.clone(),
                    new_ip,
                },
                RecordOutcome::Unchanged => EngineEvent::RecordUnchanged { record_name },
                RecordOutcome::Missing => EngineEvent::RecordMissing { record_name },
                RecordOutcome::Failed(e) => EngineEvent::RecordFailed {
                    record_name,
                    error: e.to_string(),
                },
            };
            self.emit_event(event);
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::RecordUpdated {
            record_name: "example.com".to_string(),
            previous: "198.51.100.1".to_string(),
            new_ip: Ipv4Addr::new(203, 0, 113, 7),
        };

        assert_eq!(event.clone(), event);
        assert_ne!(
            event,
            EngineEvent::RecordUnchanged {
                record_name: "example.com".to_string()
            }
        );
    }
}
