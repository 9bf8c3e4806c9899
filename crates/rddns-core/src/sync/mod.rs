//! DNS record synchronizer
//!
//! Brings every configured "A" record in line with the current public IP.
//!
//! ## Per-Record Flow
//!
//! 1. Look up the record by name (type A) in the zone
//! 2. Missing → warn and skip (records are never created)
//! 3. Content differs → overwrite content, keep type/name/ttl/proxied
//! 4. Content matches → no-op
//!
//! Failures are isolated per record: an error on one name is recorded in the
//! report and the remaining names are still evaluated.

use crate::error::Error;
use crate::traits::DnsProvider;
use std::net::Ipv4Addr;
use tracing::{debug, error, info, warn};

/// Outcome for one record in a synchronization pass
#[derive(Debug)]
pub enum RecordOutcome {
    /// Content was overwritten
    Updated {
        /// Content before the update
        previous: String,
    },
    /// Content already matched
    Unchanged,
    /// No "A" record with this name exists in the zone
    Missing,
    /// Lookup or update failed
    Failed(Error),
}

/// Result of one synchronization pass, in record order
#[derive(Debug, Default)]
pub struct SyncReport {
    /// `(record name, outcome)` pairs
    pub outcomes: Vec<(String, RecordOutcome)>,
}

impl SyncReport {
    /// Whether no record failed
    ///
    /// Missing records do not count as failures.
    pub fn is_complete(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, RecordOutcome::Failed(_)))
    }

    /// Number of records that were overwritten
    pub fn updated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RecordOutcome::Updated { .. }))
            .count()
    }

    /// Number of records that failed
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RecordOutcome::Failed(_)))
            .count()
    }

    /// Outcome for a record name, if it was part of the pass
    pub fn outcome(&self, record_name: &str) -> Option<&RecordOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == record_name)
            .map(|(_, outcome)| outcome)
    }
}

/// Synchronize every record name against `current_ip`
pub async fn sync_records(
    provider: &dyn DnsProvider,
    current_ip: Ipv4Addr,
    record_names: &[String],
) -> SyncReport {
    let mut report = SyncReport::default();

    for name in record_names {
        let outcome = match sync_record(provider, current_ip, name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_provider_error() {
                    error!("{} API error for {}: {}", provider.provider_name(), name, e);
                } else {
                    error!("Unexpected error for {}: {}", name, e);
                }
                RecordOutcome::Failed(e)
            }
        };
        report.outcomes.push((name.clone(), outcome));
    }

    debug!(
        "Sync pass finished: {} updated, {} failed, {} total",
        report.updated_count(),
        report.failed_count(),
        report.outcomes.len()
    );

    report
}

async fn sync_record(
    provider: &dyn DnsProvider,
    current_ip: Ipv4Addr,
    name: &str,
) -> Result<RecordOutcome, Error> {
    let Some(record) = provider.find_a_record(name).await? else {
        warn!("No DNS record found for {}", name);
        return Ok(RecordOutcome::Missing);
    };

    let content = current_ip.to_string();
    if record.content == content {
        info!("{} already up-to-date", name);
        return Ok(RecordOutcome::Unchanged);
    }

    info!("Updating {} from {} to {}", name, record.content, content);
    provider.update_record(&record.with_content(content)).await?;
    info!("Updated {} successfully", name);

    Ok(RecordOutcome::Updated {
        previous: record.content,
    })
}
