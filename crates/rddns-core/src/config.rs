//! Configuration types for the DDNS updater
//!
//! The configuration is read once at startup from environment variables and
//! then passed explicitly to every component. Loading is fail-fast: the first
//! missing required variable is reported by name.

use crate::error::{Error, Result};
use std::time::Duration;

/// Router address to probe
pub const ENV_ROUTER_IP: &str = "ROUTER_IP";
/// Cloudflare account email
pub const ENV_CF_API_EMAIL: &str = "CF_API_EMAIL";
/// Cloudflare global API key
pub const ENV_CF_API_KEY: &str = "CF_API_KEY";
/// Cloudflare zone identifier
pub const ENV_CF_ZONE_ID: &str = "CF_ZONE_ID";
/// Comma-separated list of record names
pub const ENV_CF_RECORDS: &str = "CF_RECORDS";
/// Base domain used when no explicit record list is given
pub const ENV_DOMAIN_NAME: &str = "DOMAIN_NAME";
/// Seconds between ticks
pub const ENV_CHECK_INTERVAL_SECS: &str = "DDNS_CHECK_INTERVAL_SECS";
/// Ping timeout in milliseconds
pub const ENV_PROBE_TIMEOUT_MS: &str = "DDNS_PROBE_TIMEOUT_MS";
/// IP echo endpoint
pub const ENV_IP_ECHO_URL: &str = "DDNS_IP_ECHO_URL";
/// IP echo request timeout in seconds
pub const ENV_RESOLVE_TIMEOUT_SECS: &str = "DDNS_RESOLVE_TIMEOUT_SECS";
/// `live` or `dry-run`
pub const ENV_MODE: &str = "DDNS_MODE";

/// Subdomains derived from `DOMAIN_NAME`, in order ("" is the apex)
const DERIVED_SUBDOMAINS: &[&str] = &["", "www", "images"];

/// Main updater configuration
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Router host or IP address to probe
    pub router: String,

    /// DNS provider credentials
    pub credentials: ProviderCredentials,

    /// Zone holding the records
    pub zone_id: String,

    /// Record names to keep in sync, in evaluation order
    pub records: Vec<String>,

    /// Engine settings
    pub engine: EngineConfig,
}

impl UpdaterConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    ///
    /// Values are trimmed; a variable that is unset or blank counts as missing.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &str| get(name).ok_or_else(|| Error::missing_variable(name));

        let router = require(ENV_ROUTER_IP)?;
        let credentials = ProviderCredentials {
            email: require(ENV_CF_API_EMAIL)?,
            api_key: require(ENV_CF_API_KEY)?,
        };
        let zone_id = require(ENV_CF_ZONE_ID)?;

        let explicit = get(ENV_CF_RECORDS)
            .map(|list| parse_record_list(&list))
            .unwrap_or_default();
        let records = if explicit.is_empty() {
            derive_records(&require(ENV_DOMAIN_NAME)?)
        } else {
            explicit
        };

        let mut engine = EngineConfig::default();
        if let Some(raw) = get(ENV_CHECK_INTERVAL_SECS) {
            engine.check_interval_secs = parse_in_range(ENV_CHECK_INTERVAL_SECS, &raw, 1, 86_400)?;
        }
        if let Some(raw) = get(ENV_PROBE_TIMEOUT_MS) {
            engine.probe_timeout_ms = parse_in_range(ENV_PROBE_TIMEOUT_MS, &raw, 100, 10_000)?;
        }
        if let Some(raw) = get(ENV_RESOLVE_TIMEOUT_SECS) {
            engine.resolve_timeout_secs = parse_in_range(ENV_RESOLVE_TIMEOUT_SECS, &raw, 1, 60)?;
        }
        if let Some(url) = get(ENV_IP_ECHO_URL) {
            engine.ip_echo_url = url;
        }
        if let Some(mode) = get(ENV_MODE) {
            engine.mode = mode.parse()?;
        }

        let config = Self {
            router,
            credentials,
            zone_id,
            records,
            engine,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.router.is_empty() {
            return Err(Error::missing_variable(ENV_ROUTER_IP));
        }
        self.credentials.validate()?;
        if self.zone_id.is_empty() {
            return Err(Error::missing_variable(ENV_CF_ZONE_ID));
        }
        if self.records.is_empty() {
            return Err(Error::config("No records configured"));
        }
        for record in &self.records {
            validate_domain_name(record)?;
        }
        self.engine.validate()
    }
}

/// Credentials for the DNS provider
///
/// The `Debug` implementation never prints the API key.
#[derive(Clone)]
pub struct ProviderCredentials {
    /// Account email
    pub email: String,
    /// API key
    pub api_key: String,
}

impl ProviderCredentials {
    /// Validate the credentials
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(Error::missing_variable(ENV_CF_API_EMAIL));
        }
        if self.api_key.is_empty() {
            return Err(Error::missing_variable(ENV_CF_API_KEY));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Whether provider writes are sent or only logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Updates are sent to the provider
    #[default]
    Live,
    /// Reads happen, updates are only logged
    DryRun,
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "live" => Ok(Mode::Live),
            "dry-run" | "dry_run" | "dryrun" => Ok(Mode::DryRun),
            other => Err(Error::config(format!(
                "{} '{}' is not valid. Valid modes: live, dry-run",
                ENV_MODE, other
            ))),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Live => f.write_str("live"),
            Mode::DryRun => f.write_str("dry-run"),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seconds to sleep between ticks
    pub check_interval_secs: u64,

    /// Reachability probe timeout in milliseconds
    pub probe_timeout_ms: u64,

    /// URL returning the caller's public IPv4 address as plain text
    pub ip_echo_url: String,

    /// IP echo request timeout in seconds
    pub resolve_timeout_secs: u64,

    /// Live or dry-run
    pub mode: Mode,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning log.
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Interval between ticks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Timeout for one reachability probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Timeout for one IP echo request
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(Error::config("Check interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        if !self.ip_echo_url.starts_with("https://") && !self.ip_echo_url.starts_with("http://") {
            return Err(Error::config(format!(
                "{} must use HTTP or HTTPS scheme. Got: {}",
                ENV_IP_ECHO_URL, self.ip_echo_url
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            ip_echo_url: default_ip_echo_url(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            mode: Mode::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_check_interval_secs() -> u64 {
    60
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_ip_echo_url() -> String {
    "https://ifconfig.me/ip".to_string()
}

fn default_resolve_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Split a comma-separated record list, dropping blank entries
///
/// A trailing root dot is dropped so `example.com.` and `example.com` name the
/// same record at the provider.
pub fn parse_record_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| strip_root_dot(s.trim()).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_root_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Record names managed for a base domain: the apex, `www.` and `images.`
pub fn derive_records(domain: &str) -> Vec<String> {
    let domain = strip_root_dot(domain);
    DERIVED_SUBDOMAINS
        .iter()
        .map(|sub| {
            if sub.is_empty() {
                domain.to_string()
            } else {
                format!("{}.{}", sub, domain)
            }
        })
        .collect()
}

fn parse_in_range(name: &str, raw: &str, min: u64, max: u64) -> Result<u64> {
    let value: u64 = raw
        .parse()
        .map_err(|_| Error::config(format!("{} must be an integer. Got: {}", name, raw)))?;
    if !(min..=max).contains(&value) {
        return Err(Error::config(format!(
            "{} must be between {} and {}. Got: {}",
            name, min, max, value
        )));
    }
    Ok(value)
}

/// Validate that a string is a usable DNS record name
///
/// Length limits follow RFC 1035. Labels may hold letters, digits, hyphens and
/// underscores (`_acme-challenge`); a lone `*` is allowed as the first label.
/// One trailing root dot is accepted.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    let name = strip_root_dot(domain);
    if name.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if name.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            name.len(),
            domain
        )));
    }

    for (index, label) in name.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label == "*" {
            if index == 0 {
                continue;
            }
            return Err(Error::config(format!(
                "Wildcard label must come first. Got: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
