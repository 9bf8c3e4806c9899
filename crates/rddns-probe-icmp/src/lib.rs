// # ICMP Reachability Probe
//
// This crate provides the router reachability check for the DDNS updater.
//
// ## Implementation
//
// One ICMP echo request per probe, sent from the blocking pool through a
// `socket2` socket:
// 1. Unprivileged ICMP datagram socket (Linux `ping_group_range`, macOS)
// 2. Raw ICMP socket as a fallback (requires CAP_NET_RAW or root)
//
// Replies are matched on sequence number (and identifier on raw sockets,
// where the kernel does not rewrite it). Anything else that arrives before
// the deadline is ignored.
//
// ## Platform Support
//
// IPv4 only. Hostnames are resolved on every probe so DHCP-assigned
// router names keep working.

use rddns_core::config::UpdaterConfig;
use rddns_core::traits::ReachabilityProbe;
use rddns_core::{Error, Result};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{ErrorKind, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

const ICMP_ECHO_REQUEST: u8 = 8;
const ICMP_ECHO_REPLY: u8 = 0;
const ICMP_HEADER_LEN: usize = 8;

/// Payload carried in every echo request
const PAYLOAD: &[u8] = b"rddns-probe-icmp";

/// ICMP echo probe bound to one router
#[derive(Debug)]
pub struct IcmpProbe {
    /// Router hostname or IPv4 literal
    host: String,

    /// Time to wait for the echo reply
    timeout: Duration,

    /// Echo identifier (only honored on raw sockets)
    ident: u16,

    /// Next echo sequence number
    sequence: AtomicU16,
}

impl IcmpProbe {
    /// Create a probe for `host`
    ///
    /// # Parameters
    ///
    /// - `host`: Router hostname or IPv4 literal
    /// - `timeout`: Time to wait for the reply
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(Error::config("Router host cannot be empty"));
        }
        if timeout.is_zero() {
            return Err(Error::config("Probe timeout must be greater than zero"));
        }

        Ok(Self {
            host: host.trim().to_string(),
            timeout,
            ident: (std::process::id() & 0xffff) as u16,
            sequence: AtomicU16::new(1),
        })
    }

    /// Create a probe from the updater configuration
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        Self::new(config.router.clone(), config.engine.probe_timeout())
    }

    async fn resolve_target(&self) -> Result<Ipv4Addr> {
        if let Ok(addr) = self.host.parse::<Ipv4Addr>() {
            return Ok(addr);
        }

        let addrs = tokio::net::lookup_host((self.host.as_str(), 0))
            .await
            .map_err(|e| Error::unreachable(format!("Cannot resolve {}: {}", self.host, e)))?;

        addrs
            .filter_map(|addr| match addr.ip() {
                std::net::IpAddr::V4(v4) => Some(v4),
                std::net::IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| Error::unreachable(format!("No IPv4 address for {}", self.host)))
    }
}

#[async_trait::async_trait]
impl ReachabilityProbe for IcmpProbe {
    async fn probe(&self) -> Result<Duration> {
        let addr = self.resolve_target().await?;
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let ident = self.ident;
        let timeout = self.timeout;

        tracing::debug!("Sending ICMP echo to {} ({}), seq={}", self.host, addr, seq);

        let ping = tokio::task::spawn_blocking(move || echo(addr, ident, seq, timeout));

        // Backstop in case the socket ignores its read timeout
        match tokio::time::timeout(timeout + Duration::from_millis(500), ping).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::unreachable(format!("Probe task failed: {}", e))),
            Err(_) => Err(Error::unreachable(format!(
                "{} did not answer within {} ms",
                self.host,
                timeout.as_millis()
            ))),
        }
    }

    fn target(&self) -> &str {
        &self.host
    }
}

/// Which socket flavor carried the echo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketKind {
    Datagram,
    Raw,
}

fn open_socket() -> Result<(Socket, SocketKind)> {
    match Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4)) {
        Ok(socket) => Ok((socket, SocketKind::Datagram)),
        Err(dgram_err) => Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map(|socket| (socket, SocketKind::Raw))
            .map_err(|raw_err| {
                Error::unreachable(format!(
                    "Cannot open ICMP socket (datagram: {}, raw: {})",
                    dgram_err, raw_err
                ))
            }),
    }
}

/// Send one echo request and wait for the matching reply
fn echo(addr: Ipv4Addr, ident: u16, seq: u16, timeout: Duration) -> Result<Duration> {
    let (socket, kind) = open_socket()?;
    let target = SockAddr::from(SocketAddrV4::new(addr, 0));

    socket
        .connect(&target)
        .map_err(|e| Error::unreachable(format!("Cannot connect to {}: {}", addr, e)))?;

    let request = build_echo_request(ident, seq, PAYLOAD);
    let started = Instant::now();
    let deadline = started + timeout;

    socket
        .send(&request)
        .map_err(|e| Error::unreachable(format!("Cannot send echo to {}: {}", addr, e)))?;

    let mut buf = [0u8; 1024];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::unreachable(format!(
                "{} did not answer within {} ms",
                addr,
                timeout.as_millis()
            )));
        }

        socket
            .set_read_timeout(Some(remaining))
            .map_err(|e| Error::unreachable(format!("Cannot set socket timeout: {}", e)))?;

        let len = match (&socket).read(&mut buf) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::unreachable(format!("Receive from {} failed: {}", addr, e)));
            }
        };

        let expected_ident = match kind {
            SocketKind::Raw => Some(ident),
            // The kernel rewrites the identifier on datagram sockets
            SocketKind::Datagram => None,
        };

        if is_matching_reply(&buf[..len], expected_ident, seq) {
            return Ok(started.elapsed());
        }
    }
}

/// RFC 1071 internet checksum
fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn build_echo_request(ident: u16, seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ICMP_HEADER_LEN + payload.len());
    packet.push(ICMP_ECHO_REQUEST);
    packet.push(0);
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&ident.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(payload);

    let sum = checksum(&packet);
    packet[2..4].copy_from_slice(&sum.to_be_bytes());
    packet
}

/// Strip a leading IPv4 header if present
///
/// Raw sockets (and datagram sockets on macOS) deliver the IP header; Linux
/// datagram sockets deliver the bare ICMP message.
fn icmp_payload(packet: &[u8]) -> Option<&[u8]> {
    let first = *packet.first()?;
    if first >> 4 == 4 {
        let header_len = usize::from(first & 0x0f) * 4;
        if header_len < 20 {
            return None;
        }
        packet.get(header_len..)
    } else {
        Some(packet)
    }
}

fn is_matching_reply(packet: &[u8], ident: Option<u16>, seq: u16) -> bool {
    let Some(icmp) = icmp_payload(packet) else {
        return false;
    };
    if icmp.len() < ICMP_HEADER_LEN || icmp[0] != ICMP_ECHO_REPLY {
        return false;
    }

    let reply_ident = u16::from_be_bytes([icmp[4], icmp[5]]);
    let reply_seq = u16::from_be_bytes([icmp[6], icmp[7]]);

    reply_seq == seq && ident.is_none_or(|id| id == reply_ident)
}
