use std::net::{IpAddr, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{debug, warn};
use serde::Serialize;

use crate::error::PingError;

/// Address reported when the target host cannot be resolved.
pub const FALLBACK_ADDR: &str = "192.168.1.1";

/// How long a best-effort host lookup may block before the prober
/// gives up and falls back to [`FALLBACK_ADDR`].
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

// Simulated rtt baseline in milliseconds. Each iteration within a session
// drifts these by +1.0 ms so repeated runs are reproducible, not random.
const BASE_MIN_MS: f64 = 15.123;
const BASE_AVG_MS: f64 = 16.345;
const BASE_MAX_MS: f64 = 17.678;
const STDDEV_MS: f64 = 0.789;

/// One probe outcome for a single target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// The target of the measurement, as given by the caller.
    pub host: String,
    /// Echo requests sent.
    pub transmitted: u32,
    /// Echo replies received.
    pub received: u32,
    /// Loss percentage, 0.0..=100.0.
    pub packet_loss: f64,
    /// Round-trip minimum in milliseconds.
    pub time_min: f64,
    /// Round-trip average in milliseconds.
    pub time_avg: f64,
    /// Round-trip maximum in milliseconds.
    pub time_max: f64,
    /// Round-trip standard deviation in milliseconds.
    pub time_std_dev: f64,
    /// RFC3339 instant of the measurement.
    pub timestamp: String,
    /// Human-readable transcript mirroring a real ping run. Diagnostic
    /// text only, never machine-parsed.
    pub raw_output: String,
    /// Which prober produced this result.
    pub method: String,
    pub note: String,
    /// Set when host resolution failed and the placeholder address was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Measurement {
    /// Check the shape invariants every prober must uphold.
    pub fn validate(&self) -> Result<(), PingError> {
        if self.host.is_empty() {
            return Err(PingError::InvalidArgument("measurement host is empty".to_string()));
        }
        if self.received > self.transmitted {
            return Err(PingError::InvalidArgument(format!(
                "received {} exceeds transmitted {}",
                self.received, self.transmitted
            )));
        }
        if !(0.0..=100.0).contains(&self.packet_loss) {
            return Err(PingError::InvalidArgument(format!(
                "packet loss {} out of range",
                self.packet_loss
            )));
        }
        if self.time_min > self.time_avg || self.time_avg > self.time_max {
            return Err(PingError::InvalidArgument(format!(
                "rtt ordering violated: min/avg/max = {}/{}/{}",
                self.time_min, self.time_avg, self.time_max
            )));
        }
        if self.time_std_dev < 0.0 {
            return Err(PingError::InvalidArgument(format!(
                "negative stddev {}",
                self.time_std_dev
            )));
        }
        Ok(())
    }
}

/// A prober produces one measurement for a target host.
///
/// `iteration_index` is the number of measurements the owning session has
/// already completed, so a deterministic prober can drift its values per
/// call. Probers hold no per-call state of their own; a real ICMP prober
/// can be dropped in behind this trait later.
pub trait Probe {
    fn measure(&self, host: &str, count: u32, iteration_index: u64) -> Result<Measurement, PingError>;
}

/// The reference prober: a deterministic simulation that sends nothing on
/// the wire. Exactly one packet out of `count` is reported lost and rtt
/// values drift linearly with the iteration index.
pub struct SimProbe {
    // None disables the lookup entirely (used by tests and offline runs).
    resolve_timeout: Option<Duration>,
}

impl Default for SimProbe {
    fn default() -> Self {
        SimProbe {
            resolve_timeout: Some(RESOLVE_TIMEOUT),
        }
    }
}

impl SimProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// A prober that skips host resolution and always reports the
    /// placeholder address. Hermetic, for tests and offline use.
    pub fn without_lookup() -> Self {
        SimProbe { resolve_timeout: None }
    }

    /// Best-effort lookup as a validity check on the host. A failure or
    /// timeout is not fatal; the caller degrades to [`FALLBACK_ADDR`].
    fn resolve(&self, host: &str) -> Option<IpAddr> {
        let timeout = self.resolve_timeout?;

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip);
        }

        // ToSocketAddrs has no timeout of its own, so the lookup runs on a
        // helper thread and we bound the wait here. An unresolvable host
        // must not stall the probe.
        let (tx, rx) = mpsc::channel();
        let target = host.to_string();
        thread::spawn(move || {
            let resolved = (target.as_str(), 0)
                .to_socket_addrs()
                .ok()
                .and_then(|mut addrs| addrs.next())
                .map(|addr| addr.ip());
            let _ = tx.send(resolved);
        });

        match rx.recv_timeout(timeout) {
            Ok(resolved) => resolved,
            Err(_) => {
                debug!("host lookup for {} timed out after {:?}", host, timeout);
                None
            }
        }
    }
}

impl Probe for SimProbe {
    fn measure(&self, host: &str, count: u32, iteration_index: u64) -> Result<Measurement, PingError> {
        if host.is_empty() {
            return Err(PingError::InvalidArgument("host must not be empty".to_string()));
        }
        if count == 0 {
            return Err(PingError::InvalidArgument(
                "count must be a positive integer".to_string(),
            ));
        }

        let (addr, warning) = match self.resolve(host) {
            Some(ip) => (ip.to_string(), None),
            None => {
                if self.resolve_timeout.is_some() {
                    warn!("could not resolve {}, using placeholder address", host);
                    (
                        FALLBACK_ADDR.to_string(),
                        Some(format!("host {} did not resolve; reported address is a placeholder", host)),
                    )
                } else {
                    (FALLBACK_ADDR.to_string(), None)
                }
            }
        };

        let transmitted = count;
        // Exactly one simulated drop. count == 1 degenerates to zero
        // replies and 100% loss.
        let received = count.saturating_sub(1);
        let packet_loss = 100.0 * f64::from(transmitted - received) / f64::from(transmitted);

        let drift = iteration_index as f64;
        let time_min = BASE_MIN_MS + drift;
        let time_avg = BASE_AVG_MS + drift;
        let time_max = BASE_MAX_MS + drift;

        let raw_output = transcript(host, &addr, count, received, packet_loss, time_min, time_avg, time_max);

        Ok(Measurement {
            host: host.to_string(),
            transmitted,
            received,
            packet_loss,
            time_min,
            time_avg,
            time_max,
            time_std_dev: STDDEV_MS,
            timestamp: Local::now().to_rfc3339(),
            raw_output,
            method: "simulation (fallback)".to_string(),
            note: "This is a simulated result because real ping is not available".to_string(),
            warning,
        })
    }
}

/// Build a transcript shaped like a real ping-command report, derived
/// entirely from the simulated numbers.
#[allow(clippy::too_many_arguments)]
fn transcript(
    host: &str,
    addr: &str,
    count: u32,
    received: u32,
    packet_loss: f64,
    time_min: f64,
    time_avg: f64,
    time_max: f64,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("PING {} ({}) 56(84) bytes of data.\n", host, addr));
    for seq in 1..=count {
        // The last request is the simulated drop, so it prints no reply line.
        if seq < count {
            let t = time_min + f64::from(seq) / f64::from(count) * (time_max - time_min);
            out.push_str(&format!(
                "64 bytes from {}: icmp_seq={} ttl=64 time={:.1} ms\n",
                addr, seq, t
            ));
        }
    }

    out.push_str(&format!("\n--- {} ping statistics ---\n", host));
    out.push_str(&format!(
        "{} packets transmitted, {} received, {:.1}% packet loss, time {}ms\n",
        count,
        received,
        packet_loss,
        (time_avg * f64::from(count)) as i64
    ));
    out.push_str(&format!(
        "rtt min/avg/max/mdev = {:.3}/{:.3}/{:.3}/{:.3} ms\n",
        time_min, time_avg, time_max, STDDEV_MS
    ));

    out
}
