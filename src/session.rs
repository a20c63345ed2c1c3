use std::collections::VecDeque;
use std::time::Instant;

use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::error::PingError;
use crate::probe::{Measurement, Probe, SimProbe};

/// Packet count used when the request omits `count`.
pub const DEFAULT_COUNT: u32 = 4;

/// Oldest entries are evicted past this bound so a long-lived session
/// cannot grow without limit. The iteration counter keeps counting.
pub const HISTORY_CAP: usize = 100;

/// A validated execute request. Built once from the loosely-typed JSON
/// parameter object at the boundary; everything past this point is
/// strongly typed.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub host: String,
    pub count: u32,
    pub continue_to_iterate: bool,
}

impl ExecuteRequest {
    /// Validate a JSON parameter object (`{"host": ..., "count": ...,
    /// "continueToIterate": ...}`) into a typed request.
    ///
    /// A missing `host` is `MissingField`; a present-but-wrong-typed
    /// value is `InvalidArgument`. A missing `count` defaults to
    /// [`DEFAULT_COUNT`], but a count that is not a positive integer is
    /// rejected rather than silently coerced.
    pub fn from_value(params: &Value) -> Result<Self, PingError> {
        let obj = params
            .as_object()
            .ok_or_else(|| PingError::InvalidArgument("parameters must be a JSON object".to_string()))?;

        let host = match obj.get("host") {
            None | Some(Value::Null) => {
                return Err(PingError::MissingField("host".to_string()));
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(PingError::InvalidArgument(format!(
                    "host must be a string, got {}",
                    other
                )));
            }
        };

        let count = match obj.get("count") {
            None | Some(Value::Null) => DEFAULT_COUNT,
            Some(Value::Number(n)) => parse_count(n)?,
            Some(other) => {
                return Err(PingError::InvalidArgument(format!(
                    "count must be a positive integer, got {}",
                    other
                )));
            }
        };

        let continue_to_iterate = match obj.get("continueToIterate") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(PingError::InvalidArgument(format!(
                    "continueToIterate must be a boolean, got {}",
                    other
                )));
            }
        };

        Ok(ExecuteRequest {
            host,
            count,
            continue_to_iterate,
        })
    }
}

fn parse_count(n: &serde_json::Number) -> Result<u32, PingError> {
    // JSON encoders routinely emit integral floats (4.0), so accept those;
    // anything fractional, zero, or negative is a caller bug.
    let as_int = n
        .as_u64()
        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64));

    match as_int {
        Some(v) if v >= 1 => u32::try_from(v)
            .map_err(|_| PingError::InvalidArgument(format!("count {} is too large", v))),
        _ => Err(PingError::InvalidArgument(format!(
            "count must be a positive integer, got {}",
            n
        ))),
    }
}

/// Reduced record of a past measurement, kept for summary display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub iteration: u64,
    pub timestamp: String,
    pub host: String,
    pub packet_loss: f64,
    pub time_avg: f64,
}

/// Capability flags and the one-line summary attached to iteration results.
#[derive(Debug, Clone, Serialize)]
pub struct IterationData {
    pub can_iterate: bool,
    pub supports_iteration: bool,
    pub iteration_summary: String,
}

/// A measurement enriched with session state after an iteration-mode call.
#[derive(Debug, Clone, Serialize)]
pub struct IterationReport {
    #[serde(flatten)]
    pub measurement: Measurement,
    #[serde(rename = "iterationCount")]
    pub iteration_count: u64,
    #[serde(rename = "elapsedTime")]
    pub elapsed_time: String,
    pub iteration_data: IterationData,
    /// Reduced records of the iterations before this one, in call order.
    /// Present only once there is at least one past entry to show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

/// Outcome of [`Session::execute`]. Single-shot calls return the bare
/// measurement; iteration-mode calls return the enriched report.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecuteResponse {
    Single(Measurement),
    Iteration(Box<IterationReport>),
}

/// Process-lifetime wrapper around a prober that accumulates iteration
/// state. Sessions are explicit values owned by the caller; independent
/// sessions never share state. A caller sharing one session across
/// threads wraps it in a `Mutex` and serializes `execute` calls.
pub struct Session<P: Probe = SimProbe> {
    probe: P,
    started: Instant,
    iterations: u64,
    history: VecDeque<Measurement>,
}

impl Session<SimProbe> {
    /// A session backed by the deterministic simulated prober.
    pub fn simulated() -> Self {
        Session::new(SimProbe::new())
    }
}

impl<P: Probe> Session<P> {
    pub fn new(probe: P) -> Self {
        Session {
            probe,
            started: Instant::now(),
            iterations: 0,
            history: VecDeque::new(),
        }
    }

    /// Completed iteration-mode calls so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Stored copies of past iteration results, oldest first.
    pub fn history(&self) -> &VecDeque<Measurement> {
        &self.history
    }

    /// Run one diagnostic call.
    ///
    /// Single-shot requests leave the session untouched. Iteration-mode
    /// requests merge the result into session state and return it
    /// enriched with the counter, elapsed time, and a history summary.
    /// State is only mutated after the probe succeeds, so a failed call
    /// leaves no partial update behind.
    pub fn execute(&mut self, request: &ExecuteRequest) -> Result<ExecuteResponse, PingError> {
        let measurement = self
            .probe
            .measure(&request.host, request.count, self.iterations)?;
        measurement.validate()?;

        if !request.continue_to_iterate {
            return Ok(ExecuteResponse::Single(measurement));
        }

        self.iterations += 1;

        // The stored entry is an owned copy: mutating the returned report
        // later must never reach back into history.
        self.history.push_back(measurement.clone());
        if self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        let summary = format!(
            "Iteration {}: {} - {:.1}% loss, avg {:.1} ms",
            self.iterations, measurement.host, measurement.packet_loss, measurement.time_avg
        );
        info!("{}", summary);

        let history = if self.history.len() > 1 {
            let past = self.history.len() - 1;
            Some(
                self.history
                    .iter()
                    .take(past)
                    .enumerate()
                    .map(|(i, m)| HistoryEntry {
                        iteration: i as u64 + 1,
                        timestamp: m.timestamp.clone(),
                        host: m.host.clone(),
                        packet_loss: m.packet_loss,
                        time_avg: m.time_avg,
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(ExecuteResponse::Iteration(Box::new(IterationReport {
            measurement,
            iteration_count: self.iterations,
            elapsed_time: format!("{:?}", self.started.elapsed()),
            iteration_data: IterationData {
                can_iterate: true,
                supports_iteration: true,
                iteration_summary: summary,
            },
            history,
        })))
    }
}
