//! A ping diagnostic with a deterministic simulated prober.
//!
//! The [`probe::Probe`] trait produces one latency/loss measurement per
//! call; [`session::Session`] wraps a prober with iteration state so
//! repeated calls accumulate a bounded history of past results.

pub mod error;
pub mod probe;
pub mod session;
