//! Adaptive health monitoring for the chat backend.
//!
//! [`HealthMonitor`] owns a single repeating poll loop. Each tick performs one
//! bounded health check, classifies the outcome into a [`HealthState`], and
//! publishes it over a watch channel before arming the next tick at the
//! cadence the new state carries. The UI subscribes read-only and derives
//! chat availability from the latest status.
//!
//! ## Design
//! - [`classify`] is a pure function from a poll outcome to a state, tested
//!   without any timers.
//! - [`HealthMonitor`] owns the timer lifecycle: one loop task, one pending
//!   sleep at a time, a root `CancellationToken` for shutdown and a child
//!   token per poll for the 7 s deadline.
//! - [`HealthProbe`] is the seam between the loop and the network, so the
//!   loop is exercised in tests against scripted probes under paused time.

mod classify;
mod monitor;
mod probe;

pub use classify::{TIMEOUT_MESSAGE, UNAVAILABLE_MESSAGE, classify};
pub use monitor::{HealthMonitor, REQUEST_DEADLINE, check_now};
pub use probe::HealthProbe;

pub use chirp_types::{HealthState, HealthStatus};
