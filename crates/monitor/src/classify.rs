//! Classification of raw poll outcomes into published health states.

use chirp_api::HealthError;
use chirp_types::{HealthReport, HealthState, HealthStatus};

/// Message published when the per-poll deadline cancelled the request.
pub const TIMEOUT_MESSAGE: &str = "Request timed out contacting the backend";

/// Message published for every other transport or protocol failure.
pub const UNAVAILABLE_MESSAGE: &str = "Backend service is not available";

/// Map one completed poll to the state it publishes.
///
/// First match wins: a parsed report is bucketed by its `status` field
/// (`healthy`, `wait`, `error`, anything else falls through to `fail`), a
/// deadline expiry becomes `fail` with the timeout message, and every other
/// failure becomes `fail` with the unavailable message. The cadence is
/// derived by the [`HealthState`] constructor, never chosen here.
pub fn classify(outcome: Result<HealthReport, HealthError>) -> HealthState {
    match outcome {
        Ok(report) => classify_report(report),
        Err(HealthError::DeadlineExceeded) => HealthState::new(HealthStatus::Fail, TIMEOUT_MESSAGE),
        Err(_) => HealthState::new(HealthStatus::Fail, UNAVAILABLE_MESSAGE),
    }
}

fn classify_report(report: HealthReport) -> HealthState {
    let status = match report.status.as_str() {
        "healthy" => HealthStatus::Ok,
        "wait" => HealthStatus::Wait,
        "error" => HealthStatus::Error,
        _ => HealthStatus::Fail,
    };
    // Backend text is used verbatim; an absent message falls back to the
    // status label so the UI never renders an empty line.
    let message = if report.message.is_empty() {
        status.label().to_string()
    } else {
        report.message
    };
    HealthState::new(status, message)
}
