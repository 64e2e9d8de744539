// self
use crate::obs::{CallOutcome, Operation};

/// Bumps `concertly_client_call_total{operation, outcome}` when the `metrics` feature is on.
pub fn record_call_outcome(operation: Operation, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"concertly_client_call_total",
		"operation" => operation.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (operation, outcome);
}

/// Bumps `concertly_client_refresh_joined_total` for a caller that attached to an in-flight
/// refresh instead of starting one.
pub fn record_refresh_joined() {
	#[cfg(feature = "metrics")]
	metrics::counter!("concertly_client_refresh_joined_total").increment(1);
}
