//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run every operation inside a `concertly_client.call` span carrying the
//!   `operation` and `stage` fields; fetch spans also record the bearer's fingerprint in
//!   `credential`.
//! - Enable `metrics` to increment the `concertly_client_call_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`, and
//!   `concertly_client_refresh_joined_total` for every caller that joins a refresh in flight.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Authenticated API call, including its refresh-and-retry cycle.
	Fetch,
	/// Single-flight session refresh.
	Refresh,
	/// Storing a freshly issued credential set.
	SignIn,
	/// Clearing the stored credential set.
	SignOut,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Fetch => "fetch",
			Operation::Refresh => "refresh",
			Operation::SignIn => "sign_in",
			Operation::SignOut => "sign_out",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}

	/// Maps a finished result onto its outcome label.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		match result {
			Ok(_) => CallOutcome::Success,
			Err(_) => CallOutcome::Failure,
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
