//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `dmp_client.request` with the
//!   `request` (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `dmp_client_request_total` counter for every
//!   attempt/retry/success/failure, labeled by `request` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Logical operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// API health probe.
	Health,
	/// Text analysis submission.
	Analyze,
	/// PDF upload submission.
	UploadPdf,
	/// Feedback submission.
	Feedback,
	/// Prompt catalog read.
	Prompts,
	/// Bearer token fetch.
	Token,
	/// Untyped request issued through the generic helpers.
	Api,
}
impl RequestKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestKind::Health => "health",
			RequestKind::Analyze => "analyze",
			RequestKind::UploadPdf => "upload_pdf",
			RequestKind::Feedback => "feedback",
			RequestKind::Prompts => "prompts",
			RequestKind::Token => "token",
			RequestKind::Api => "api",
		}
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a client helper.
	Attempt,
	/// A transient failure triggered another attempt.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Retry => "retry",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
