//! Retry budgets and backoff schedules.
//!
//! A logical request moves through `Pending → (Success | Retrying → Pending |
//! Exhausted-Failure)`: the attempt loop in [`client`](crate::client) drives the
//! transitions, [`FailureClass`] decides whether `Retrying` may be entered, and
//! [`RetryPolicy`] bounds how many times and how long to wait in between.

// self
use crate::{_prelude::*, config::Settings};

/// Classification of a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
	/// Transient failure (5xx, timeout, transport); another attempt may follow.
	Retryable,
	/// Client or configuration failure that would recur identically; surface now.
	Fatal,
}

/// Bounds for one logical request: attempt budget, per-attempt timeout, and the
/// capped exponential backoff inserted between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum automatic retries after the first attempt.
	pub max_retries: u32,
	/// Timeout applied to each individual attempt.
	pub attempt_timeout: StdDuration,
	/// Base delay doubled on every retry.
	pub backoff_base: StdDuration,
	/// Upper bound on any single backoff delay.
	pub backoff_cap: StdDuration,
}
impl RetryPolicy {
	const BACKOFF_CAP: StdDuration = StdDuration::from_secs(10);

	/// Policy for API requests: the configured budget/timeout with a 1 s backoff
	/// base, yielding delays of 2 s, 4 s, 8 s, then capped at 10 s.
	pub fn api(settings: &Settings) -> Self {
		Self {
			max_retries: settings.max_retries,
			attempt_timeout: settings.timeout,
			backoff_base: StdDuration::from_secs(1),
			backoff_cap: Self::BACKOFF_CAP,
		}
	}

	/// Policy for token fetches: 2 retries, 5 s per attempt, and a 500 ms backoff
	/// base so the delays come out as the 1 s / 2 s ladder.
	pub fn token() -> Self {
		Self {
			max_retries: 2,
			attempt_timeout: StdDuration::from_secs(5),
			backoff_base: StdDuration::from_millis(500),
			backoff_cap: Self::BACKOFF_CAP,
		}
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, retries: u32) -> Self {
		self.max_retries = retries;

		self
	}

	/// Overrides the per-attempt timeout.
	pub fn with_attempt_timeout(mut self, timeout: StdDuration) -> Self {
		self.attempt_timeout = timeout;

		self
	}

	/// Overrides the backoff base; tests shrink it to keep wall-clock time bounded.
	pub fn with_backoff_base(mut self, base: StdDuration) -> Self {
		self.backoff_base = base;

		self
	}

	/// Returns the delay to wait before retry number `retry` (1-based):
	/// `min(backoff_base · 2^retry, backoff_cap)`.
	pub fn backoff_delay(&self, retry: u32) -> StdDuration {
		let doubling = 1u32.checked_shl(retry).unwrap_or(u32::MAX);

		self.backoff_base.saturating_mul(doubling).min(self.backoff_cap)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn api_policy() -> RetryPolicy {
		RetryPolicy::api(&Settings::builder().build().expect("Default settings should build."))
	}

	#[test]
	fn api_backoff_ladder_doubles_then_caps() {
		let policy = api_policy();

		assert_eq!(policy.backoff_delay(1), StdDuration::from_millis(2_000));
		assert_eq!(policy.backoff_delay(2), StdDuration::from_millis(4_000));
		assert_eq!(policy.backoff_delay(3), StdDuration::from_millis(8_000));
		assert_eq!(policy.backoff_delay(4), StdDuration::from_millis(10_000));
		assert_eq!(policy.backoff_delay(40), StdDuration::from_millis(10_000));
	}

	#[test]
	fn token_backoff_ladder_is_one_then_two_seconds() {
		let policy = RetryPolicy::token();

		assert_eq!(policy.max_retries, 2);
		assert_eq!(policy.backoff_delay(1), StdDuration::from_millis(1_000));
		assert_eq!(policy.backoff_delay(2), StdDuration::from_millis(2_000));
	}

	#[test]
	fn overrides_replace_single_fields() {
		let policy = api_policy()
			.with_max_retries(1)
			.with_attempt_timeout(StdDuration::from_millis(50))
			.with_backoff_base(StdDuration::from_millis(1));

		assert_eq!(policy.max_retries, 1);
		assert_eq!(policy.attempt_timeout, StdDuration::from_millis(50));
		assert_eq!(policy.backoff_delay(1), StdDuration::from_millis(2));
	}
}
