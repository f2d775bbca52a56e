//! Cached bearer credential with skew-adjusted expiry.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::BearerToken};

/// A bearer credential as stored by the cache.
///
/// `expires_at` is already skew-adjusted: it sits [`Credential::EXPIRY_SKEW`] before
/// the server-declared lifetime runs out, so in-flight requests never carry a token
/// that expires mid-call.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// The bearer token itself.
	pub token: BearerToken,
	/// Instant the credential was fetched.
	pub issued_at: OffsetDateTime,
	/// Skew-adjusted expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Safety margin subtracted from the server-declared lifetime.
	pub const EXPIRY_SKEW: Duration = Duration::seconds(300);

	/// Builds a credential from a token-endpoint response observed at `now`.
	///
	/// The effective expiry is `now + expires_in − 300 s`; a lifetime of 300 s or
	/// less therefore yields a credential that is already expired, and every caller
	/// will fetch again. That matches the declared contract exactly, with no
	/// clamping. A lifetime the calendar cannot represent saturates to the far end
	/// in the lifetime's direction instead of overflowing.
	pub fn from_response(
		token: impl Into<String>,
		expires_in_secs: i64,
		now: OffsetDateTime,
	) -> Self {
		let expires_at = now
			.checked_add(Duration::seconds(expires_in_secs))
			.and_then(|instant| instant.checked_sub(Self::EXPIRY_SKEW))
			.unwrap_or(if expires_in_secs >= 0 {
				PrimitiveDateTime::MAX.assume_utc()
			} else {
				PrimitiveDateTime::MIN.assume_utc()
			});

		Self { token: BearerToken::new(token), issued_at: now, expires_at }
	}

	/// Returns `true` when the credential is still usable at the provided instant.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Convenience helper that checks validity against the current UTC instant.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_is_five_minutes_early() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let credential = Credential::from_response("abc", 3600, issued);

		assert_eq!(credential.expires_at, issued + Duration::seconds(3300));
		assert!(credential.is_valid_at(issued + Duration::seconds(3299)));
		assert!(!credential.is_valid_at(issued + Duration::seconds(3300)));
		assert!(!credential.is_valid_at(issued + Duration::seconds(3590)));
	}

	#[test]
	fn extreme_lifetimes_saturate_instead_of_overflowing() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let endless = Credential::from_response("abc", i64::MAX, issued);
		let ancient = Credential::from_response("abc", i64::MIN, issued);

		assert!(endless.is_valid_at(issued + Duration::days(365_000)));
		assert!(!ancient.is_valid_at(issued));
	}

	#[test]
	fn short_lifetimes_expire_immediately() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let credential = Credential::from_response("abc", 300, issued);

		assert!(!credential.is_valid_at(issued));
	}

	#[test]
	fn debug_redacts_the_token() {
		let credential = Credential::from_response("abc", 3600, OffsetDateTime::now_utc());
		let rendered = format!("{credential:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("abc"));
	}
}
