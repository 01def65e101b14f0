//! Session entity tracked by the session store.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, jwt},
};

/// Lifecycle status for a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
	/// No expiry is known, or the expiry lies in the future.
	Active,
	/// The access token's expiry instant has been reached.
	Expired,
}

/// Access/refresh token pair plus the access token's expiry.
///
/// Sessions are created by a successful login, replaced by a successful refresh, and cleared on
/// logout. `expires_at` mirrors the access token's `exp` claim and stays unset for opaque tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
	/// Bearer credential attached to API calls.
	pub access_token: TokenSecret,
	/// Credential exchanged for a new access token.
	pub refresh_token: Option<TokenSecret>,
	/// Instant at which the access token stops being valid.
	pub expires_at: Option<OffsetDateTime>,
}
impl Session {
	/// Builds a session, deriving `expires_at` from the access token's `exp` claim.
	pub fn new(access_token: TokenSecret, refresh_token: Option<TokenSecret>) -> Self {
		let expires_at = jwt::expiry_claim(access_token.expose());

		Self { access_token, refresh_token, expires_at }
	}

	/// Overrides the expiry instant.
	pub fn with_expires_at(mut self, instant: Option<OffsetDateTime>) -> Self {
		self.expires_at = instant;

		self
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, now: OffsetDateTime) -> SessionStatus {
		match self.expires_at {
			Some(expires_at) if now >= expires_at => SessionStatus::Expired,
			_ => SessionStatus::Active,
		}
	}

	/// Returns `true` once `now >= expires_at`; sessions without an expiry never expire.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		matches!(self.status_at(now), SessionStatus::Expired)
	}

	/// Checks expiry against the current UTC clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Expiry as epoch milliseconds.
	pub fn expires_at_millis(&self) -> Option<i64> {
		self.expires_at.map(|instant| (instant.unix_timestamp_nanos() / 1_000_000) as i64)
	}

	/// Returns `true` when a refresh token is available.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
