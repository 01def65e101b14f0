//! Token pair payload returned by the login and refresh endpoints.

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
};

/// `{access_token, refresh_token, token_type}` body issued by `/login` and `/refresh`.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenPair {
	/// Freshly minted access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token; some backends omit it on refresh.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Token type label, normally `bearer`.
	#[serde(default = "default_token_type")]
	pub token_type: String,
}
impl TokenPair {
	/// Converts the payload into a [`Session`], keeping `previous_refresh` when the backend did
	/// not rotate the refresh token.
	pub fn into_session(self, previous_refresh: Option<TokenSecret>) -> Session {
		let refresh_token =
			self.refresh_token.filter(|secret| !secret.is_empty()).or(previous_refresh);

		Session::new(self.access_token, refresh_token)
	}
}

fn default_token_type() -> String {
	"bearer".into()
}
