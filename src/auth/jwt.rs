//! Minimal JWT payload inspection used to derive session expiry.
//!
//! Signatures are not verified; the backend remains the authority on validity. The `exp`
//! claim only tells the client when to stop trusting a cached token.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

#[derive(Deserialize)]
struct Claims {
	exp: Option<serde_json::Number>,
}

/// Returns the instant encoded in the token's `exp` claim, if the token is a decodable JWT.
pub fn expiry_claim(token: &str) -> Option<OffsetDateTime> {
	let mut segments = token.split('.');
	let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

	if segments.next().is_some() {
		return None;
	}

	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claims: Claims = serde_json::from_slice(&bytes).ok()?;
	let exp = claims.exp?;
	let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|value| value.floor() as i64))?;

	OffsetDateTime::from_unix_timestamp(seconds).ok()
}
