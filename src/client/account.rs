//! Typed helpers: credential login, profile lookup, and generic JSON calls.

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenPair},
	client::{
		ApiClient,
		request::{AuthHeader, RequestOptions},
	},
	http::{self, ApiHttpClient, ApiResponse},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

const LOGIN_FAILED: &str = "Login failed.";
const PROFILE_FAILED: &str = "Failed to load profile.";
const REQUEST_FAILED: &str = "Request failed.";

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Exchanges credentials for a session and stores it.
	///
	/// The login endpoint is called without a bearer token and without 401 recovery.
	pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let url = self.config.resolve(&self.config.endpoints.login)?;
				let request = RequestOptions::post()
					.header(ACCEPT, HeaderValue::from_static("application/json"))
					.form([("username", username), ("password", password)])
					.to_request(&url, None, AuthHeader::Omit)?;
				let response = self.http_client.send(request).await?;

				ensure_success(&response, LOGIN_FAILED)?;

				let session = http::decode_json::<TokenPair>(&response)?.into_session(None);

				self.store.set(session.clone()).await?;

				Ok(session)
			})
			.await;

		record(KIND, &result);

		result
	}

	/// Loads the signed-in account's profile.
	pub async fn profile<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Profile;

		let span = FlowSpan::new(KIND, "profile");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(self.fetch_json(
				&self.config.endpoints.profile,
				RequestOptions::get(),
				PROFILE_FAILED,
			))
			.await;

		record(KIND, &result);

		result
	}

	/// Sends an authenticated request with 401 recovery and decodes a JSON success body.
	///
	/// Non-2xx statuses become [`Error::Api`] with the backend's `message` or `detail`.
	pub async fn call_json<T>(&self, endpoint: &str, options: RequestOptions) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.fetch_json(endpoint, options, REQUEST_FAILED).await
	}

	async fn fetch_json<T>(
		&self,
		endpoint: &str,
		options: RequestOptions,
		fallback: &str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let options = if options.headers.contains_key(ACCEPT) {
			options
		} else {
			options.header(ACCEPT, HeaderValue::from_static("application/json"))
		};
		let response = self.execute_with_auth_recovery(endpoint, options).await?;

		ensure_success(&response, fallback)?;

		Ok(http::decode_json(&response)?)
	}
}

/// Extracts a human-readable error from a backend error body.
///
/// Looks at `message` first, then `detail`, which may be a string or a list of validation
/// entries carrying `msg`. Returns `fallback` when neither is usable.
pub fn error_message(body: &[u8], fallback: &str) -> String {
	let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
		return fallback.to_owned();
	};
	let non_blank = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_owned());

	if let Some(message) = value.get("message").and_then(|v| v.as_str()).and_then(non_blank) {
		return message;
	}

	let detail = match value.get("detail") {
		Some(serde_json::Value::String(detail)) => non_blank(detail.as_str()),
		Some(serde_json::Value::Array(entries)) => {
			let messages = entries
				.iter()
				.filter_map(|entry| entry.get("msg").and_then(|v| v.as_str()))
				.filter_map(non_blank)
				.collect::<Vec<_>>();

			(!messages.is_empty()).then(|| messages.join("; "))
		},
		_ => None,
	};

	detail.unwrap_or_else(|| fallback.to_owned())
}

fn ensure_success(response: &ApiResponse, fallback: &str) -> Result<()> {
	let status = response.status();

	if status.is_success() {
		return Ok(());
	}

	Err(Error::Api { status: status.as_u16(), message: error_message(response.body(), fallback) })
}

fn record<T>(kind: FlowKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}
}
