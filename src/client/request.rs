//! Caller-supplied request options and their conversion into transport requests.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	http::ApiRequest,
};

/// How the bearer token is applied when building a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthHeader {
	/// Never attach a token.
	Omit,
	/// Attach the token unless the caller already set `Authorization`.
	IfAbsent,
	/// Replace any caller-supplied `Authorization` with the token.
	Replace,
}

/// Method, headers, and body of an API call.
///
/// Options are kept by value so the recovery handler can rebuild the request for its single
/// retry.
#[derive(Clone, Debug)]
pub struct RequestOptions {
	/// HTTP method.
	pub method: Method,
	/// Caller headers; a caller `Authorization` suppresses bearer injection on the first send.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Vec<u8>,
}
impl RequestOptions {
	/// Creates empty options for `method`.
	pub fn new(method: Method) -> Self {
		Self { method, headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get() -> Self {
		Self::new(Method::GET)
	}

	/// Shorthand for a `POST` request.
	pub fn post() -> Self {
		Self::new(Method::POST)
	}

	/// Sets `name` to `value`, replacing earlier values.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(mut self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(payload).map_err(|source| ConfigError::RequestBody { source })?;
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Encodes `pairs` as an `application/x-www-form-urlencoded` body.
	pub fn form<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator,
		I::Item: std::borrow::Borrow<(K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		self.body = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish().into_bytes();
		self.headers
			.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));

		self
	}

	pub(crate) fn to_request(
		&self,
		url: &Url,
		token: Option<&TokenSecret>,
		auth: AuthHeader,
	) -> Result<ApiRequest, ConfigError> {
		let mut headers = self.headers.clone();

		match (auth, token) {
			(AuthHeader::IfAbsent, Some(token)) if !headers.contains_key(AUTHORIZATION) => {
				headers.insert(AUTHORIZATION, token.bearer_header()?);
			},
			(AuthHeader::Replace, Some(token)) => {
				headers.insert(AUTHORIZATION, token.bearer_header()?);
			},
			_ => (),
		}

		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone())?;

		*request.headers_mut() = headers;

		Ok(request)
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self::get()
	}
}
