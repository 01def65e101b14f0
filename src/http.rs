//! Transport primitives for API calls.
//!
//! The module exposes [`ApiHttpClient`], the single base request function every other layer
//! composes over. The executor, the refresh coordinator, and the account helpers all go through
//! it, so tests can swap in an in-process transport and count exactly which requests were
//! issued. HTTP error statuses are ordinary responses at this layer; only failures to obtain a
//! response at all surface as [`TransportError`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	error::{DecodeError, TransportError},
};

/// Request handed to an [`ApiHttpClient`].
pub type ApiRequest = ::http::Request<Vec<u8>>;
/// Fully buffered response produced by an [`ApiHttpClient`].
pub type ApiResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`ApiHttpClient::send`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the
/// executor and the refresh coordinator behind `Arc`, and the returned futures must be `Send`
/// so the logout task and callers can move across executor threads.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` and buffers the full response.
	fn send(&self, request: ApiRequest) -> HttpFuture<'_>;
}

/// Decodes a JSON response body, reporting the failing field path on mismatch.
pub fn decode_json<T>(response: &ApiResponse) -> Result<T, DecodeError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DecodeError::Json { source, status: Some(response.status().as_u16()) })
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose every request is bounded by `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout.unsigned_abs()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn send(&self, request: ApiRequest) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = ApiResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::MockServer;
	// self
	use super::*;

	#[tokio::test]
	async fn reqwest_transport_buffers_error_statuses() {
		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(httpmock::Method::GET).path("/courts");
				then.status(503).header("x-trace", "abc").body("{\"detail\":\"maintenance\"}");
			})
			.await;
		let request = ::http::Request::builder()
			.method(Method::GET)
			.uri(server.url("/courts"))
			.body(Vec::new())
			.expect("Request fixture should build.");
		let response = ReqwestHttpClient::default()
			.send(request)
			.await
			.expect("Error statuses should still produce a response.");

		mock.assert_async().await;

		assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(response.headers().get("x-trace").map(HeaderValue::as_bytes), Some(&b"abc"[..]));
		assert_eq!(response.body().as_slice(), b"{\"detail\":\"maintenance\"}");
	}

	#[test]
	fn decode_json_reports_field_path() {
		#[derive(Debug, Deserialize)]
		struct Court {
			#[allow(dead_code)]
			number: u32,
		}

		let mut response = ApiResponse::new(b"{\"number\":\"seven\"}".to_vec());

		*response.status_mut() = StatusCode::OK;

		let err = decode_json::<Court>(&response).expect_err("String numbers should be rejected.");
		let DecodeError::Json { source, status } = err;

		assert_eq!(source.path().to_string(), "number");
		assert_eq!(status, Some(200));
	}

	#[tokio::test]
	async fn unreachable_host_is_a_transport_error() {
		let request = ::http::Request::builder()
			.uri("http://127.0.0.1:9/unreachable")
			.body(Vec::new())
			.expect("Request fixture should build.");
		let err = ReqwestHttpClient::default()
			.send(request)
			.await
			.expect_err("Closed ports should fail at the transport layer.");

		assert!(matches!(err, TransportError::Network { .. }));
	}
}
