#![cfg(feature = "reqwest")]

// std
use std::{
	sync::{Arc, Mutex},
	time::Duration as StdDuration,
};
// crates.io
use httpmock::prelude::*;
// self
use tourney_auth::{
	auth::{Session, TokenSecret},
	client::{ApiClient, ReqwestApiClient, RequestOptions},
	config::ClientConfig,
	http_types::{HeaderValue, Method, StatusCode, header::AUTHORIZATION},
	logout::{NavigationError, NavigationFuture, Navigator},
	store::MemoryStore,
};

#[derive(Default)]
struct Browser {
	sign_outs: Mutex<Vec<String>>,
	hard: Mutex<Vec<String>>,
}
impl Browser {
	fn sign_outs(&self) -> Vec<String> {
		self.sign_outs.lock().expect("Navigator lock should not be poisoned.").clone()
	}
}
impl Navigator for Browser {
	fn current_path(&self) -> String {
		"/en/tournaments/42".into()
	}

	fn sign_out<'a>(&'a self, callback_url: &'a str) -> NavigationFuture<'a> {
		Box::pin(async move {
			self.sign_outs
				.lock()
				.map_err(|_| NavigationError::new("poisoned"))?
				.push(callback_url.to_owned());

			Ok(())
		})
	}

	fn hard_navigate(&self, url: &str) {
		if let Ok(mut hard) = self.hard.lock() {
			hard.push(url.to_owned());
		}
	}
}

struct Fixture {
	client: ReqwestApiClient,
	store: MemoryStore,
	browser: Arc<Browser>,
}

fn fixture(server: &MockServer) -> Fixture {
	let store = MemoryStore::with_session(Session::new(
		TokenSecret::new("access-old"),
		Some(TokenSecret::new("refresh-old")),
	));
	let browser = Arc::new(Browser::default());
	let config = ClientConfig::builder()
		.base_url(server.base_url())
		.build()
		.expect("Mock server URL should validate.");
	let client = ApiClient::new(config, Arc::new(store.clone()), browser.clone())
		.expect("Client should build.");

	Fixture { client, store, browser }
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_retried_once() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/tournaments").header("authorization", "Bearer access-old");
			then.status(401).body("{\"detail\":\"Token expired\"}");
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/tournaments").header("authorization", "Bearer access-new");
			then.status(200).header("content-type", "application/json").body("[{\"id\":1}]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-new\",\"refresh_token\":\"refresh-new\",\"token_type\":\"bearer\"}");
		})
		.await;
	let f = fixture(&server);
	let response = f
		.client
		.execute_with_auth_recovery("/tournaments", RequestOptions::get())
		.await
		.expect("Recovered request should produce a response.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.body().as_slice(), b"[{\"id\":1}]");

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	let session = f.store.snapshot().expect("Rotated session should be stored.");

	assert_eq!(session.access_token.expose(), "access-new");
	assert_eq!(session.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-new"));
}

#[tokio::test]
async fn sustained_401_yields_exactly_two_calls() {
	let server = MockServer::start_async().await;
	let endpoint = server
		.mock_async(|when, then| {
			when.method(GET).path("/companies/me/players");
			then.status(401).body("{\"detail\":\"Not authorized\"}");
		})
		.await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200).body("{\"access_token\":\"access-new\"}");
		})
		.await;
	let f = fixture(&server);
	let response = f
		.client
		.execute_with_auth_recovery(
			"/companies/me/players",
			RequestOptions::get().header(AUTHORIZATION, HeaderValue::from_static("Bearer pinned")),
		)
		.await
		.expect("Sustained 401 should come back as a response.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	endpoint.assert_calls_async(2).await;

	assert!(f.browser.sign_outs().is_empty());
}

#[tokio::test]
async fn failed_refresh_returns_original_response_and_signs_out() {
	let server = MockServer::start_async().await;
	let endpoint = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/tournaments/9");
			then.status(401).body("{\"detail\":\"Token expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(401).body("{\"detail\":\"Refresh token expired\"}");
		})
		.await;
	let f = fixture(&server);
	let response = f
		.client
		.execute_with_auth_recovery("/tournaments/9", RequestOptions::new(Method::DELETE))
		.await
		.expect("Original 401 should come back as a response.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(response.body().as_slice(), b"{\"detail\":\"Token expired\"}");

	endpoint.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	for _ in 0..100 {
		if !f.browser.sign_outs().is_empty() {
			break;
		}

		tokio::time::sleep(StdDuration::from_millis(10)).await;
	}

	assert_eq!(f.browser.sign_outs(), ["/en"]);
	assert!(f.store.snapshot().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_401s_trigger_a_single_refresh() {
	let server = MockServer::start_async().await;
	let _stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/matches").header("authorization", "Bearer access-old");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/matches").header("authorization", "Bearer access-new");
			then.status(200).body("[]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200)
				.delay(StdDuration::from_millis(300))
				.body("{\"access_token\":\"access-new\",\"refresh_token\":\"refresh-new\"}");
		})
		.await;
	let f = fixture(&server);
	let handles = (0..4)
		.map(|_| {
			let client = f.client.clone();

			tokio::spawn(async move {
				client.execute_with_auth_recovery("/matches", RequestOptions::get()).await
			})
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let response = handle
			.await
			.expect("Request task should not panic.")
			.expect("Request should produce a response.");

		assert_eq!(response.status(), StatusCode::OK);
	}

	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(4).await;
}
