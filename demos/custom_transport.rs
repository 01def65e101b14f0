//! Demonstrates plugging an in-process transport into the client.
//!
//! 1. Implement [`ApiHttpClient`] so every request is answered without touching the network.
//! 2. Pass the transport to [`ApiClient::with_http_client`] together with a store and navigator.
//! 3. Observe that the first 401 triggers exactly one refresh and one retry.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
// self
use tourney_auth::{
	auth::{Session, TokenSecret},
	client::{ApiClient, RequestOptions},
	config::ClientConfig,
	http::{ApiHttpClient, ApiRequest, ApiResponse, HttpFuture},
	http_types::{StatusCode, header::AUTHORIZATION},
	logout::{NavigationFuture, Navigator},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = MemoryStore::with_session(Session::new(
		TokenSecret::new("expired-access"),
		Some(TokenSecret::new("demo-refresh")),
	));
	let transport = Arc::new(InProcessTransport::default());
	let config = ClientConfig::from_env()?;
	let client: ApiClient<InProcessTransport> = ApiClient::with_http_client(
		config,
		Arc::new(store.clone()),
		Arc::new(StaticNavigator),
		Arc::clone(&transport),
	)?;
	let response =
		client.execute_with_auth_recovery("/tournaments", RequestOptions::get()).await?;

	println!(
		"Status {} after {} transport calls; stored access token rotated: {}.",
		response.status(),
		transport.calls.load(Ordering::SeqCst),
		store.snapshot().is_some_and(|session| session.access_token.expose() == "fresh-access"),
	);

	Ok(())
}

#[derive(Default)]
struct InProcessTransport {
	calls: AtomicUsize,
}
impl ApiHttpClient for InProcessTransport {
	fn send(&self, request: ApiRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let bearer = request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
			let (status, body) = match (request.uri().path(), bearer) {
				(path, _) if path.ends_with("/refresh") =>
					(StatusCode::OK, "{\"access_token\":\"fresh-access\"}"),
				(_, Some("Bearer fresh-access")) => (StatusCode::OK, "[]"),
				_ => (StatusCode::UNAUTHORIZED, "{\"detail\":\"Token expired\"}"),
			};
			let mut response = ApiResponse::new(body.as_bytes().to_vec());

			*response.status_mut() = status;

			Ok(response)
		})
	}
}

struct StaticNavigator;
impl Navigator for StaticNavigator {
	fn current_path(&self) -> String {
		"/es".into()
	}

	fn sign_out<'a>(&'a self, callback_url: &'a str) -> NavigationFuture<'a> {
		Box::pin(async move {
			println!("Sign-out requested with callback {callback_url}.");

			Ok(())
		})
	}

	fn hard_navigate(&self, url: &str) {
		println!("Hard navigation to {url}.");
	}
}
