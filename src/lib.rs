//! Authenticated API client for the tournament backend: bearer sessions, single-flight
//! refresh-token rotation, one-shot 401 recovery, and failure-tolerant logout.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod locale;
pub mod logout;
pub mod obs;
pub mod recovery;
pub mod refresh;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fakes for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		error::TransportError,
		http::{ApiHttpClient, ApiRequest, ApiResponse, HttpFuture},
		logout::{NavigationError, NavigationFuture, Navigator},
	};

	/// Canned reply served by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct ScriptedReply {
		/// Status code returned to the caller.
		pub status: StatusCode,
		/// Raw response body.
		pub body: Vec<u8>,
		/// Artificial latency applied before the reply resolves.
		pub delay: std::time::Duration,
	}
	impl ScriptedReply {
		/// Builds a reply with the provided status and body and no delay.
		pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
			Self {
				status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
				body: body.into(),
				delay: std::time::Duration::ZERO,
			}
		}

		/// Delays the reply by `millis` milliseconds.
		pub fn delayed(mut self, millis: u64) -> Self {
			self.delay = std::time::Duration::from_millis(millis);

			self
		}
	}

	/// In-process transport that answers requests per path from scripted queues and records
	/// every request it sees.
	#[derive(Debug, Default)]
	pub struct ScriptedHttpClient {
		replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
		fallback: Mutex<HashMap<String, ScriptedReply>>,
		requests: Mutex<Vec<(Method, String, HeaderMap)>>,
		calls: AtomicUsize,
	}
	impl ScriptedHttpClient {
		/// Queues a one-shot reply for `path`.
		pub fn push(&self, path: &str, reply: ScriptedReply) -> &Self {
			self.replies.lock().entry(path.to_owned()).or_default().push_back(reply);

			self
		}

		/// Sets the reply served for `path` once its queue is empty.
		pub fn always(&self, path: &str, reply: ScriptedReply) -> &Self {
			self.fallback.lock().insert(path.to_owned(), reply);

			self
		}

		/// Total number of requests dispatched.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Number of requests dispatched to `path`.
		pub fn calls_to(&self, path: &str) -> usize {
			self.requests.lock().iter().filter(|(_, p, _)| p == path).count()
		}

		/// `Authorization` header values observed for `path`, in dispatch order.
		pub fn authorization_headers(&self, path: &str) -> Vec<Option<String>> {
			self.requests
				.lock()
				.iter()
				.filter(|(_, p, _)| p == path)
				.map(|(_, _, headers)| {
					headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned)
				})
				.collect()
		}

		fn next_reply(&self, path: &str) -> Option<ScriptedReply> {
			if let Some(reply) = self.replies.lock().get_mut(path).and_then(VecDeque::pop_front) {
				return Some(reply);
			}

			self.fallback.lock().get(path).cloned()
		}
	}
	impl ApiHttpClient for ScriptedHttpClient {
		fn send(&self, request: ApiRequest) -> HttpFuture<'_> {
			Box::pin(async move {
				let path = request.uri().path().to_owned();

				self.calls.fetch_add(1, Ordering::SeqCst);
				self.requests.lock().push((
					request.method().clone(),
					path.clone(),
					request.headers().clone(),
				));

				let reply = self.next_reply(&path).ok_or_else(|| {
					TransportError::Io(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						format!("No scripted reply for {path}."),
					))
				})?;

				if !reply.delay.is_zero() {
					tokio::time::sleep(reply.delay).await;
				}

				let mut response = ApiResponse::new(reply.body);

				*response.status_mut() = reply.status;

				Ok(response)
			})
		}
	}

	/// Navigator fake that records every navigation and can be told to reject sign-outs.
	#[derive(Debug, Default)]
	pub struct RecordingNavigator {
		/// Path reported by [`Navigator::current_path`].
		pub path: Mutex<String>,
		/// Number of leading `sign_out` calls that should fail.
		pub failing_sign_outs: AtomicUsize,
		/// Targets passed to `sign_out`, including failed attempts.
		pub sign_outs: Mutex<Vec<String>>,
		/// Targets passed to `hard_navigate`.
		pub hard_navigations: Mutex<Vec<String>>,
	}
	impl RecordingNavigator {
		/// Creates a navigator positioned at `path`.
		pub fn at(path: &str) -> Self {
			Self { path: Mutex::new(path.to_owned()), ..Default::default() }
		}

		/// Makes the next `count` sign-out attempts fail.
		pub fn failing(self, count: usize) -> Self {
			self.failing_sign_outs.store(count, Ordering::SeqCst);

			self
		}

		/// Snapshot of sign-out targets.
		pub fn sign_out_targets(&self) -> Vec<String> {
			self.sign_outs.lock().clone()
		}

		/// Snapshot of hard navigation targets.
		pub fn hard_targets(&self) -> Vec<String> {
			self.hard_navigations.lock().clone()
		}
	}
	impl Navigator for RecordingNavigator {
		fn current_path(&self) -> String {
			self.path.lock().clone()
		}

		fn sign_out<'a>(&'a self, callback_url: &'a str) -> NavigationFuture<'a> {
			Box::pin(async move {
				self.sign_outs.lock().push(callback_url.to_owned());

				let should_fail = self
					.failing_sign_outs
					.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
					.is_ok();

				if should_fail {
					Err(NavigationError::new("sign-out rejected"))
				} else {
					Ok(())
				}
			})
		}

		fn hard_navigate(&self, url: &str) {
			self.hard_navigations.lock().push(url.to_owned());
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use ::http::{
		HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
