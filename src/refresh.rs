//! Single-flight refresh-token exchange shared by every in-flight request.
//!
//! The coordinator owns one slot. The first caller that finds it empty installs a settle-once
//! cell before awaiting anything; every caller that arrives while the cell is occupied awaits the
//! same cell and observes the same result. The exchange itself runs on a spawned task that frees
//! the slot and then settles the cell, so the next caller after settlement starts a new exchange
//! instead of reusing a stale outcome, and cancelling a waiting caller never cancels the exchange.
//! Failures never escape: they are logged and settle as `None`, leaving the caller to decide
//! whether to log the user out.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use async_lock::OnceCell;
use tokio::runtime::Handle;
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	error::{ConfigError, DecodeError, TransportError},
	http::{self, ApiHttpClient, ApiRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, log_debug, log_warn},
	store::{SessionStore, StoreError},
};

type RefreshCell = Arc<OnceCell<Option<TokenSecret>>>;
type RefreshSlot = Arc<Mutex<Option<RefreshCell>>>;

/// Reasons a refresh exchange settled without a token.
///
/// These never reach callers of [`RefreshCoordinator::refresh`]; they are surfaced through logs.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// The store holds no refresh token, so no exchange was attempted.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// The backend answered with a non-success status.
	#[error("Refresh endpoint rejected the exchange with status {status}.")]
	Rejected {
		/// Status returned by the refresh endpoint.
		status: StatusCode,
	},
	/// The backend returned a blank access token.
	#[error("Refresh endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// The exchange did not settle within the configured bound.
	#[error("Refresh exchange did not settle within {timeout}.")]
	TimedOut {
		/// Configured bound.
		timeout: Duration,
	},
	/// No Tokio runtime was available to drive the exchange.
	#[error("No Tokio runtime is available to drive the refresh exchange.")]
	NoRuntime,
	/// Transport failure while calling the refresh endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body was not a token pair.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Reading or writing the session failed.
	#[error(transparent)]
	Storage(#[from] StoreError),
	/// Refresh request could not be built.
	#[error(transparent)]
	Request(#[from] ConfigError),
}

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh_token: &'a str,
}

/// Deduplicates refresh-token exchanges across concurrent callers.
///
/// Each exchange runs on its own Tokio task, so a caller that is cancelled while waiting never
/// abandons an exchange other callers have joined.
pub struct RefreshCoordinator<C>
where
	C: ?Sized + ApiHttpClient,
{
	exchange: Arc<Exchange<C>>,
	timeout: Duration,
	slot: RefreshSlot,
	/// Exchange counters.
	pub metrics: Arc<RefreshMetrics>,
}
impl<C> RefreshCoordinator<C>
where
	C: ?Sized + ApiHttpClient,
{
	const DEFAULT_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a coordinator posting to `endpoint` and persisting rotated sessions in `store`.
	pub fn new(http_client: Arc<C>, store: Arc<dyn SessionStore>, endpoint: Url) -> Self {
		Self {
			exchange: Arc::new(Exchange { http_client, store, endpoint }),
			timeout: Self::DEFAULT_TIMEOUT,
			slot: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Overrides the upper bound on a single exchange.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Returns `true` while an exchange occupies the slot.
	pub fn is_pending(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Returns a fresh access token, or `None` when the refresh could not be completed.
	///
	/// Concurrent callers share a single exchange and all receive the same value. Must be
	/// called from within a Tokio runtime; without one the refresh settles as `None`.
	pub async fn refresh(&self) -> Option<TokenSecret> {
		let (cell, runtime) = {
			let mut slot = self.slot.lock();

			match slot.as_ref() {
				Some(cell) => {
					self.metrics.record_joined();

					(cell.clone(), None)
				},
				None => {
					let Ok(runtime) = Handle::try_current() else {
						log_warn!("Token refresh failed: {}", RefreshError::NoRuntime);
						self.metrics.record_failure();

						return None;
					};
					let cell = Arc::new(OnceCell::new());

					*slot = Some(cell.clone());

					(cell, Some(runtime))
				},
			}
		};

		// Spawned outside the lock: a task rejected by a closing runtime releases the slot on drop.
		if let Some(runtime) = runtime {
			self.start(&runtime, cell.clone());
		}

		cell.wait().await.clone()
	}

	fn start(&self, runtime: &Handle, cell: RefreshCell) {
		let exchange = self.exchange.clone();
		let metrics = self.metrics.clone();
		let timeout = self.timeout;
		let release = SlotRelease { slot: self.slot.clone(), cell };

		runtime.spawn(async move {
			let token = exchange.settle(timeout, &metrics).await;

			release.complete(token);
		});
	}
}
impl<C> Debug for RefreshCoordinator<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("endpoint", &self.exchange.endpoint.as_str())
			.field("timeout", &self.timeout)
			.field("pending", &self.is_pending())
			.field("metrics", &self.metrics)
			.finish()
	}
}

struct Exchange<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	store: Arc<dyn SessionStore>,
	endpoint: Url,
}
impl<C> Exchange<C>
where
	C: ?Sized + ApiHttpClient,
{
	async fn settle(&self, timeout: Duration, metrics: &RefreshMetrics) -> Option<TokenSecret> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		metrics.record_attempt();

		let outcome = span
			.instrument(async {
				match tokio::time::timeout(timeout.unsigned_abs(), self.run()).await {
					Ok(result) => result,
					Err(_) => Err(RefreshError::TimedOut { timeout }),
				}
			})
			.await;

		match outcome {
			Ok(token) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				metrics.record_success();

				Some(token)
			},
			Err(RefreshError::MissingRefreshToken) => {
				log_debug!("Skipping refresh: no refresh token is stored.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				metrics.record_failure();

				None
			},
			Err(e) => {
				log_warn!("Token refresh failed: {e}");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				metrics.record_failure();

				None
			},
		}
	}

	async fn run(&self) -> Result<TokenSecret, RefreshError> {
		let refresh_token = self
			.store
			.refresh_token()
			.await?
			.filter(|secret| !secret.is_empty())
			.ok_or(RefreshError::MissingRefreshToken)?;
		let body = serde_json::to_vec(&RefreshBody { refresh_token: refresh_token.expose() })
			.map_err(|source| ConfigError::RequestBody { source })?;
		let request: ApiRequest = ::http::Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(body)
			.map_err(ConfigError::from)?;
		let response = self.http_client.send(request).await?;

		if !response.status().is_success() {
			return Err(RefreshError::Rejected { status: response.status() });
		}

		let pair: TokenPair = http::decode_json(&response)?;

		if pair.access_token.is_empty() {
			return Err(RefreshError::EmptyAccessToken);
		}

		let session = pair.into_session(Some(refresh_token));
		let access_token = session.access_token.clone();

		self.store.set(session).await?;

		Ok(access_token)
	}
}

// Frees the slot before settling `cell`, so no waiter can observe a settled cell still in the
// slot. Settles `None` if the exchange task is dropped before completing.
struct SlotRelease {
	slot: RefreshSlot,
	cell: RefreshCell,
}
impl SlotRelease {
	fn complete(self, token: Option<TokenSecret>) {
		self.release();

		// Only the exchange task initializes the cell, so this never waits.
		let _ = self.cell.set_blocking(token);
	}

	fn release(&self) {
		let mut slot = self.slot.lock();

		if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &self.cell)) {
			slot.take();
		}
	}
}
impl Drop for SlotRelease {
	fn drop(&mut self) {
		self.release();

		if !self.cell.is_initialized() {
			let _ = self.cell.set_blocking(None);
		}
	}
}
