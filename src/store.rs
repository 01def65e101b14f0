//! Session store contract and built-in implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Holder of the current [`Session`].
///
/// The store is the only shared mutable state in the client. Login and refresh replace the
/// session with [`set`](SessionStore::set); logout calls [`clear`](SessionStore::clear).
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the current session, if any.
	fn get(&self) -> StoreFuture<'_, Option<Session>>;

	/// Replaces the current session.
	fn set(&self, session: Session) -> StoreFuture<'_, ()>;

	/// Drops the current session. Clearing an empty store succeeds.
	fn clear(&self) -> StoreFuture<'_, ()>;

	/// Returns the current access token, if any.
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.get().await?.map(|session| session.access_token)) })
	}

	/// Returns the current refresh token, if any.
	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			Ok(self.get().await?.and_then(|session| session.refresh_token))
		})
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk full"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[tokio::test]
	async fn token_helpers_read_through_get() {
		let store = MemoryStore::default();

		assert!(store.access_token().await.expect("Empty read should succeed.").is_none());

		store
			.set(Session::new(TokenSecret::new("access"), Some(TokenSecret::new("refresh"))))
			.await
			.expect("Saving a session should succeed.");

		let access = store.access_token().await.expect("Read should succeed.");
		let refresh = store.refresh_token().await.expect("Read should succeed.");

		assert_eq!(access.as_ref().map(TokenSecret::expose), Some("access"));
		assert_eq!(refresh.as_ref().map(TokenSecret::expose), Some("refresh"));
	}
}
