//! Thread-safe in-memory [`SessionStore`] for clients that keep sessions in-process.

// self
use crate::{
	_prelude::*,
	auth::Session,
	store::{SessionStore, StoreFuture},
};

/// Session holder backed by a shared lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<Session>>>);
impl MemoryStore {
	/// Creates a store seeded with `session`.
	pub fn with_session(session: Session) -> Self {
		Self(Arc::new(RwLock::new(Some(session))))
	}

	/// Synchronous snapshot of the current session.
	pub fn snapshot(&self) -> Option<Session> {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn get(&self) -> StoreFuture<'_, Option<Session>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn set(&self, session: Session) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(session);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}
