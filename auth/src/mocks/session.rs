//! Mock session store for testing.

use crate::error::{AuthError, Result};
use crate::providers::{AuthFuture, SessionStore};
use crate::state::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock session store.
///
/// Uses in-memory storage keyed by token digest.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?
            .len())
    }
}

impl SessionStore for MockSessionStore {
    fn create(&self, session: Session) -> AuthFuture<'_, ()> {
        let sessions = Arc::clone(&self.sessions);

        Box::pin(async move {
            sessions
                .lock()
                .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?
                .insert(session.token_digest.clone(), session);
            Ok(())
        })
    }

    fn find(&self, token_digest: String) -> AuthFuture<'_, Option<Session>> {
        let sessions = Arc::clone(&self.sessions);

        Box::pin(async move {
            Ok(sessions
                .lock()
                .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?
                .get(&token_digest)
                .cloned())
        })
    }

    fn delete(&self, token_digest: String) -> AuthFuture<'_, ()> {
        let sessions = Arc::clone(&self.sessions);

        Box::pin(async move {
            sessions
                .lock()
                .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?
                .remove(&token_digest);
            Ok(())
        })
    }
}
