//! Mock technician repository for testing.

use crate::error::{AuthError, Result};
use crate::providers::{AuthFuture, TechnicianRepository};
use crate::state::Technician;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock technician repository.
///
/// Uses in-memory storage keyed by username.
#[derive(Debug, Clone, Default)]
pub struct MockTechnicianRepository {
    technicians: Arc<Mutex<HashMap<String, Technician>>>,
}

impl MockTechnicianRepository {
    /// Create a new mock technician repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn count(&self) -> Result<usize> {
        Ok(self
            .technicians
            .lock()
            .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?
            .len())
    }
}

impl TechnicianRepository for MockTechnicianRepository {
    fn find_by_username(&self, username: String) -> AuthFuture<'_, Option<Technician>> {
        let technicians = Arc::clone(&self.technicians);

        Box::pin(async move {
            Ok(technicians
                .lock()
                .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?
                .get(&username)
                .cloned())
        })
    }

    fn create(&self, technician: Technician) -> AuthFuture<'_, ()> {
        let technicians = Arc::clone(&self.technicians);

        Box::pin(async move {
            let mut guard = technicians
                .lock()
                .map_err(|_| AuthError::Internal("Mutex lock failed".to_string()))?;
            if guard.contains_key(&technician.username) {
                return Err(AuthError::UsernameTaken(technician.username));
            }
            guard.insert(technician.username.clone(), technician);
            Ok(())
        })
    }
}
