//! In-memory registry of users who sent the trigger phrase and owe a password.

use std::collections::HashSet;

use log::debug;
use tokio::sync::Mutex;

use crate::access::{AuthResult, AuthStore};

/// Users currently inside their password window.
///
/// The registry lives as long as the process: a restart forgets every pending
/// user, who then has to send the trigger phrase again.
///
/// Each window allows exactly one attempt. [`PendingRegistry::resolve`]
/// closes the window before checking the password, whatever the outcome.
#[derive(Default)]
pub struct PendingRegistry {
    /// Ids of the users waiting to enter the password
    pending: Mutex<HashSet<String>>,
}

impl PendingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `user_id` has an open password window.
    pub async fn is_pending(&self, user_id: &str) -> bool {
        self.pending.lock().await.contains(user_id)
    }

    /// Opens a password window for `user_id`.
    ///
    /// Callers must only open a window for unauthenticated users.
    ///
    /// # Returns
    ///
    /// `false` if the user already had an open window, which is left untouched.
    pub async fn begin(&self, user_id: &str) -> bool {
        let opened = self.pending.lock().await.insert(user_id.to_string());
        if opened {
            debug!("password window opened for user {}", user_id);
        }
        opened
    }

    /// Consumes the password window of `user_id` with `candidate` as the attempt.
    ///
    /// The window is closed first, then the password is checked against
    /// `auth_store`. A wrong password doesn't allow another attempt: the user
    /// has to send the trigger phrase again.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(result))` - The attempt was made
    /// * `Ok(None)` - There was no window to consume (another request took it)
    ///
    /// # Errors
    ///
    /// Returns an error if the password matched but the authentication couldn't
    /// be persisted. The window is closed anyway.
    pub async fn resolve(
        &self,
        user_id: &str,
        candidate: &str,
        auth_store: &AuthStore,
    ) -> anyhow::Result<Option<AuthResult>> {
        if !self.pending.lock().await.remove(user_id) {
            debug!("no password window left for user {}", user_id);
            return Ok(None);
        }

        let result = if auth_store.authenticate(user_id, candidate).await? {
            AuthResult::Authenticated
        } else {
            AuthResult::Rejected
        };
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PASSWORD: &str = "open sesame";

    fn create_test_auth_store(dir: &TempDir) -> AuthStore {
        AuthStore::new(
            dir.path().join("authenticated_users.json"),
            PASSWORD.to_string(),
        )
    }

    #[tokio::test]
    async fn test_new_registry_has_no_pending_user() {
        let registry = PendingRegistry::new();

        assert!(!registry.is_pending("U1").await);
    }

    #[tokio::test]
    async fn test_begin_opens_a_single_window() {
        let registry = PendingRegistry::new();

        assert!(registry.begin("U1").await);
        assert!(!registry.begin("U1").await);
        assert!(registry.is_pending("U1").await);
        assert!(!registry.is_pending("U2").await);
    }

    #[tokio::test]
    async fn test_resolve_with_right_password_authenticates_and_closes() {
        let dir = TempDir::new().unwrap();
        let auth_store = create_test_auth_store(&dir);
        let registry = PendingRegistry::new();
        registry.begin("U1").await;

        let result = registry.resolve("U1", PASSWORD, &auth_store).await.unwrap();

        assert_eq!(result, Some(AuthResult::Authenticated));
        assert!(!registry.is_pending("U1").await);
        assert!(auth_store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_resolve_with_wrong_password_closes_window() {
        let dir = TempDir::new().unwrap();
        let auth_store = create_test_auth_store(&dir);
        let registry = PendingRegistry::new();
        registry.begin("U1").await;

        let result = registry.resolve("U1", "xyz", &auth_store).await.unwrap();

        assert_eq!(result, Some(AuthResult::Rejected));
        assert!(!registry.is_pending("U1").await);
        assert!(!auth_store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_window_can_only_be_consumed_once() {
        let dir = TempDir::new().unwrap();
        let auth_store = create_test_auth_store(&dir);
        let registry = PendingRegistry::new();
        registry.begin("U1").await;

        registry.resolve("U1", "xyz", &auth_store).await.unwrap();
        let second = registry.resolve("U1", PASSWORD, &auth_store).await.unwrap();

        assert_eq!(second, None);
        assert!(!auth_store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_resolve_only_closes_the_given_user() {
        let dir = TempDir::new().unwrap();
        let auth_store = create_test_auth_store(&dir);
        let registry = PendingRegistry::new();
        registry.begin("U1").await;
        registry.begin("U2").await;

        registry.resolve("U1", "xyz", &auth_store).await.unwrap();

        assert!(!registry.is_pending("U1").await);
        assert!(registry.is_pending("U2").await);
    }
}
