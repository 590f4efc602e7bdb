//! Durable record of the users who entered the shared password.

use std::{collections::HashMap, io::ErrorKind, path::PathBuf};

use anyhow::Context;
use log::{info, warn};
use tokio::{fs, sync::Mutex};

/// Map of user id to its authenticated flag, as stored on disk.
type AuthRecords = HashMap<String, bool>;

/// Password check and JSON-backed record of authenticated users.
///
/// The records are a flat JSON object mapping user ids to `true`. A missing or
/// unreadable file never fails a lookup: it is read as an empty map, so every
/// user is unauthenticated until they authenticate again.
///
/// # Examples
///
/// ```no_run
/// use porter::access::AuthStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = AuthStore::new("authenticated_users.json".into(), "secret".to_string());
/// if store.authenticate("U1234", "secret").await? {
///     assert!(store.is_authenticated("U1234").await);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AuthStore {
    /// Path of the JSON records file
    path: PathBuf,
    /// The shared password every user has to provide
    password: String,
    /// Serializes the read-modify-write of the records file
    lock: Mutex<()>,
}

impl AuthStore {
    /// Creates a store backed by the file at `path`, checking candidates against `password`.
    pub fn new(path: PathBuf, password: String) -> Self {
        AuthStore {
            path,
            password,
            lock: Mutex::new(()),
        }
    }

    /// Checks `candidate` against the shared password.
    ///
    /// On a match the user is marked as authenticated on disk, keeping every
    /// other record. On a mismatch nothing is written.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The password matched and the user is now authenticated
    /// * `Ok(false)` - The password didn't match
    ///
    /// # Errors
    ///
    /// Returns an error if the password matched but the records couldn't be written.
    pub async fn authenticate(&self, user_id: &str, candidate: &str) -> anyhow::Result<bool> {
        if candidate != self.password {
            info!("user {} provided a wrong password", user_id);
            return Ok(false);
        }

        let _guard = self.lock.lock().await;

        let mut records = self.load().await;
        records.insert(user_id.to_string(), true);

        let serialized = serde_json::to_string(&records)?;
        fs::write(&self.path, serialized)
            .await
            .with_context(|| format!("failed to persist {}", self.path.display()))?;

        info!("user {} is now authenticated", user_id);
        Ok(true)
    }

    /// Returns whether `user_id` has been authenticated.
    ///
    /// Unknown users, a missing file and a corrupted file all answer `false`.
    pub async fn is_authenticated(&self, user_id: &str) -> bool {
        let _guard = self.lock.lock().await;
        self.load()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(false)
    }

    /// Loads the records, falling back to an empty map when they can't be used.
    async fn load(&self) -> AuthRecords {
        let serialized = match fs::read_to_string(&self.path).await {
            Ok(serialized) => serialized,
            Err(e) if e.kind() == ErrorKind::NotFound => return AuthRecords::new(),
            Err(e) => {
                warn!(
                    "failed to read {} ({}), no user is authenticated",
                    self.path.display(),
                    e
                );
                return AuthRecords::new();
            }
        };

        match serde_json::from_str(&serialized) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "{} is corrupted ({}), no user is authenticated",
                    self.path.display(),
                    e
                );
                AuthRecords::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    const PASSWORD: &str = "open sesame";

    fn create_test_store(dir: &TempDir) -> AuthStore {
        AuthStore::new(
            dir.path().join("authenticated_users.json"),
            PASSWORD.to_string(),
        )
    }

    #[tokio::test]
    async fn test_unknown_user_without_file_is_not_authenticated() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert!(!store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_authenticate_with_right_password() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert!(store.authenticate("U1", PASSWORD).await.unwrap());
        assert!(store.is_authenticated("U1").await);
        assert!(!store.is_authenticated("U2").await);
    }

    #[tokio::test]
    async fn test_authenticate_with_wrong_password_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert!(!store.authenticate("U1", "xyz").await.unwrap());
        assert!(!store.is_authenticated("U1").await);
        assert!(!dir.path().join("authenticated_users.json").exists());
    }

    #[tokio::test]
    async fn test_password_comparison_is_exact() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert!(!store.authenticate("U1", "Open sesame").await.unwrap());
        assert!(!store.authenticate("U1", "open sesame ").await.unwrap());
        assert!(!store.authenticate("U1", "").await.unwrap());
        assert!(!store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_existing_authentication() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        store.authenticate("U1", PASSWORD).await.unwrap();
        assert!(!store.authenticate("U1", "xyz").await.unwrap());

        assert!(store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_authenticate_preserves_other_users() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        store.authenticate("U1", PASSWORD).await.unwrap();
        store.authenticate("U2", PASSWORD).await.unwrap();

        assert!(store.is_authenticated("U1").await);
        assert!(store.is_authenticated("U2").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_authentications_are_all_persisted() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(create_test_store(&dir));

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.authenticate(&format!("U{i}"), PASSWORD).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        for i in 0..50 {
            assert!(store.is_authenticated(&format!("U{i}")).await);
        }
        let store = create_test_store(&dir);
        assert!(store.is_authenticated("U0").await);
        assert!(store.is_authenticated("U49").await);
    }

    #[tokio::test]
    async fn test_authentication_survives_a_new_store() {
        let dir = TempDir::new().unwrap();
        create_test_store(&dir)
            .authenticate("U1", PASSWORD)
            .await
            .unwrap();

        let store = create_test_store(&dir);

        assert!(store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_records_are_a_flat_json_object() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        store.authenticate("U1", PASSWORD).await.unwrap();

        let serialized = fs::read_to_string(dir.path().join("authenticated_users.json"))
            .await
            .unwrap();
        let records: AuthRecords = serde_json::from_str(&serialized).unwrap();
        assert_eq!(records, AuthRecords::from([("U1".to_string(), true)]));
    }

    #[tokio::test]
    async fn test_false_flag_is_not_authenticated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authenticated_users.json");
        fs::write(&path, r#"{"U1": false, "U2": true}"#).await.unwrap();

        let store = AuthStore::new(path, PASSWORD.to_string());

        assert!(!store.is_authenticated("U1").await);
        assert!(store.is_authenticated("U2").await);
    }

    #[tokio::test]
    async fn test_corrupted_file_is_read_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authenticated_users.json");
        fs::write(&path, "{ this is not valid json ").await.unwrap();

        let store = AuthStore::new(path, PASSWORD.to_string());

        assert!(!store.is_authenticated("U1").await);
    }

    #[tokio::test]
    async fn test_authenticate_replaces_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("authenticated_users.json");
        fs::write(&path, "[1, 2, 3]").await.unwrap();

        let store = AuthStore::new(path, PASSWORD.to_string());

        assert!(store.authenticate("U1", PASSWORD).await.unwrap());
        assert!(store.is_authenticated("U1").await);
    }
}
