//! User authentication: durable records, password windows and user state.
//!
//! A user goes through three states:
//!
//! ```text
//! Unauthenticated ──trigger phrase──▶ Pending ──right password──▶ Authenticated
//!        ▲                               │
//!        └─────────wrong password────────┘
//! ```
//!
//! - [`AuthStore`] persists who is authenticated and checks passwords
//! - [`PendingRegistry`] tracks, in memory, who is about to type the password
//! - [`UserState`] is the state resolved from both before a message is handled

mod auth_store;
mod pending_registry;

pub use crate::access::auth_store::AuthStore;
pub use crate::access::pending_registry::PendingRegistry;

/// Outcome of a password attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// The password matched, the user is now authenticated
    Authenticated,
    /// The password didn't match
    Rejected,
}

/// Authentication state of a user when one of their messages comes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    /// The user never entered the password and has no open window
    Unauthenticated,
    /// The user sent the trigger phrase, their next message is a password attempt
    Pending,
    /// The user entered the password, their messages are relayed
    Authenticated,
}

impl UserState {
    /// Resolves the state of `user_id`.
    ///
    /// Authentication wins over a leftover password window.
    pub async fn resolve(
        user_id: &str,
        auth_store: &AuthStore,
        pending_registry: &PendingRegistry,
    ) -> Self {
        if auth_store.is_authenticated(user_id).await {
            UserState::Authenticated
        } else if pending_registry.is_pending(user_id).await {
            UserState::Pending
        } else {
            UserState::Unauthenticated
        }
    }
}
