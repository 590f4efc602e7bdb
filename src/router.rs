//! Dispatch of webhook events to the roster, the authentication flow and the relay.
//!
//! # Message handling
//!
//! The state of the author is resolved first, then the message is handled
//! according to it:
//!
//! | State | Message | Action |
//! |-------|---------|--------|
//! | Authenticated | any | relayed to every group, if sent in a one-to-one chat |
//! | Pending | any | checked as the password, window closed |
//! | Unauthenticated | [`TRIGGER_PHRASE`] | password window opened |
//! | Unauthenticated | other | ignored, no reply |
//!
//! Unknown users never get an answer unless they know the trigger phrase, so
//! the bot doesn't reveal itself to strangers.
//!
//! # Membership
//!
//! Joining a group adds it to the roster, leaving it removes it. Rooms (chats
//! without a group) are not tracked.

use std::sync::Arc;

use log::{debug, info};

use crate::{
    access::{AuthResult, AuthStore, PendingRegistry, UserState},
    line::{Event, MembershipEvent, Message, MessageEvent, Messenger, WebhookBody},
    relay::FanOutRelay,
    roster::RosterStore,
};

/// Message opening the password window. Case-sensitive, exact match.
pub const TRIGGER_PHRASE: &str = "knock knock open the door";
/// Reply to the trigger phrase.
pub const PASSWORD_PROMPT: &str = "Please enter the password.";
/// Reply to a right password.
pub const WELCOME: &str = "You are now authenticated. Welcome!";
/// Reply to a wrong password.
pub const WRONG_PASSWORD: &str = "Incorrect password!!!";

/// Routes webhook events to the component in charge of them.
pub struct EventRouter<M: Messenger> {
    /// Used to reply during the authentication flow
    messenger: Arc<M>,
    /// Groups the bot belongs to
    roster: Arc<RosterStore>,
    /// Durable authentication records
    auth_store: AuthStore,
    /// Users currently inside their password window
    pending_registry: PendingRegistry,
    /// Broadcasts authenticated users' messages
    relay: FanOutRelay<M>,
}

impl<M: Messenger> EventRouter<M> {
    /// Creates a router.
    ///
    /// # Arguments
    ///
    /// * `messenger` - Sends replies and relayed messages
    /// * `roster` - Roster updated on join and leave, read by the relay
    /// * `auth_store` - Authentication records and password check
    /// * `pending_registry` - Owned registry of the open password windows
    pub fn new(
        messenger: Arc<M>,
        roster: Arc<RosterStore>,
        auth_store: AuthStore,
        pending_registry: PendingRegistry,
    ) -> Self {
        let relay = FanOutRelay::new(Arc::clone(&roster), Arc::clone(&messenger));
        EventRouter {
            messenger,
            roster,
            auth_store,
            pending_registry,
            relay,
        }
    }

    /// Handles the events of a webhook in order.
    ///
    /// # Errors
    ///
    /// Stops at the first event failing and returns its error. Side effects
    /// of the events handled before it are kept.
    pub async fn handle_webhook(&self, webhook: &WebhookBody) -> anyhow::Result<()> {
        debug!(
            "handling {} events for {}",
            webhook.events.len(),
            webhook.destination
        );
        for event in &webhook.events {
            self.handle_event(event).await?;
        }
        Ok(())
    }

    /// Handles a single webhook event.
    ///
    /// # Errors
    ///
    /// Returns an error if a store can't be written or read, or if a reply
    /// can't be sent. Failures to relay a message to a group are not errors.
    pub async fn handle_event(&self, event: &Event) -> anyhow::Result<()> {
        match event {
            Event::Message(message_event) => self.handle_message(message_event).await,
            Event::Join(membership_event) => self.handle_join(membership_event).await,
            Event::Leave(membership_event) => self.handle_leave(membership_event).await,
            Event::Unsupported => {
                debug!("ignoring unsupported event");
                Ok(())
            }
        }
    }

    async fn handle_join(&self, event: &MembershipEvent) -> anyhow::Result<()> {
        match event.source.group_id() {
            Some(group_id) => self.roster.add_group(group_id).await,
            None => {
                debug!("ignoring join of {:?}", event.source);
                Ok(())
            }
        }
    }

    async fn handle_leave(&self, event: &MembershipEvent) -> anyhow::Result<()> {
        match event.source.group_id() {
            Some(group_id) => self.roster.remove_group(group_id).await,
            None => {
                debug!("ignoring leave of {:?}", event.source);
                Ok(())
            }
        }
    }

    async fn handle_message(&self, event: &MessageEvent) -> anyhow::Result<()> {
        let Message::Text { text } = &event.message else {
            return Ok(());
        };
        let Some(user_id) = event.source.user_id() else {
            debug!("ignoring message without author");
            return Ok(());
        };

        match UserState::resolve(user_id, &self.auth_store, &self.pending_registry).await {
            UserState::Authenticated => {
                // Only one-to-one messages are relayed, or the bot would echo
                // the groups it relays to
                if event.source.is_user() {
                    self.relay.relay(text).await?;
                } else {
                    debug!("ignoring message of {} outside a one-to-one chat", user_id);
                }
            }
            UserState::Pending => {
                let reply = match self
                    .pending_registry
                    .resolve(user_id, text, &self.auth_store)
                    .await?
                {
                    Some(AuthResult::Authenticated) => WELCOME,
                    Some(AuthResult::Rejected) => WRONG_PASSWORD,
                    None => return Ok(()),
                };
                self.reply(event, reply).await?;
            }
            UserState::Unauthenticated if text == TRIGGER_PHRASE => {
                if self.pending_registry.begin(user_id).await {
                    info!("user {} asked to authenticate", user_id);
                    self.reply(event, PASSWORD_PROMPT).await?;
                }
            }
            UserState::Unauthenticated => {}
        }

        Ok(())
    }

    /// Replies to `event`, unless it came without a reply token (standby mode).
    async fn reply(&self, event: &MessageEvent, text: &str) -> anyhow::Result<()> {
        match &event.reply_token {
            Some(reply_token) => self.messenger.reply_text(reply_token, text).await,
            None => {
                debug!("no reply token, dropping reply {:?}", text);
                Ok(())
            }
        }
    }
}
