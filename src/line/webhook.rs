//! Structures of the webhook documents posted by the LINE platform.
//!
//! Only the parts the bot acts upon are modelled: text messages, and the bot
//! joining or leaving a chat. Every other event, source or message type is
//! deserialized into an `Unsupported` variant so that a new kind of event
//! never makes a whole webhook fail.

use serde::Deserialize;

/// Body of a webhook request.
///
/// ```json
/// {
///   "destination": "Uxxxxxxxx",
///   "events": [
///     {
///       "type": "message",
///       "replyToken": "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA",
///       "source": { "type": "user", "userId": "U4af4980629" },
///       "message": { "id": "444573844083572737", "type": "text", "text": "hello" }
///     }
///   ]
/// }
/// ```
#[derive(Deserialize, Debug)]
pub struct WebhookBody {
    /// Id of the bot user the events are for.
    #[serde(default)]
    pub destination: String,
    /// Events, in the order they occurred.
    pub events: Vec<Event>,
}

/// A webhook event, tagged by its `type` field.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// Someone sent a message in a chat the bot is part of
    Message(MessageEvent),
    /// The bot joined a group or a room
    Join(MembershipEvent),
    /// The bot was removed from a group or a room
    Leave(MembershipEvent),
    /// Any other event (follow, postback, ...)
    #[serde(other)]
    Unsupported,
}

/// Payload of a `message` event.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// One-time token to reply to this message, absent for events received in standby mode.
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Chat and author of the message.
    pub source: Source,
    /// Content of the message.
    pub message: Message,
}

/// Payload of `join` and `leave` events.
#[derive(Deserialize, Debug)]
pub struct MembershipEvent {
    /// The chat the bot joined or left.
    pub source: Source,
}

/// Where an event comes from, tagged by its `type` field.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Source {
    /// One-to-one chat with a user
    User {
        /// Id of the user
        user_id: String,
    },
    /// Group chat
    Group {
        /// Id of the group
        group_id: String,
        /// Id of the author, absent when they didn't consent to share it
        user_id: Option<String>,
    },
    /// Multi-person chat without a group
    Room {
        /// Id of the room
        room_id: String,
        /// Id of the author, absent when they didn't consent to share it
        user_id: Option<String>,
    },
    /// Any other kind of source
    #[serde(other)]
    Unsupported,
}

impl Source {
    /// Returns the id of the user behind the event, if known.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Source::User { user_id } => Some(user_id),
            Source::Group { user_id, .. } | Source::Room { user_id, .. } => user_id.as_deref(),
            Source::Unsupported => None,
        }
    }

    /// Returns the group id when the source is a group chat.
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Source::Group { group_id, .. } => Some(group_id),
            _ => None,
        }
    }

    /// Returns whether the source is a one-to-one chat with a user.
    pub fn is_user(&self) -> bool {
        matches!(self, Source::User { .. })
    }
}

/// Content of a message, tagged by its `type` field.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Text message
    Text {
        /// The text, as typed by the user
        text: String,
    },
    /// Stickers, images, files, ...
    #[serde(other)]
    Unsupported,
}
