//! LINE platform integration.
//!
//! - `client` - Messaging API client used to reply to events and push messages
//! - `signature` - Verification of the signature attached to every webhook
//! - `webhook` - Structures of the webhook documents

mod client;
mod signature;
mod webhook;

pub use crate::line::client::{LineClient, Messenger};
#[cfg(test)]
pub use crate::line::client::MockMessenger;
#[cfg(test)]
pub use crate::line::signature::sign;
pub use crate::line::signature::{SIGNATURE_HEADER, verify_signature};
#[cfg(test)]
pub use crate::line::webhook::Source;
pub use crate::line::webhook::{Event, MembershipEvent, Message, MessageEvent, WebhookBody};
