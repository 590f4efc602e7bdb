//! HTTP client for the LINE Messaging API.
//!
//! This module provides the [`LineClient`] used to answer webhook events and to
//! push messages to group chats, behind the [`Messenger`] trait.

use std::time::Duration;

use anyhow::Context;
use log::{debug, info};
use mockall::automock;
use reqwest::Client;
use serde::Serialize;

/// Sends text messages on behalf of the bot.
///
/// This trait abstracts the LINE API calls for easier testing with mocks.
#[automock]
pub trait Messenger {
    /// Answers an inbound event identified by its one-time `reply_token`.
    async fn reply_text(&self, reply_token: &str, text: &str) -> anyhow::Result<()>;
    /// Sends `text` to the user, group or room `to`.
    async fn push_text(&self, to: &str, text: &str) -> anyhow::Result<()>;
}

/// A message as sent to the LINE API.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutboundMessage<'a> {
    Text { text: &'a str },
}

/// Body of `POST /v2/bot/message/reply`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [OutboundMessage<'a>; 1],
}

/// Body of `POST /v2/bot/message/push`.
#[derive(Serialize, Debug)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [OutboundMessage<'a>; 1],
}

/// Client of the LINE Messaging API, authenticated with the channel access token.
///
/// # Examples
///
/// ```no_run
/// use porter::line::{LineClient, Messenger};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = LineClient::new("https://api.line.me", "access-token", 10)?;
/// client.push_text("C1234", "hello").await?;
/// # Ok(())
/// # }
/// ```
pub struct LineClient {
    /// Base URL of the Messaging API, without trailing slash
    url: String,
    /// Channel access token
    access_token: String,
    /// HTTP client
    client: Client,
}

impl LineClient {
    /// Creates a new [`LineClient`].
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL of the Messaging API, e.g. `https://api.line.me`
    /// * `access_token` - Channel access token sent as bearer token
    /// * `request_timeout` - Maximum duration of a request, in seconds
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be built.
    pub fn new(url: &str, access_token: &str, request_timeout: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(LineClient {
            url: url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client,
        })
    }

    /// Posts `body` as JSON to `path` and fails on a non-success status.
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> anyhow::Result<()> {
        let url = format!("{}{}", &self.url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            anyhow::bail!("{url} answered {status}: {details}");
        }

        debug!("response from {} -> {}", &url, status);
        Ok(())
    }
}

impl Messenger for LineClient {
    async fn reply_text(&self, reply_token: &str, text: &str) -> anyhow::Result<()> {
        info!("reply to event");
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages: [OutboundMessage::Text { text }],
            },
        )
        .await
    }

    async fn push_text(&self, to: &str, text: &str) -> anyhow::Result<()> {
        info!("push message to {}", to);
        self.post(
            "/v2/bot/message/push",
            &PushRequest {
                to,
                messages: [OutboundMessage::Text { text }],
            },
        )
        .await
    }
}
