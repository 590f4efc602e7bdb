//! Bot module serving the LINE webhook.
//!
//! This module provides the [`Bot`] which owns the stores and the LINE client,
//! and exposes the webhook endpoint the LINE platform posts events to.
//!
//! # Request Flow
//!
//! ```text
//! POST webhook → Verify signature → Parse events → EventRouter → 200 OK
//!                      │                  │              │
//!                      ▼                  ▼              ▼
//!                     400                500            500
//! ```
//!
//! # Example
//!
//! ```no_run
//! # use porter::bot::Bot;
//! # use porter::config::Config;
//! # async fn run() -> Result<(), anyhow::Error> {
//! let config = Config::load("config.yaml")?;
//!
//! let bot = Bot::new(config, "./porter-data").await?;
//! bot.start().await?; // Runs until ctrl-c
//! # Ok(())
//! # }
//! ```

use std::{path::Path, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use log::{debug, error, info};
use tokio::{fs, net::TcpListener, signal};

use crate::{
    access::{AuthStore, PendingRegistry},
    config::Config,
    line::{LineClient, SIGNATURE_HEADER, WebhookBody, verify_signature},
    roster::RosterStore,
    router::EventRouter,
};

/// Name of the roster file in the data directory.
const ROSTER_FILE: &str = "group_id.txt";
/// Name of the authentication records file in the data directory.
const AUTH_FILE: &str = "authenticated_users.json";

/// State shared by every webhook request.
struct AppState {
    /// Secret used to check the webhook signatures
    channel_secret: String,
    /// Handles the events of valid webhooks
    router: EventRouter<LineClient>,
}

/// Reasons for rejecting a webhook request.
#[derive(Debug)]
enum CallbackError {
    /// Missing signature, or signature not matching the body
    InvalidSignature,
    /// The body couldn't be parsed or an event couldn't be handled
    Processing(anyhow::Error),
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        match self {
            CallbackError::InvalidSignature => {
                (StatusCode::BAD_REQUEST, "Invalid signature.").into_response()
            }
            CallbackError::Processing(e) => {
                error!("failed to process webhook: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error processing the request.",
                )
                    .into_response()
            }
        }
    }
}

/// Main bot structure, ready to serve the webhook.
pub struct Bot {
    /// Address the HTTP server binds to
    address: String,
    /// Path of the webhook endpoint
    webhook_path: String,
    /// State handed to the webhook handler
    state: Arc<AppState>,
}

impl Bot {
    /// Creates a new Bot from the configuration and the data directory.
    ///
    /// The data directory is created if needed. It holds the roster and the
    /// authentication records; the password windows only live in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory can't be created or if the
    /// LINE client can't be built.
    pub async fn new(config: Config, data_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_path = data_path.as_ref();
        fs::create_dir_all(data_path).await?;

        let line_client = Arc::new(LineClient::new(
            &config.line.api_url,
            &config.line.access_token,
            config.line.request_timeout,
        )?);
        let roster = Arc::new(RosterStore::new(data_path.join(ROSTER_FILE)));
        let auth_store = AuthStore::new(data_path.join(AUTH_FILE), config.auth.password);

        let router = EventRouter::new(line_client, roster, auth_store, PendingRegistry::new());

        Ok(Bot {
            address: config.server.address,
            webhook_path: config.server.webhook_path,
            state: Arc::new(AppState {
                channel_secret: config.line.channel_secret,
                router,
            }),
        })
    }

    /// Serves the webhook until the process receives ctrl-c or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the address can't be bound or the server fails.
    pub async fn start(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.address).await?;
        info!(
            "listening on http://{}{}",
            listener.local_addr()?,
            &self.webhook_path
        );

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }

    /// Builds the HTTP routes.
    fn app(&self) -> Router {
        Router::new()
            .route(&self.webhook_path, post(callback))
            .with_state(Arc::clone(&self.state))
    }
}

/// Webhook endpoint: checks the signature then handles every event of the body.
async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, CallbackError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(&state.channel_secret, &body, signature) {
        info!("invalid signature error");
        return Err(CallbackError::InvalidSignature);
    }

    debug!("webhook body {}", String::from_utf8_lossy(&body));

    let webhook: WebhookBody = serde_json::from_slice(&body)
        .map_err(|e| CallbackError::Processing(anyhow::Error::new(e).context("invalid webhook body")))?;

    state
        .router
        .handle_webhook(&webhook)
        .await
        .map_err(CallbackError::Processing)?;

    Ok("OK")
}

/// Resolves when ctrl-c or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
