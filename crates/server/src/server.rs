use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};
use serde::Serialize;
use tracing::Instrument;

use std::sync::Arc;

use api_types::webhook::WebhookBody;
use line_bot::Bot;

use crate::{ServerError, signature};

static LINE_SIGNATURE_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-line-signature");

#[derive(Clone)]
pub struct ServerState {
    pub bot: Bot,
    pub channel_secret: Arc<str>,
}

impl ServerState {
    pub fn new(bot: Bot, channel_secret: &str) -> Self {
        Self {
            bot,
            channel_secret: Arc::from(channel_secret),
        }
    }
}

/// `TypedHeader` for the LINE webhook signature.
///
/// The raw value is kept; it is checked against the body in the handler.
#[derive(Debug)]
struct LineSignature(String);

impl Header for LineSignature {
    fn name() -> &'static axum::http::HeaderName {
        &LINE_SIGNATURE_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        Ok(LineSignature(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-line-signature header"),
        }
    }
}

#[derive(Serialize)]
struct Ack {
    message: &'static str,
}

async fn callback(
    State(state): State<ServerState>,
    signature_header: Option<TypedHeader<LineSignature>>,
    body: Bytes,
) -> Result<Json<Ack>, ServerError> {
    let Some(TypedHeader(LineSignature(received))) = signature_header else {
        return Err(ServerError::Unauthorized("missing signature".to_string()));
    };
    if !signature::verify(&state.channel_secret, &body, &received) {
        return Err(ServerError::Unauthorized("invalid signature".to_string()));
    }

    let payload: WebhookBody = serde_json::from_slice(&body)
        .map_err(|err| ServerError::Generic(format!("invalid webhook body: {err}")))?;

    let delivery = uuid::Uuid::new_v4();
    let span = tracing::info_span!("delivery", id = %delivery);
    tracing::info!(
        parent: &span,
        events = payload.events.len(),
        "webhook delivery received"
    );

    // Acknowledge right away; LINE redelivers on slow answers.
    let bot = state.bot.clone();
    tokio::spawn(
        async move {
            let summary = bot.handle_events(payload.events).await;
            tracing::info!(
                handled = summary.handled,
                failed = summary.failed,
                ignored = summary.ignored,
                "webhook delivery processed"
            );
        }
        .instrument(span),
    );

    Ok(Json(Ack { message: "OK" }))
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
