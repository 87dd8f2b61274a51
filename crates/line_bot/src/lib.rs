//! LINE bot.
//!
//! Receives webhook events already verified by the server, runs each text
//! message through the [`engine::Engine`] and answers with the Messaging API
//! reply endpoint.

use std::sync::Arc;

use api_types::webhook::Event;
use engine::{Engine, EngineError};

pub use api::{DEFAULT_API_URL, LineClient, ReplyError, ReplySender};
pub use handlers::EventOutcome;

mod api;
mod handlers;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("reply failed: {0}")]
    Reply(#[from] ReplyError),
}

/// Counters for one webhook delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub handled: usize,
    pub failed: usize,
    pub ignored: usize,
}

#[derive(Clone)]
pub(crate) struct ConfigParameters {
    engine: Arc<Engine>,
    replier: Arc<dyn ReplySender>,
    debug: bool,
}

#[derive(Clone)]
pub struct Bot {
    cfg: ConfigParameters,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.cfg.debug
    }

    /// Handles one event.
    pub async fn handle_event(&self, event: Event) -> Result<EventOutcome, BotError> {
        handlers::handle_event(&self.cfg, event).await
    }

    /// Handles every event of a delivery concurrently.
    ///
    /// A failing event is logged and counted; the others still run.
    pub async fn handle_events(&self, events: Vec<Event>) -> BatchSummary {
        let mut tasks = tokio::task::JoinSet::new();
        for event in events {
            let cfg = self.cfg.clone();
            tasks.spawn(async move {
                let id = event.webhook_event_id.clone().unwrap_or_default();
                let result = handlers::handle_event(&cfg, event).await;
                (id, result)
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(EventOutcome::Ignored))) => summary.ignored += 1,
                Ok((_, Ok(_))) => summary.handled += 1,
                Ok((id, Err(err))) => {
                    tracing::error!(event = id.as_str(), "failed to handle event: {err}");
                    summary.failed += 1;
                }
                Err(err) => {
                    tracing::error!("event task aborted: {err}");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[derive(Default)]
pub struct BotBuilder {
    engine: Option<Arc<Engine>>,
    replier: Option<Arc<dyn ReplySender>>,
    debug: bool,
}

impl BotBuilder {
    pub fn engine(mut self, engine: Arc<Engine>) -> BotBuilder {
        self.engine = Some(engine);
        self
    }

    pub fn replier(mut self, replier: Arc<dyn ReplySender>) -> BotBuilder {
        self.replier = Some(replier);
        self
    }

    /// In debug mode replies are only logged, never sent.
    pub fn debug(mut self, debug: bool) -> BotBuilder {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing line bot...");
        let engine = self.engine.ok_or_else(|| "missing engine".to_string())?;
        let replier = self
            .replier
            .ok_or_else(|| "missing reply sender".to_string())?;
        Ok(Bot {
            cfg: ConfigParameters {
                engine,
                replier,
                debug: self.debug,
            },
        })
    }
}
