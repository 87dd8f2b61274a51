use api_types::webhook::Event;
use chrono::Utc;

use crate::{BotError, ConfigParameters};

/// What happened to one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// Processed with no reply needed.
    Done,
    /// Processed and answered (or traced in debug mode).
    Replied(String),
    /// Not a text message.
    Ignored,
}

pub(crate) async fn handle_event(cfg: &ConfigParameters, event: Event) -> Result<EventOutcome, BotError> {
    let Some(text) = event.text() else {
        tracing::debug!(kind = event.kind.as_str(), "ignoring non-text event");
        return Ok(EventOutcome::Ignored);
    };

    let now = event.sent_at().unwrap_or_else(Utc::now);
    let Some(reply) = cfg.engine.handle_text(text, now).await? else {
        return Ok(EventOutcome::Done);
    };

    if cfg.debug {
        tracing::info!(reply = reply.as_str(), "debug mode, reply not sent");
        return Ok(EventOutcome::Replied(reply));
    }

    let Some(token) = event.reply_token.as_deref() else {
        tracing::warn!("event has no reply token, dropping reply");
        return Ok(EventOutcome::Done);
    };
    cfg.replier.reply(token, &reply).await?;
    Ok(EventOutcome::Replied(reply))
}
