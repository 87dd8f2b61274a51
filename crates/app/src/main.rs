use std::{sync::Arc, time::Duration};

use engine::{CATEGORY_HEADER, LedgerStore, MemoryStore};
use settings::{AppError, StoreKind};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger_bot={level},line_bot={level},server={level},engine={level},sheets={level}",
            level = settings.app.level
        ))
        .init();

    let store = build_store(&settings.store, &settings.ledger).await?;
    let engine = engine::Engine::builder()
        .store(store)
        .document_id(&settings.store.document_id)
        .category_sheet(&settings.ledger.category_sheet)
        .keywords(settings.ledger.keywords.clone())
        .timezone(&settings.ledger.timezone)
        .store_timeout(Duration::from_secs(settings.store.timeout_secs))
        .build()?;

    let replier = match &settings.line.api_url {
        Some(url) => line_bot::LineClient::with_base_url(&settings.line.access_token, url)?,
        None => line_bot::LineClient::new(&settings.line.access_token)?,
    };
    let bot = line_bot::Bot::builder()
        .engine(Arc::new(engine))
        .replier(Arc::new(replier))
        .debug(settings.app.debug)
        .build()?;
    if bot.is_debug() {
        tracing::warn!("debug mode: replies are logged, not sent");
    }

    let bind = settings
        .server
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(AppError::from)?;

    let state = server::ServerState::new(bot, &settings.line.channel_secret);
    if let Err(err) = server::run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
        return Err(err.into());
    }

    Ok(())
}

async fn build_store(
    store: &settings::Store,
    ledger: &settings::Ledger,
) -> Result<Arc<dyn LedgerStore>, Box<dyn std::error::Error + Send + Sync>> {
    match store.kind {
        StoreKind::Memory => {
            tracing::info!("using in-memory ledger store");
            let memory = MemoryStore::new();
            memory
                .seed_sheet(
                    &store.document_id,
                    &ledger.category_sheet,
                    &CATEGORY_HEADER,
                    Vec::new(),
                )
                .await;
            Ok(Arc::new(memory))
        }
        StoreKind::Sheets => {
            let token = store.access_token.as_deref().ok_or_else(|| {
                AppError::Invalid("store.access_token is required for the sheets store".to_string())
            })?;
            let sheets = match &store.base_url {
                Some(url) => sheets::SheetsStore::with_base_url(token, url)?,
                None => sheets::SheetsStore::new(token)?,
            };
            tracing::info!(document = %store.document_id, "using Google Sheets ledger store");
            Ok(Arc::new(sheets))
        }
    }
}
