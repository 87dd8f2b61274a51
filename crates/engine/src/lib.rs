//! Expense ledger engine.
//!
//! Parses chat messages into [`Command`]s, records expenses in a
//! spreadsheet-backed [`LedgerStore`] and renders the aggregate reports the
//! bot sends back.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};

pub use aggregate::{
    CURRENCY_SYMBOL, CategoryBalance, balance_by_category, format_balances, format_categories,
    format_user_totals, sum_by_user,
};
pub use command::{Command, Expense, InvalidReason, Keywords, Parser, parse};
pub use error::{EngineError, StoreError};
pub use ledger::{
    CATEGORY_HEADER, CREATED_AT_FORMAT, CategoryDefinition, LEDGER_HEADER, LedgerRow,
    decode_categories, decode_ledger_rows,
};
pub use money::{Amount, AmountError, MAX_PARSED_CENTS};
pub use period::PeriodClock;
pub use store::{Document, LedgerStore, MemoryStore, SheetRef};

mod aggregate;
mod command;
mod error;
mod ledger;
mod money;
mod period;
mod store;

type ResultEngine<T> = Result<T, EngineError>;

pub const DEFAULT_CATEGORY_SHEET: &str = "Categories";
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs one message end to end against the ledger document.
pub struct Engine {
    store: Arc<dyn LedgerStore>,
    document_id: String,
    category_sheet: String,
    parser: Parser,
    clock: PeriodClock,
    store_timeout: Duration,
    // One async lock per period key, so "find sheet, else create it" never
    // runs twice at once for the same month.
    period_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("document_id", &self.document_id)
            .field("category_sheet", &self.category_sheet)
            .field("clock", &self.clock)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Handles one message received at `now`.
    ///
    /// Returns the text to reply with, or `None` when the message needs no
    /// answer (a recorded expense).
    pub async fn handle_text(&self, text: &str, now: DateTime<Utc>) -> ResultEngine<Option<String>> {
        let command = self.parser.parse(text);
        tracing::debug!(?command, "parsed message");
        self.execute(command, now).await
    }

    pub async fn execute(&self, command: Command, now: DateTime<Utc>) -> ResultEngine<Option<String>> {
        match command {
            Command::RecordExpense(expense) => {
                self.record(expense, now).await?;
                Ok(None)
            }
            Command::QueryCurrentSpend => {
                let period = self.clock.period_key(now);
                let rows = self.period_rows(&period).await?;
                let totals = sum_by_user(&rows);
                if totals.is_empty() {
                    return Ok(Some(format!("No expenses recorded for {period}.")));
                }
                Ok(Some(format_user_totals(&totals)))
            }
            Command::QueryCategories => {
                let categories = self.categories().await?;
                if categories.is_empty() {
                    return Ok(Some("No categories defined.".to_string()));
                }
                Ok(Some(format_categories(&categories)))
            }
            Command::QueryBudgetBalance => {
                let categories = self.categories().await?;
                if categories.is_empty() {
                    return Ok(Some("No categories defined.".to_string()));
                }
                let rows = self.period_rows(&self.clock.period_key(now)).await?;
                let balances = balance_by_category(&categories, &rows);
                Ok(Some(format_balances(&balances)))
            }
            Command::Invalid { reason } => {
                tracing::debug!(reason = reason.as_str(), "rejected message");
                Ok(Some(reason.user_message().to_string()))
            }
        }
    }

    /// Appends the expense to the sheet of the period containing `now`,
    /// creating the sheet when needed.
    pub async fn record(&self, expense: Expense, now: DateTime<Utc>) -> ResultEngine<LedgerRow> {
        let period = self.clock.period_key(now);
        let sheet = self.period_sheet(&period).await?;
        let row = expense.into_row(self.clock.local_time(now));

        self.bounded(
            self.store
                .append_row(&self.document_id, &sheet, row.to_fields()),
        )
        .await?;
        tracing::info!(
            period = period.as_str(),
            user = row.user.as_str(),
            amount = %row.amount,
            "expense recorded"
        );
        Ok(row)
    }

    /// Expense rows of `period`. A period without a sheet has no rows.
    pub async fn period_rows(&self, period: &str) -> ResultEngine<Vec<LedgerRow>> {
        let document = self
            .bounded(self.store.resolve_document(&self.document_id))
            .await?;
        let Some(sheet) = document.find_sheet(period) else {
            return Ok(Vec::new());
        };
        let raw = self
            .bounded(self.store.fetch_rows(&self.document_id, sheet))
            .await?;
        Ok(decode_ledger_rows(period, &raw)?)
    }

    /// Category definitions, in sheet order.
    pub async fn categories(&self) -> ResultEngine<Vec<CategoryDefinition>> {
        let document = self
            .bounded(self.store.resolve_document(&self.document_id))
            .await?;
        let sheet = document
            .find_sheet(&self.category_sheet)
            .ok_or_else(|| StoreError::SheetNotFound(self.category_sheet.clone()))?;
        let raw = self
            .bounded(self.store.fetch_rows(&self.document_id, sheet))
            .await?;
        Ok(decode_categories(&self.category_sheet, &raw)?)
    }

    async fn period_sheet(&self, period: &str) -> ResultEngine<SheetRef> {
        let lock = self.period_lock(period);
        let _guard = lock.lock().await;

        let document = self
            .bounded(self.store.resolve_document(&self.document_id))
            .await?;
        if let Some(sheet) = document.find_sheet(period) {
            return Ok(sheet.clone());
        }

        tracing::info!(period, "creating period sheet");
        let sheet = self
            .bounded(
                self.store
                    .create_sheet(&self.document_id, period, &LEDGER_HEADER),
            )
            .await?;
        Ok(sheet)
    }

    fn period_lock(&self, period: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .period_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(period.to_string()).or_default().clone()
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    store: Option<Arc<dyn LedgerStore>>,
    document_id: String,
    category_sheet: String,
    keywords: Keywords,
    timezone: String,
    store_timeout: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            store: None,
            document_id: String::new(),
            category_sheet: DEFAULT_CATEGORY_SHEET.to_string(),
            keywords: Keywords::default(),
            timezone: "UTC".to_string(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl EngineBuilder {
    /// Pass the required ledger store
    pub fn store(mut self, store: Arc<dyn LedgerStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    /// Pass the required spreadsheet document id
    pub fn document_id(mut self, document_id: &str) -> EngineBuilder {
        self.document_id = document_id.to_string();
        self
    }

    pub fn category_sheet(mut self, title: &str) -> EngineBuilder {
        self.category_sheet = title.to_string();
        self
    }

    pub fn keywords(mut self, keywords: Keywords) -> EngineBuilder {
        self.keywords = keywords;
        self
    }

    /// IANA timezone used for period keys and timestamps.
    pub fn timezone(mut self, timezone: &str) -> EngineBuilder {
        self.timezone = timezone.to_string();
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.store_timeout = timeout;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Config("missing ledger store".to_string()))?;
        if self.document_id.trim().is_empty() {
            return Err(EngineError::Config("missing document id".to_string()));
        }
        if self.category_sheet.trim().is_empty() {
            return Err(EngineError::Config(
                "category sheet name must not be empty".to_string(),
            ));
        }
        if self.store_timeout.is_zero() {
            return Err(EngineError::Config(
                "store timeout must be positive".to_string(),
            ));
        }

        Ok(Engine {
            store,
            document_id: self.document_id,
            category_sheet: self.category_sheet,
            parser: Parser::new(self.keywords),
            clock: PeriodClock::from_name(&self.timezone)?,
            store_timeout: self.store_timeout,
            period_locks: Mutex::new(HashMap::new()),
        })
    }
}
