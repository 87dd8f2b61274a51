//! Command interpreter.
//!
//! Turns one raw chat message into a [`Command`]. Parsing is pure and never
//! fails: bad input becomes [`Command::Invalid`].
//!
//! Rules:
//! - the message is **not** trimmed and is split on single spaces, so
//!   repeated or leading spaces produce empty tokens;
//! - a message equal to one of the [`Keywords`] is a query;
//! - anything else is `user description amount [category]`, i.e. 3 or 4
//!   tokens.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::{Amount, LedgerRow};

const MIN_RECORD_TOKENS: usize = 3;
const MAX_RECORD_TOKENS: usize = 4;

/// Reserved messages that trigger a query instead of a record.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub current_spend: String,
    pub categories: String,
    pub budget_balance: String,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            current_spend: "spending".to_string(),
            categories: "categories".to_string(),
            budget_balance: "balance".to_string(),
        }
    }
}

/// An expense to append to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub user: String,
    pub description: String,
    pub amount: Amount,
    /// Raw category id token, resolved only when balances are computed.
    pub category: Option<String>,
}

impl Expense {
    /// Builds the ledger row recorded at `created_at`.
    #[must_use]
    pub fn into_row(self, created_at: NaiveDateTime) -> LedgerRow {
        LedgerRow {
            user: self.user,
            description: self.description,
            amount: self.amount,
            category: self.category,
            created_at,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    /// Wrong number of tokens.
    Format,
    /// The amount token is not a number.
    Amount,
}

impl InvalidReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Amount => "amount",
        }
    }

    /// Text sent back to the chat.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Format => "Invalid message format",
            Self::Amount => "Invalid amount",
        }
    }
}

/// The typed intent of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    RecordExpense(Expense),
    QueryCurrentSpend,
    QueryCategories,
    QueryBudgetBalance,
    Invalid { reason: InvalidReason },
}

/// Parser bound to a set of query keywords.
#[derive(Clone, Debug, Default)]
pub struct Parser {
    keywords: Keywords,
}

impl Parser {
    #[must_use]
    pub fn new(keywords: Keywords) -> Self {
        Self { keywords }
    }

    pub fn parse(&self, message: &str) -> Command {
        if message == self.keywords.current_spend {
            return Command::QueryCurrentSpend;
        }
        if message == self.keywords.categories {
            return Command::QueryCategories;
        }
        if message == self.keywords.budget_balance {
            return Command::QueryBudgetBalance;
        }

        let tokens: Vec<&str> = message.split(' ').collect();
        if !(MIN_RECORD_TOKENS..=MAX_RECORD_TOKENS).contains(&tokens.len()) {
            return Command::Invalid {
                reason: InvalidReason::Format,
            };
        }

        let Ok(amount) = tokens[2].parse::<Amount>() else {
            return Command::Invalid {
                reason: InvalidReason::Amount,
            };
        };

        Command::RecordExpense(Expense {
            user: tokens[0].to_string(),
            description: tokens[1].to_string(),
            amount,
            category: tokens.get(3).map(ToString::to_string),
        })
    }
}

/// Parses with the default keywords.
pub fn parse(message: &str) -> Command {
    Parser::default().parse(message)
}
