//! Ledger aggregator: pure reports over rows that were already fetched.

use std::collections::BTreeMap;

use crate::{Amount, CategoryDefinition, LedgerRow};

/// Prefix printed before money in reports.
pub const CURRENCY_SYMBOL: &str = "$";

/// Running totals of one category while rows are matched against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryBalance {
    pub id: i64,
    pub name: String,
    /// Remaining budget: the defined budget minus every matched expense.
    pub budget: Amount,
    pub expense: Amount,
    pub count: u32,
}

impl CategoryBalance {
    fn from_definition(def: &CategoryDefinition) -> Self {
        Self {
            id: def.id,
            name: def.name.clone(),
            budget: def.budget,
            expense: Amount::ZERO,
            count: 0,
        }
    }

    /// Average matched expense in whole units, `None` without expenses.
    #[must_use]
    pub fn average_units(&self) -> Option<i64> {
        self.expense.average_units(self.count)
    }
}

/// Total expense per user. Rows with an empty user are ignored, and so is a
/// row that would push its user's total out of range.
///
/// Keys come back sorted, so the result does not depend on row order.
pub fn sum_by_user<'a, I>(rows: I) -> BTreeMap<String, Amount>
where
    I: IntoIterator<Item = &'a LedgerRow>,
{
    let mut totals: BTreeMap<String, Amount> = BTreeMap::new();
    for row in rows {
        if row.user.is_empty() {
            continue;
        }
        let total = totals.entry(row.user.clone()).or_default();
        match total.checked_add(row.amount) {
            Some(sum) => *total = sum,
            None => tracing::warn!(
                user = row.user.as_str(),
                amount = %row.amount,
                "total out of range, expense skipped"
            ),
        }
    }
    totals
}

/// One `"<user>: $<total>"` line per user.
pub fn format_user_totals(totals: &BTreeMap<String, Amount>) -> String {
    totals
        .iter()
        .map(|(user, total)| format!("{user}: {CURRENCY_SYMBOL}{total}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `"ID: <id>, Name: <name>, Budget: <budget>"` line per category, in
/// input order.
pub fn format_categories(categories: &[CategoryDefinition]) -> String {
    categories
        .iter()
        .map(|c| format!("ID: {}, Name: {}, Budget: {}", c.id, c.name, c.budget))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Matches every categorized row against `categories`.
///
/// Rows referencing an unknown (or non-numeric) category id are logged and
/// left out of every balance, as are rows that would overflow one.
pub fn balance_by_category(
    categories: &[CategoryDefinition],
    rows: &[LedgerRow],
) -> Vec<CategoryBalance> {
    let mut balances: Vec<CategoryBalance> = categories
        .iter()
        .map(CategoryBalance::from_definition)
        .collect();

    for row in rows {
        let Some(raw) = row.category.as_deref() else {
            continue;
        };
        let matched = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|id| balances.iter_mut().find(|b| b.id == id));
        let Some(balance) = matched else {
            tracing::warn!(
                category = raw,
                user = row.user.as_str(),
                "category not found, expense skipped"
            );
            continue;
        };

        let (Some(expense), Some(budget)) = (
            balance.expense.checked_add(row.amount),
            balance.budget.checked_sub(row.amount),
        ) else {
            tracing::warn!(
                category = raw,
                user = row.user.as_str(),
                "balance out of range, expense skipped"
            );
            continue;
        };
        balance.expense = expense;
        balance.budget = budget;
        balance.count += 1;
    }

    balances
}

/// One `"<name>, Average price: $<avg>"` line per category, in category
/// order. Categories without expenses read `no expenses`.
pub fn format_balances(balances: &[CategoryBalance]) -> String {
    balances
        .iter()
        .map(|b| match b.average_units() {
            Some(avg) => format!("{}, Average price: {CURRENCY_SYMBOL}{avg}", b.name),
            None => format!("{}, Average price: no expenses", b.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
