//! Typed records stored in the spreadsheet and the single place where
//! positional store rows are turned into them.

use chrono::NaiveDateTime;

use crate::{Amount, StoreError};

/// Header of a period sheet, in column order.
pub const LEDGER_HEADER: [&str; 5] = ["User", "Description", "Amount", "Category", "CreatedAt"];

/// Header of the category definition sheet, in column order.
pub const CATEGORY_HEADER: [&str; 3] = ["ID", "Name", "Budget"];

/// Format of the `CreatedAt` column.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Index of the first data row in a sheet (row 1 is the header).
const FIRST_DATA_ROW: usize = 2;

/// One recorded expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerRow {
    pub user: String,
    pub description: String,
    pub amount: Amount,
    pub category: Option<String>,
    /// Wall-clock time in the ledger timezone.
    pub created_at: NaiveDateTime,
}

impl LedgerRow {
    /// Renders the row as sheet cells, in [`LEDGER_HEADER`] order.
    #[must_use]
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.user.clone(),
            self.description.clone(),
            self.amount.to_string(),
            self.category.clone().unwrap_or_default(),
            self.created_at.format(CREATED_AT_FORMAT).to_string(),
        ]
    }

    /// Reads a row from sheet cells. Returns `Ok(None)` for a blank row.
    pub fn from_fields(fields: &[String]) -> Result<Option<Self>, String> {
        if is_blank(fields) {
            return Ok(None);
        }
        check_width(fields, LEDGER_HEADER.len())?;

        let amount_cell = cell(fields, 2);
        let amount = amount_cell
            .parse::<Amount>()
            .map_err(|err| format!("Amount \"{amount_cell}\": {err}"))?;

        let created_cell = cell(fields, 4);
        let created_at = NaiveDateTime::parse_from_str(created_cell, CREATED_AT_FORMAT)
            .map_err(|err| format!("CreatedAt \"{created_cell}\": {err}"))?;

        let category = Some(cell(fields, 3))
            .filter(|c| !c.is_empty())
            .map(ToString::to_string);

        Ok(Some(Self {
            user: cell(fields, 0).to_string(),
            description: cell(fields, 1).to_string(),
            amount,
            category,
            created_at,
        }))
    }
}

/// A named, budgeted spending bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub id: i64,
    pub name: String,
    pub budget: Amount,
}

impl CategoryDefinition {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, budget: Amount) -> Self {
        Self {
            id,
            name: name.into(),
            budget,
        }
    }

    /// Reads a definition from sheet cells. Returns `Ok(None)` for a blank row.
    pub fn from_fields(fields: &[String]) -> Result<Option<Self>, String> {
        if is_blank(fields) {
            return Ok(None);
        }
        check_width(fields, CATEGORY_HEADER.len())?;

        let id_cell = cell(fields, 0);
        let id = id_cell
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("ID \"{id_cell}\" is not an integer"))?;

        let budget_cell = cell(fields, 2);
        let budget = budget_cell
            .trim()
            .parse::<Amount>()
            .map_err(|err| format!("Budget \"{budget_cell}\": {err}"))?;

        Ok(Some(Self {
            id,
            name: cell(fields, 1).to_string(),
            budget,
        }))
    }
}

/// Decodes the data rows of a period sheet.
pub fn decode_ledger_rows(sheet: &str, rows: &[Vec<String>]) -> Result<Vec<LedgerRow>, StoreError> {
    decode(sheet, rows, LedgerRow::from_fields)
}

/// Decodes the data rows of the category sheet.
pub fn decode_categories(
    sheet: &str,
    rows: &[Vec<String>],
) -> Result<Vec<CategoryDefinition>, StoreError> {
    decode(sheet, rows, CategoryDefinition::from_fields)
}

fn decode<T>(
    sheet: &str,
    rows: &[Vec<String>],
    read: impl Fn(&[String]) -> Result<Option<T>, String>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::with_capacity(rows.len());
    for (idx, fields) in rows.iter().enumerate() {
        match read(fields) {
            Ok(Some(record)) => out.push(record),
            Ok(None) => {}
            Err(reason) => {
                return Err(StoreError::MalformedRow {
                    sheet: sheet.to_string(),
                    row: idx + FIRST_DATA_ROW,
                    reason,
                });
            }
        }
    }
    Ok(out)
}

fn cell(fields: &[String], idx: usize) -> &str {
    fields.get(idx).map(String::as_str).unwrap_or("")
}

fn is_blank(fields: &[String]) -> bool {
    fields.iter().all(|f| f.trim().is_empty())
}

// Sheets drops trailing empty cells, so short rows are fine; extra filled
// cells are not.
fn check_width(fields: &[String], width: usize) -> Result<(), String> {
    if fields.iter().skip(width).any(|f| !f.trim().is_empty()) {
        return Err(format!("expected at most {width} columns, got {}", fields.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(ToString::to_string).collect()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap()
    }

    #[test]
    fn ledger_row_fields_round_trip() {
        let row = LedgerRow {
            user: "Alice".to_string(),
            description: "Lunch".to_string(),
            amount: Amount::new(1250),
            category: Some("2".to_string()),
            created_at: noon(),
        };
        let fields = row.to_fields();
        assert_eq!(fields, strings(&["Alice", "Lunch", "12.50", "2", "2026-10-19 12:30:00"]));
        assert_eq!(LedgerRow::from_fields(&fields), Ok(Some(row)));
    }

    #[test]
    fn empty_category_cell_is_absent() {
        let row = LedgerRow::from_fields(&strings(&["Bob", "Taxi", "9", "", "2026-10-19 12:30:00"]))
            .unwrap()
            .unwrap();
        assert_eq!(row.category, None);
        assert_eq!(row.amount, Amount::new(900));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let rows = vec![
            vec![],
            strings(&["", " ", ""]),
            strings(&["Bob", "Taxi", "9", "", "2026-10-19 12:30:00"]),
        ];
        let decoded = decode_ledger_rows("2026-10", &rows).unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn malformed_amount_reports_sheet_row() {
        let rows = vec![
            strings(&["Bob", "Taxi", "9", "", "2026-10-19 12:30:00"]),
            strings(&["Bob", "Taxi", "nine", "", "2026-10-19 12:30:00"]),
        ];
        let err = decode_ledger_rows("2026-10", &rows).unwrap_err();
        match err {
            StoreError::MalformedRow { sheet, row, reason } => {
                assert_eq!(sheet, "2026-10");
                assert_eq!(row, 3);
                assert!(reason.contains("nine"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_created_at_is_malformed() {
        let rows = vec![strings(&["Bob", "Taxi", "9"])];
        assert!(matches!(
            decode_ledger_rows("2026-10", &rows),
            Err(StoreError::MalformedRow { .. })
        ));
    }

    #[test]
    fn extra_filled_column_is_malformed() {
        let rows = vec![strings(&["1", "Food", "1000", "oops"])];
        assert!(decode_categories("Categories", &rows).is_err());

        let rows = vec![strings(&["1", "Food", "1000", ""])];
        assert_eq!(
            decode_categories("Categories", &rows).unwrap(),
            vec![CategoryDefinition::new(1, "Food", Amount::new(100_000))]
        );
    }

    #[test]
    fn category_id_must_be_integer() {
        let rows = vec![strings(&["one", "Food", "1000"])];
        assert!(decode_categories("Categories", &rows).is_err());
    }
}
