use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output column order is fixed regardless of how the bank lays out its
/// statement.
pub const COLUMNS: [&str; 5] = ["Date", "Particulars", "Debit", "Credit", "Balance"];

/// Extraction mode decided per page by the source reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    /// The page has an extractable text layer.
    Text,
    /// The page is a raster scan and needs OCR.
    ImageOnly,
}

/// One line of text as produced by extraction or OCR, with indices for
/// traceability back into the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLine {
    /// 1-indexed page number.
    pub page_number: usize,
    /// 0-indexed position of the line on its page.
    pub line_index: usize,
    pub text: String,
}

/// One input PDF. Lives only for the duration of a single conversion.
#[derive(Debug, Clone)]
pub struct Statement {
    pub path: PathBuf,
    pub page_count: usize,
    /// All extracted lines in page/line order.
    pub lines: Vec<RawLine>,
}

/// A parsed transaction line. Immutable once constructed; the parser
/// never revisits an emitted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub date: Option<NaiveDate>,
    pub particulars: String,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub balance: Option<Decimal>,
}

impl TransactionRow {
    /// A row needs at least one monetary field to be worth keeping.
    pub fn has_amount(&self) -> bool {
        self.debit.is_some() || self.credit.is_some() || self.balance.is_some()
    }
}

/// Ordered transaction rows for one statement, in page/line order.
/// Built in memory, serialized immediately, then discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<TransactionRow>,
}

impl Table {
    pub fn push(&mut self, row: TransactionRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
