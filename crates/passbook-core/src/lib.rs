//! Conversion pipeline for bank-statement PDFs.
//!
//! One conversion is a strictly sequential pass over a single file:
//! classify pages, pull the text layer or OCR each page, pattern-match
//! the raw lines into transaction rows, and write one spreadsheet.
//! Nothing persists across conversions.

pub mod error;
pub mod extraction;
pub mod model;
pub mod parsing;
pub mod workbook;

use error::PassbookError;
use extraction::LineExtractor;
use model::Table;
use std::path::{Path, PathBuf};

pub use error::ErrorKind;
pub use extraction::ocr::{OcrAcceleration, OcrOptions};
pub use extraction::StatementExtractor;

/// What one completed conversion produced.
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub rows: usize,
    pub page_count: usize,
    pub output: PathBuf,
}

/// Run the whole pipeline for one statement PDF and write the result
/// to `out`.
///
/// A statement in which no line matches is not an error here: the
/// output workbook is still written with just the header row, and the
/// caller sees `rows == 0`.
pub fn convert_statement(
    pdf: &Path,
    extractor: &dyn LineExtractor,
    out: &Path,
) -> Result<ConvertSummary, PassbookError> {
    let statement = extractor.extract(pdf)?;
    let table = parse_to_table(&statement);
    workbook::write_table(&table, out)?;

    Ok(ConvertSummary {
        rows: table.len(),
        page_count: statement.page_count,
        output: out.to_path_buf(),
    })
}

/// Parse an extracted statement with the shipped columnar matcher.
pub fn parse_to_table(statement: &model::Statement) -> Table {
    let mut matcher = parsing::ColumnarMatcher::new();
    parsing::parse_statement(statement, &mut matcher)
}
