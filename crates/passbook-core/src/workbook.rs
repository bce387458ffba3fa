//! Spreadsheet output.
//!
//! One sheet per statement with the fixed column order Date, Particulars,
//! Debit, Credit, Balance. The data range is registered as an Excel table
//! with banded rows so the result filters and sorts out of the box.

use crate::error::PassbookError;
use crate::model::{Table, COLUMNS};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Table as SheetTable, TableColumn, TableStyle, Workbook};
use std::path::{Path, PathBuf};

const SHEET_NAME: &str = "Statement";
const MONEY_FORMAT: &str = "#,##0.00";
const COLUMN_WIDTHS: [f64; 5] = [12.0, 60.0, 14.0, 14.0, 14.0];

/// The output lands next to the input, with the extension swapped.
pub fn derive_output_path(input: &Path) -> PathBuf {
    input.with_extension("xlsx")
}

/// Write the table to `out`. An empty table still produces a valid
/// workbook with only the header row.
pub fn write_table(table: &Table, out: &Path) -> Result<(), PassbookError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let money = Format::new().set_num_format(MONEY_FORMAT);

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        if let Some(date) = row.date {
            sheet.write_string(r, 0, date.format("%Y-%m-%d").to_string())?;
        }
        sheet.write_string(r, 1, &row.particulars)?;
        for (col, amount) in [(2u16, row.debit), (3, row.credit), (4, row.balance)] {
            if let Some(value) = amount {
                if let Some(f) = value.to_f64() {
                    sheet.write_number_with_format(r, col, f, &money)?;
                }
            }
        }
    }

    // An Excel table needs at least one data row; a header-only sheet is
    // written without the table dressing.
    if !table.is_empty() {
        let columns: Vec<TableColumn> = COLUMNS
            .iter()
            .map(|name| TableColumn::new().set_header(*name))
            .collect();
        let sheet_table = SheetTable::new()
            .set_style(TableStyle::Medium9)
            .set_columns(&columns);
        sheet.add_table(0, 0, table.len() as u32, (COLUMNS.len() - 1) as u16, &sheet_table)?;
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    workbook.save(out)?;
    log::info!("wrote {} rows to {}", table.len(), out.display());
    Ok(())
}
