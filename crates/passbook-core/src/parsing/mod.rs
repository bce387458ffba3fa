pub mod dates;
pub mod matcher;
pub mod money;

pub use matcher::{ColumnarMatcher, RowMatcher};

use crate::model::{Statement, Table};

/// Run every raw line of a statement through the matcher, accumulating
/// matched rows in page/line order.
///
/// No deduplication and no cross-row validation: each row stands alone,
/// and a line that fails to match is silently dropped. An empty table is
/// a valid outcome; the caller decides whether to treat it as a failure.
pub fn parse_statement(statement: &Statement, matcher: &mut dyn RowMatcher) -> Table {
    let mut table = Table::default();

    for line in &statement.lines {
        if let Some(row) = matcher.match_line(line) {
            table.push(row);
        }
    }

    if table.is_empty() {
        log::warn!(
            "no transaction lines recognized in {} ({} raw lines, matcher '{}')",
            statement.path.display(),
            statement.lines.len(),
            matcher.format_name()
        );
    } else {
        log::info!(
            "{}: {} of {} lines parsed as transactions",
            statement.path.display(),
            table.len(),
            statement.lines.len()
        );
    }

    table
}
