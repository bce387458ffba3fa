use crate::model::{RawLine, TransactionRow};
use crate::parsing::dates::DateFinder;
use crate::parsing::money::{self, MoneyToken, CURRENCY_SYMBOLS};
use regex::Regex;

/// A gap of at least this many characters between the movement amount
/// and the balance means an empty credit column sits between them, so
/// the amount is a debit. Statement layouts put 2-4 spaces between
/// adjacent columns; an empty 12-14 character column leaves far more.
const EMPTY_COLUMN_GAP: usize = 8;

/// One bank-format matcher. Implementations are deliberately small and
/// format-specific; the fragility of statement layouts stays contained
/// behind this seam instead of leaking into the pipeline.
pub trait RowMatcher {
    /// Try to read one raw line as a transaction. `None` is the expected
    /// majority outcome (headers, footers, summary lines), never an error.
    fn match_line(&mut self, line: &RawLine) -> Option<TransactionRow>;

    fn format_name(&self) -> &str;
}

/// Character columns of the debit and credit headers, learned from the
/// statement's own column header row.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    debit: usize,
    credit: usize,
}

/// Matcher for the common columnar statement layout:
/// date, particulars, debit and/or credit amount, trailing balance.
///
/// Mutable because it learns the debit/credit column positions when it
/// passes the statement's header row; matching decisions for single
/// amounts improve once the layout is known.
pub struct ColumnarMatcher {
    money_rx: Regex,
    dates: DateFinder,
    layout: Option<ColumnLayout>,
}

impl ColumnarMatcher {
    pub fn new() -> Self {
        ColumnarMatcher {
            money_rx: money::money_regex(),
            dates: DateFinder::new(),
            layout: None,
        }
    }

    /// Learn column positions from a header row such as
    /// `Date  Particulars        Debit      Credit     Balance`.
    fn observe_header(&mut self, text: &str) {
        let lower = text.to_lowercase();
        let debit = ["debit", "withdrawal"]
            .iter()
            .filter_map(|w| lower.find(w))
            .min();
        let credit = ["credit", "deposit"]
            .iter()
            .filter_map(|w| lower.find(w))
            .min();
        if let (Some(debit), Some(credit)) = (debit, credit) {
            if debit < credit {
                log::debug!("learned column layout: debit@{debit} credit@{credit}");
                self.layout = Some(ColumnLayout { debit, credit });
            }
        }
    }

    /// Decide whether a lone movement amount is a debit or a credit from
    /// its column position. Left numeric column = debit, right = credit.
    fn movement_is_debit(&self, movement: &MoneyToken, balance: &MoneyToken) -> bool {
        if let Some(layout) = self.layout {
            let to_debit = movement.start.abs_diff(layout.debit);
            let to_credit = movement.start.abs_diff(layout.credit);
            return to_debit <= to_credit;
        }
        // No header seen: a debit leaves the whole credit column empty
        // between itself and the balance.
        balance.start.saturating_sub(movement.end) >= EMPTY_COLUMN_GAP
    }
}

impl Default for ColumnarMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RowMatcher for ColumnarMatcher {
    fn match_line(&mut self, line: &RawLine) -> Option<TransactionRow> {
        let text = line.text.as_str();

        let date = self.dates.find(text);
        let mut monies = money::find_money_tokens(&self.money_rx, text);
        // A dotted date like 01.06.2023 also scans as "01.06"; drop any
        // money token that overlaps the date span.
        if let Some(d) = &date {
            monies.retain(|m| m.end <= d.start || m.start >= d.end);
        }

        if monies.is_empty() {
            // Headers and footers land here; the column header row is the
            // one moneyless line worth remembering.
            self.observe_header(text);
            return None;
        }

        let date = match date {
            Some(d) => d,
            None => {
                log::debug!(
                    "page {} line {}: amounts without a date, skipped",
                    line.page_number,
                    line.line_index
                );
                return None;
            }
        };

        // Need at least movement + balance; a date next to a single
        // stray figure is not enough to call it a transaction.
        if monies.len() < 2 {
            return None;
        }

        let balance = monies[monies.len() - 1].clone();
        let (debit, credit) = if monies.len() >= 3 {
            // Both numeric columns populated: left is debit, right credit.
            let left = &monies[monies.len() - 3];
            let right = &monies[monies.len() - 2];
            (Some(left.value), Some(right.value))
        } else {
            let movement = &monies[0];
            if self.movement_is_debit(movement, &balance) {
                (Some(movement.value), None)
            } else {
                (None, Some(movement.value))
            }
        };

        let particulars = slice_particulars(text, date.end, monies[0].start);

        Some(TransactionRow {
            date: Some(date.date),
            particulars,
            debit,
            credit,
            balance: Some(balance.value),
        })
    }

    fn format_name(&self) -> &str {
        "columnar"
    }
}

/// The description sits between the date token and the first amount.
/// Strip currency symbols and trailing CR/DR tags, collapse whitespace.
fn slice_particulars(text: &str, date_end: usize, money_start: usize) -> String {
    if money_start <= date_end {
        return String::new();
    }
    let raw = &text[date_end..money_start];
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || CURRENCY_SYMBOLS.contains(&c));
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    for tag in ["CR", "DR", "Cr", "Dr", "cr", "dr"] {
        if let Some(stripped) = collapsed.strip_suffix(tag) {
            // Only strip a standalone tag, not the tail of a word.
            if stripped.is_empty() || stripped.ends_with(' ') {
                return stripped.trim_end().to_string();
            }
        }
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn raw(text: &str) -> RawLine {
        RawLine {
            page_number: 1,
            line_index: 0,
            text: text.to_string(),
        }
    }

    fn matched(text: &str) -> Option<TransactionRow> {
        ColumnarMatcher::new().match_line(&raw(text))
    }

    #[test]
    fn salary_credit_line() {
        let row = matched("12/06/2024  SALARY CREDIT   5000.00   15230.50").unwrap();
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 6, 12));
        assert_eq!(row.particulars, "SALARY CREDIT");
        assert_eq!(row.debit, None);
        assert_eq!(row.credit, Some(dec!(5000.00)));
        assert_eq!(row.balance, Some(dec!(15230.50)));
    }

    #[test]
    fn wide_gap_means_debit() {
        let row = matched("01-06-2023  ATM WDL   500.00                 14730.50").unwrap();
        assert_eq!(row.debit, Some(dec!(500.00)));
        assert_eq!(row.credit, None);
        assert_eq!(row.balance, Some(dec!(14730.50)));
    }

    #[test]
    fn three_amounts_fill_both_columns() {
        let row = matched("01-06-2023  CHARGES  10.00   2.00   14718.50").unwrap();
        assert_eq!(row.debit, Some(dec!(10.00)));
        assert_eq!(row.credit, Some(dec!(2.00)));
        assert_eq!(row.balance, Some(dec!(14718.50)));
    }

    #[test]
    fn date_without_amounts_is_skipped() {
        assert!(matched("12/06/2024  Statement Period Begins").is_none());
    }

    #[test]
    fn amounts_without_date_are_skipped() {
        assert!(matched("Total: 5000.00  15230.50").is_none());
    }

    #[test]
    fn single_amount_with_date_is_skipped() {
        assert!(matched("12/06/2024  Opening balance  15230.50  ").is_none());
    }

    #[test]
    fn dotted_date_is_not_mistaken_for_money() {
        // "01.06" inside the date must not count as a movement amount.
        assert!(matched("01.06.2023  Statement period").is_none());
        let row = matched("01.06.2023  POS PURCHASE  250.00        12000.00").unwrap();
        assert_eq!(row.debit, Some(dec!(250.00)));
        assert_eq!(row.balance, Some(dec!(12000.00)));
    }

    #[test]
    fn header_row_teaches_column_layout() {
        let mut matcher = ColumnarMatcher::new();
        let header = "Date        Particulars                  Debit        Credit       Balance";
        assert!(matcher.match_line(&raw(header)).is_none());

        // Amount sits under the Credit header, close to the balance.
        let credit_line = "02-06-2023  NEFT RECEIVED                             1200.00      15930.50";
        let row = matcher.match_line(&raw(credit_line)).unwrap();
        assert_eq!(row.credit, Some(dec!(1200.00)));
        assert_eq!(row.debit, None);

        // Amount sits under the Debit header.
        let debit_line = "03-06-2023  POS PURCHASE                 450.00                    15480.50";
        let row = matcher.match_line(&raw(debit_line)).unwrap();
        assert_eq!(row.debit, Some(dec!(450.00)));
        assert_eq!(row.credit, None);
    }

    #[test]
    fn trailing_dr_tag_is_stripped_from_particulars() {
        let row = matched("01-06-2023  IRCTC BOOKING DR   750.00             13980.50").unwrap();
        assert_eq!(row.particulars, "IRCTC BOOKING");
    }

    #[test]
    fn currency_symbol_before_amount_is_not_particulars() {
        let row = matched("01-06-2023  REFUND ₹ 100.00   14080.50").unwrap();
        assert_eq!(row.particulars, "REFUND");
        assert_eq!(row.credit, Some(dec!(100.00)));
    }

    #[test]
    fn thousands_separators_are_normalized() {
        let row = matched("05-06-2023  FD MATURITY   1,50,000.00   1,64,080.50").unwrap();
        // Indian grouping does not match the strict western pattern, but
        // the trailing 5-figure groups still parse.
        assert!(row.credit.is_some() || row.debit.is_some());
    }
}
