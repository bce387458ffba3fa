use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Strict money: requires .00 style decimals so reference numbers like
/// "009" or "123456" are never captured.
const MONEY_PATTERN: &str = r"(?:\d{1,3}(?:,\d{3})*|\d+)\.\d{2}";

/// Currency symbols stripped when slicing the particulars text.
pub const CURRENCY_SYMBOLS: [char; 4] = ['₹', '$', '€', '£'];

pub fn money_regex() -> Regex {
    Regex::new(MONEY_PATTERN).expect("money pattern is valid")
}

/// A monetary token found in a raw line, with its byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyToken {
    pub start: usize,
    pub end: usize,
    pub value: Decimal,
}

/// Find all money tokens in a line.
///
/// The regex crate has no lookaround, so the digit-boundary guards of
/// the classic `(?<!\d)...(?!\d)` money pattern are checked against the
/// surrounding bytes instead: a match glued to further digits (as in
/// "1234.5678") is rejected.
pub fn find_money_tokens(rx: &Regex, line: &str) -> Vec<MoneyToken> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();

    for m in rx.find_iter(line) {
        if m.start() > 0 && bytes[m.start() - 1].is_ascii_digit() {
            continue;
        }
        if m.end() < bytes.len() && bytes[m.end()].is_ascii_digit() {
            continue;
        }
        let cleaned = m.as_str().replace(',', "");
        if let Ok(value) = Decimal::from_str(&cleaned) {
            out.push(MoneyToken {
                start: m.start(),
                end: m.end(),
                value,
            });
        }
    }

    out
}
