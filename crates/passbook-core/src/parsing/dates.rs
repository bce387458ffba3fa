use chrono::NaiveDate;
use regex::Regex;

/// A date token found in a raw line, normalized to a canonical date.
#[derive(Debug, Clone, PartialEq)]
pub struct DateToken {
    pub start: usize,
    pub end: usize,
    pub date: NaiveDate,
}

/// Recognizes the day-first date styles banks print:
/// 01-06-2023, 1/6/23, 01.06.2023, 01 Jun 2023, 01-JUN-23.
pub struct DateFinder {
    patterns: Vec<Regex>,
}

impl DateFinder {
    pub fn new() -> Self {
        let sources = [
            r"\b\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}\b",
            r"\b\d{1,2}\s+[A-Za-z]{3,9}\s+\d{2,4}\b",
            r"\b\d{1,2}[-/.][A-Za-z]{3}[-/.]\d{2,4}\b",
        ];
        DateFinder {
            patterns: sources
                .iter()
                .map(|s| Regex::new(s).expect("date pattern is valid"))
                .collect(),
        }
    }

    /// Find the leftmost parseable date token in a line.
    pub fn find(&self, line: &str) -> Option<DateToken> {
        let mut best: Option<DateToken> = None;
        for rx in &self.patterns {
            for m in rx.find_iter(line) {
                if let Some(date) = parse_token(m.as_str()) {
                    let better = match &best {
                        Some(b) => m.start() < b.start,
                        None => true,
                    };
                    if better {
                        best = Some(DateToken {
                            start: m.start(),
                            end: m.end(),
                            date,
                        });
                    }
                    break; // leftmost per pattern is enough
                }
            }
        }
        best
    }
}

impl Default for DateFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one date token, day first. Separators are normalized to '-'
/// before trying the format list; spelled-out months keep their spaces.
fn parse_token(token: &str) -> Option<NaiveDate> {
    const DASHED: [&str; 5] = ["%d-%m-%Y", "%d-%m-%y", "%d-%b-%Y", "%d-%b-%y", "%d-%B-%Y"];
    const SPACED: [&str; 3] = ["%d %b %Y", "%d %b %y", "%d %B %Y"];

    if token.contains(char::is_whitespace) {
        let collapsed = token.split_whitespace().collect::<Vec<_>>().join(" ");
        for fmt in SPACED {
            if let Ok(d) = NaiveDate::parse_from_str(&collapsed, fmt) {
                return Some(d);
            }
        }
        return None;
    }

    let dashed = token.replace(['/', '.'], "-");
    for fmt in DASHED {
        if let Ok(d) = NaiveDate::parse_from_str(&dashed, fmt) {
            return Some(d);
        }
    }
    None
}
