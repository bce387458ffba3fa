//! OCR extraction for image-only pages.
//!
//! Rasterizes one page at a time with `pdftoppm` (poppler-utils) and runs
//! `tesseract` over the bitmap. Tesseract's TSV output is used so each
//! recognized line carries a confidence value.

use crate::error::PassbookError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

const OCR_DPI: u32 = 300;
const OCR_LANGUAGE: &str = "eng";

/// Whether the OCR engine may use hardware acceleration (tesseract's
/// OpenMP thread pool). Modeled as an explicit setting rather than
/// environment sniffing so pipeline behavior stays deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrAcceleration {
    /// Attempt the accelerated path; fall back to single-threaded
    /// execution if the accelerated invocation fails.
    Enabled,
    /// Always run single-threaded.
    #[default]
    Disabled,
}

#[derive(Debug, Clone)]
pub struct OcrOptions {
    pub acceleration: OcrAcceleration,
    pub dpi: u32,
    pub language: String,
}

impl Default for OcrOptions {
    fn default() -> Self {
        OcrOptions {
            acceleration: OcrAcceleration::Disabled,
            dpi: OCR_DPI,
            language: OCR_LANGUAGE.to_string(),
        }
    }
}

/// One recognized line. Confidence is the mean of tesseract's per-word
/// confidences; it is carried for diagnostics but ignored downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    pub confidence: Option<f32>,
}

pub struct OcrEngine {
    options: OcrOptions,
}

impl OcrEngine {
    pub fn new(options: OcrOptions) -> Self {
        OcrEngine { options }
    }

    /// Check if pdftoppm and tesseract are available on the system.
    pub fn is_available() -> bool {
        let pdftoppm = Command::new("pdftoppm").arg("-v").output().is_ok();
        let tesseract = Command::new("tesseract").arg("--version").output().is_ok();
        if !pdftoppm {
            log::debug!("pdftoppm not found - install poppler-utils for OCR support");
        }
        if !tesseract {
            log::debug!("tesseract not found - install tesseract-ocr for OCR support");
        }
        pdftoppm && tesseract
    }

    /// Rasterize a single page and run recognition over the bitmap.
    ///
    /// With acceleration enabled, a failed multi-threaded run is retried
    /// single-threaded instead of failing the whole file.
    pub fn recognize_page(
        &self,
        pdf: &Path,
        page_number: usize,
    ) -> Result<Vec<OcrLine>, PassbookError> {
        if !Self::is_available() {
            return Err(PassbookError::OcrUnavailable);
        }

        let dir = tempfile::tempdir()?;
        let image = self.rasterize_page(pdf, page_number, dir.path())?;

        run_with_fallback(self.options.acceleration, page_number, |limit| {
            self.run_tesseract(&image, page_number, limit)
        })
    }

    /// Render one page to a PNG via `pdftoppm -f N -l N`.
    fn rasterize_page(
        &self,
        pdf: &Path,
        page_number: usize,
        dir: &Path,
    ) -> Result<std::path::PathBuf, PassbookError> {
        let prefix = dir.join("page");
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.options.dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PassbookError::OcrUnavailable
                } else {
                    PassbookError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(PassbookError::PdftoppmFailed {
                page: page_number,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // pdftoppm appends a page suffix with variable zero-padding; for a
        // single-page render just take the one PNG it produced.
        let mut pngs: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
            .collect();
        pngs.sort();

        pngs.into_iter()
            .next()
            .ok_or_else(|| PassbookError::PdftoppmFailed {
                page: page_number,
                stderr: "no image produced".into(),
            })
    }

    fn run_tesseract(
        &self,
        image: &Path,
        page_number: usize,
        limit: ThreadLimit,
    ) -> Result<Vec<OcrLine>, PassbookError> {
        let mut cmd = Command::new("tesseract");
        cmd.arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.language)
            .arg("--psm")
            .arg("6") // uniform text block keeps table rows as single lines
            .arg("tsv");
        if limit == ThreadLimit::Single {
            cmd.env("OMP_THREAD_LIMIT", "1");
        }

        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PassbookError::OcrUnavailable
            } else {
                PassbookError::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(PassbookError::TesseractFailed {
                page: page_number,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let lines = parse_tsv(&tsv, self.options.dpi);
        log::debug!("OCR page {page_number}: {} lines recognized", lines.len());
        Ok(lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadLimit {
    Unlimited,
    Single,
}

/// The sequence of tesseract invocations to attempt for a page.
fn attempt_plan(acceleration: OcrAcceleration) -> &'static [ThreadLimit] {
    match acceleration {
        OcrAcceleration::Enabled => &[ThreadLimit::Unlimited, ThreadLimit::Single],
        OcrAcceleration::Disabled => &[ThreadLimit::Single],
    }
}

/// Run the attempt plan for a page: a failed accelerated attempt is
/// retried single-threaded, and the error only propagates when no retry
/// remains.
fn run_with_fallback<F>(
    acceleration: OcrAcceleration,
    page_number: usize,
    mut attempt: F,
) -> Result<Vec<OcrLine>, PassbookError>
where
    F: FnMut(ThreadLimit) -> Result<Vec<OcrLine>, PassbookError>,
{
    let mut plan = attempt_plan(acceleration).iter();
    let first = plan.next().unwrap_or(&ThreadLimit::Single);
    match attempt(*first) {
        Ok(lines) => Ok(lines),
        Err(e) => match plan.next() {
            Some(retry) => {
                log::warn!(
                    "accelerated OCR failed on page {page_number}: {e}; retrying single-threaded"
                );
                attempt(*retry)
            }
            None => Err(e),
        },
    }
}

/// Approximate character cell width in pixels for a given render dpi.
/// Statement tables print around 10 characters per inch; the mapping
/// only needs to be coarse enough that the gaps between table columns
/// survive into the text.
fn char_cell_px(dpi: u32) -> usize {
    (dpi / 10).max(1) as usize
}

/// Group tesseract TSV word entries (level 5) into lines.
///
/// TSV columns: level page block par line word left top width height conf text.
/// Words sharing a (block, par, line) key belong to one physical line and
/// arrive in left-to-right order. Each word is placed at the character
/// column its `left` pixel coordinate maps to, so scanned pages keep the
/// same whitespace layout that `pdftotext -layout` gives text pages and
/// the parser's column rules apply to both. Confidence is averaged over
/// the words; -1 marks non-word entries and is skipped.
fn parse_tsv(tsv: &str, dpi: u32) -> Vec<OcrLine> {
    let cell = char_cell_px(dpi);
    let mut out = Vec::new();
    let mut key: Option<(u32, u32, u32)> = None;
    let mut words: Vec<(usize, &str)> = Vec::new();
    let mut confidences: Vec<f32> = Vec::new();

    fn flush(words: &mut Vec<(usize, &str)>, confidences: &mut Vec<f32>, out: &mut Vec<OcrLine>) {
        if words.is_empty() {
            return;
        }
        let mut text = String::new();
        let mut len = 0usize;
        for (column, word) in words.drain(..) {
            // Words stay in order and never fuse even when the cell
            // mapping rounds two of them onto the same column.
            let column = if len == 0 { column } else { column.max(len + 1) };
            for _ in len..column {
                text.push(' ');
            }
            text.push_str(word);
            len = column + word.chars().count();
        }
        let confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        };
        out.push(OcrLine { text, confidence });
        confidences.clear();
    }

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let (block, par, line) = match (
            cols[2].parse::<u32>(),
            cols[3].parse::<u32>(),
            cols[4].parse::<u32>(),
        ) {
            (Ok(b), Ok(p), Ok(l)) => (b, p, l),
            _ => continue,
        };
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }

        if key != Some((block, par, line)) {
            flush(&mut words, &mut confidences, &mut out);
            key = Some((block, par, line));
        }
        let left = cols[6].parse::<usize>().unwrap_or(0);
        words.push((left / cell, text));
        if let Ok(conf) = cols[10].parse::<f32>() {
            if conf >= 0.0 {
                confidences.push(conf);
            }
        }
    }
    flush(&mut words, &mut confidences, &mut out);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::RawLine;
    use crate::parsing::{ColumnarMatcher, RowMatcher};
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, line: u32, word: u32, left: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t{block}\t1\t{line}\t{word}\t{left}\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn groups_words_into_lines() {
        let tsv = [
            HEADER.to_string(),
            "4\t1\t1\t1\t1\t0\t0\t0\t10\t10\t-1\t".to_string(),
            word(1, 1, 1, 0, "91.0", "01-06-2023"),
            word(1, 1, 2, 0, "88.0", "ATM"),
            word(1, 1, 3, 0, "85.0", "500.00"),
            word(1, 2, 1, 0, "90.0", "Closing"),
            word(1, 2, 2, 0, "92.0", "Balance"),
        ]
        .join("\n");

        let lines = parse_tsv(&tsv, 300);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "01-06-2023 ATM 500.00");
        assert_eq!(lines[1].text, "Closing Balance");
        assert!((lines[0].confidence.unwrap() - 88.0).abs() < 0.01);
    }

    #[test]
    fn skips_blank_words_and_non_word_rows() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 0, "-1", "   "),
            word(1, 1, 2, 0, "80.0", "only"),
        ]
        .join("\n");

        let lines = parse_tsv(&tsv, 300);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "only");
    }

    #[test]
    fn empty_tsv_yields_no_lines() {
        assert!(parse_tsv(HEADER, 300).is_empty());
        assert!(parse_tsv("", 300).is_empty());
    }

    #[test]
    fn word_columns_follow_left_coordinates() {
        // At 300 dpi one character cell is 30 px wide.
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 0, "90.0", "01-06-2023"),
            word(1, 1, 2, 360, "90.0", "ATM"),
            word(1, 1, 3, 900, "90.0", "500.00"),
            word(1, 1, 4, 1800, "90.0", "14730.50"),
        ]
        .join("\n");

        let lines = parse_tsv(&tsv, 300);
        let text = &lines[0].text;
        assert_eq!(text.find("ATM"), Some(12));
        assert_eq!(text.find("500.00"), Some(30));
        assert_eq!(text.find("14730.50"), Some(60));
    }

    #[test]
    fn crowded_words_never_fuse() {
        // Both words round to column 0; they still come out separated.
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 5, "90.0", "ATM"),
            word(1, 1, 2, 20, "90.0", "WDL"),
        ]
        .join("\n");

        let lines = parse_tsv(&tsv, 300);
        assert_eq!(lines[0].text, "ATM WDL");
    }

    #[test]
    fn scanned_withdrawal_keeps_its_debit_column() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, 0, "91.0", "01-06-2023"),
            word(1, 1, 2, 360, "88.0", "ATM"),
            word(1, 1, 3, 490, "87.0", "WITHDRAWAL"),
            word(1, 1, 4, 900, "85.0", "500.00"),
            word(1, 1, 5, 1800, "90.0", "14730.50"),
        ]
        .join("\n");

        let lines = parse_tsv(&tsv, 300);
        let row = ColumnarMatcher::new()
            .match_line(&RawLine {
                page_number: 1,
                line_index: 0,
                text: lines[0].text.clone(),
            })
            .unwrap();
        assert_eq!(row.particulars, "ATM WITHDRAWAL");
        assert_eq!(row.debit, Some(dec!(500.00)));
        assert_eq!(row.credit, None);
        assert_eq!(row.balance, Some(dec!(14730.50)));
    }

    #[test]
    fn acceleration_enabled_retries_single_threaded() {
        assert_eq!(
            attempt_plan(OcrAcceleration::Enabled),
            &[ThreadLimit::Unlimited, ThreadLimit::Single]
        );
        assert_eq!(
            attempt_plan(OcrAcceleration::Disabled),
            &[ThreadLimit::Single]
        );
    }

    #[test]
    fn accelerated_failure_falls_back_and_completes() {
        let mut seen = Vec::new();
        let result = run_with_fallback(OcrAcceleration::Enabled, 1, |limit| {
            seen.push(limit);
            if limit == ThreadLimit::Unlimited {
                Err(PassbookError::TesseractFailed {
                    page: 1,
                    stderr: "omp abort".into(),
                })
            } else {
                Ok(vec![OcrLine {
                    text: "recovered".into(),
                    confidence: None,
                }])
            }
        });

        assert_eq!(seen, [ThreadLimit::Unlimited, ThreadLimit::Single]);
        assert_eq!(result.unwrap()[0].text, "recovered");
    }

    #[test]
    fn disabled_acceleration_does_not_retry() {
        let mut calls = 0;
        let result: Result<_, PassbookError> =
            run_with_fallback(OcrAcceleration::Disabled, 1, |_| {
                calls += 1;
                Err(PassbookError::TesseractFailed {
                    page: 1,
                    stderr: "boom".into(),
                })
            });

        assert_eq!(calls, 1);
        assert!(result.is_err());
    }
}
