pub mod ocr;
pub mod pdftotext;

use crate::error::PassbookError;
use crate::model::{PageMode, RawLine, Statement};
use std::path::Path;

use ocr::{OcrEngine, OcrOptions};

/// Text content of a single page, with the extraction mode the source
/// reader chose for it.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: usize,
    pub lines: Vec<String>,
    pub mode: PageMode,
}

/// Trait for turning a PDF on disk into ordered raw lines.
pub trait LineExtractor: Send + Sync {
    fn extract(&self, pdf: &Path) -> Result<Statement, PassbookError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// The default extractor: pdftotext for pages with a text layer, OCR for
/// image-only pages. Each page keeps its own mode, so mixed documents
/// (a scanned page stapled into a digital statement) work per page.
pub struct StatementExtractor {
    ocr: OcrEngine,
}

impl StatementExtractor {
    pub fn new(options: OcrOptions) -> Self {
        StatementExtractor {
            ocr: OcrEngine::new(options),
        }
    }
}

impl LineExtractor for StatementExtractor {
    fn extract(&self, pdf: &Path) -> Result<Statement, PassbookError> {
        let pages = pdftotext::extract_page_texts(pdf)?;
        let page_count = pages.len();

        let mut lines = Vec::new();
        for page in &pages {
            match page.mode {
                PageMode::Text => {
                    push_lines(&mut lines, page.page_number, &page.lines);
                }
                PageMode::ImageOnly => {
                    log::info!(
                        "{}: page {} has no text layer, running OCR",
                        pdf.display(),
                        page.page_number
                    );
                    let recognized = self.ocr.recognize_page(pdf, page.page_number)?;
                    let texts: Vec<String> = recognized.into_iter().map(|l| l.text).collect();
                    push_lines(&mut lines, page.page_number, &texts);
                }
            }
        }

        Ok(Statement {
            path: pdf.to_path_buf(),
            page_count,
            lines,
        })
    }

    fn backend_name(&self) -> &str {
        "poppler"
    }
}

/// Keep non-blank lines, remembering each line's position on its page.
/// Leading whitespace is preserved: with `-layout` output the character
/// column of an amount tells debit from credit.
fn push_lines(out: &mut Vec<RawLine>, page_number: usize, lines: &[String]) {
    for (line_index, text) in lines.iter().enumerate() {
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        out.push(RawLine {
            page_number,
            line_index,
            text: trimmed.to_string(),
        });
    }
}
