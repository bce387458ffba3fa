use crate::error::PassbookError;
use crate::extraction::PageText;
use crate::model::PageMode;
use std::path::Path;
use std::process::Command;

/// A page whose text layer yields fewer printable characters than this
/// is treated as a raster scan and routed to OCR. Real statement pages
/// carry well over a thousand characters.
const MIN_TEXT_CHARS_PER_PAGE: usize = 200;

/// Check if pdftotext is available on the system.
pub fn is_available() -> bool {
    probe("pdftotext")
}

// pdftotext -v prints its version to stderr with a non-zero exit on
// some builds, so stderr output alone counts as present.
fn probe(binary: &str) -> bool {
    Command::new(binary)
        .arg("-v")
        .output()
        .map(|o| o.status.success() || !o.stderr.is_empty())
        .unwrap_or(false)
}

/// Open a PDF, pull its text layer with `pdftotext -layout`, and classify
/// each page as text-bearing or image-only.
///
/// `-layout` preserves the whitespace alignment of the statement table,
/// which the parser later relies on for debit/credit column positions.
pub fn extract_page_texts(pdf: &Path) -> Result<Vec<PageText>, PassbookError> {
    if let Err(source) = std::fs::metadata(pdf) {
        return Err(PassbookError::Read {
            path: pdf.to_path_buf(),
            source,
        });
    }

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(pdf)
        .arg("-") // output to stdout
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PassbookError::PdftotextNotFound
            } else {
                PassbookError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PassbookError::InvalidPdf {
            path: pdf.to_path_buf(),
            reason: if stderr.is_empty() {
                format!(
                    "pdftotext exited with code {}",
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr
            },
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);

    // pdftotext uses form feed \x0c as page separator; the final form
    // feed produces one trailing empty chunk to drop.
    let mut chunks: Vec<&str> = text.split('\x0c').collect();
    if let Some(last) = chunks.last() {
        if last.trim().is_empty() && chunks.len() > 1 {
            chunks.pop();
        }
    }

    let pages: Vec<PageText> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let lines: Vec<String> = chunk.lines().map(|l| l.to_string()).collect();
            let mode = classify_page(&lines);
            PageText {
                page_number: i + 1,
                lines,
                mode,
            }
        })
        .collect();

    if pages.is_empty() {
        return Err(PassbookError::InvalidPdf {
            path: pdf.to_path_buf(),
            reason: "document has no pages".into(),
        });
    }

    for page in &pages {
        log::debug!(
            "{}: page {} classified as {:?}",
            pdf.display(),
            page.page_number,
            page.mode
        );
    }

    Ok(pages)
}

/// Decide whether a page's text layer is worth using or whether the page
/// is effectively an image.
fn classify_page(lines: &[String]) -> PageMode {
    let printable: usize = lines
        .iter()
        .map(|l| l.chars().filter(|c| !c.is_whitespace()).count())
        .sum();
    if printable >= MIN_TEXT_CHARS_PER_PAGE {
        PageMode::Text
    } else {
        PageMode::ImageOnly
    }
}
