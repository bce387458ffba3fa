use std::path::PathBuf;

/// Coarse grouping of errors, used by the shell to report which stage
/// of a conversion failed. Every error is scoped to a single input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    File,
    Ocr,
    Write,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::File => "file",
            ErrorKind::Ocr => "ocr",
            ErrorKind::Write => "write",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PassbookError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a usable PDF: {reason}")]
    InvalidPdf { path: PathBuf, reason: String },

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("OCR tools not found. Install poppler-utils (pdftoppm) and tesseract-ocr")]
    OcrUnavailable,

    #[error("pdftoppm failed on page {page}: {stderr}")]
    PdftoppmFailed { page: usize, stderr: String },

    #[error("tesseract failed on page {page}: {stderr}")]
    TesseractFailed { page: usize, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write spreadsheet: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

impl PassbookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PassbookError::Read { .. }
            | PassbookError::InvalidPdf { .. }
            | PassbookError::PdftotextNotFound
            | PassbookError::Io(_) => ErrorKind::File,
            PassbookError::OcrUnavailable
            | PassbookError::PdftoppmFailed { .. }
            | PassbookError::TesseractFailed { .. } => ErrorKind::Ocr,
            PassbookError::Workbook(_) => ErrorKind::Write,
        }
    }
}
