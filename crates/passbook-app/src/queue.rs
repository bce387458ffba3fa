//! Per-file conversion queue.
//!
//! Each selected file runs the full pipeline independently and carries
//! its own status; a failure on one file never aborts the others. The
//! queue holds no state beyond the file list and these statuses.

use passbook_core::error::PassbookError;
use passbook_core::extraction::LineExtractor;
use passbook_core::{parsing, workbook};
use std::fmt;
use std::path::{Path, PathBuf};

/// Progress of one file through the pipeline.
/// Done and Failed are terminal; Failed is reachable from any other state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Extracting,
    Parsing,
    Writing,
    Done { rows: usize, output: PathBuf },
    Failed { stage: &'static str, message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done { .. } | JobStatus::Failed { .. })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Extracting => write!(f, "extracting"),
            JobStatus::Parsing => write!(f, "parsing"),
            JobStatus::Writing => write!(f, "writing"),
            JobStatus::Done { rows, output } => {
                write!(f, "done ({} rows -> {})", rows, output.display())
            }
            JobStatus::Failed { stage, message } => write!(f, "failed [{stage}]: {message}"),
        }
    }
}

#[derive(Debug)]
pub struct Job {
    pub input: PathBuf,
    pub status: JobStatus,
}

impl Job {
    fn new(input: &Path) -> Self {
        Job {
            input: input.to_path_buf(),
            status: JobStatus::Pending,
        }
    }
}

/// Convert every file in order, reporting per-file progress to stdout.
pub fn run(files: &[PathBuf], extractor: &dyn LineExtractor, keep_text: bool) -> Vec<Job> {
    let mut jobs: Vec<Job> = files.iter().map(|f| Job::new(f)).collect();

    for job in &mut jobs {
        convert(job, extractor, keep_text);
    }

    jobs
}

fn convert(job: &mut Job, extractor: &dyn LineExtractor, keep_text: bool) {
    let name = job.input.display().to_string();

    advance(job, JobStatus::Extracting);
    let statement = match extractor.extract(&job.input) {
        Ok(s) => s,
        Err(e) => return fail(job, &e),
    };

    if keep_text {
        dump_raw_lines(&statement);
    }

    advance(job, JobStatus::Parsing);
    let mut matcher = parsing::ColumnarMatcher::new();
    let table = parsing::parse_statement(&statement, &mut matcher);
    if table.is_empty() {
        println!("  {name}: no transaction lines recognized; writing header-only sheet");
    }

    advance(job, JobStatus::Writing);
    let output = workbook::derive_output_path(&job.input);
    match workbook::write_table(&table, &output) {
        Ok(()) => advance(
            job,
            JobStatus::Done {
                rows: table.len(),
                output,
            },
        ),
        Err(e) => fail(job, &e),
    }
}

fn advance(job: &mut Job, status: JobStatus) {
    println!("{}: {}", job.input.display(), status);
    job.status = status;
}

fn fail(job: &mut Job, error: &PassbookError) {
    let stage = error.kind().as_str();
    println!("{}: failed [{stage}]: {error}", job.input.display());
    job.status = JobStatus::Failed {
        stage,
        message: error.to_string(),
    };
}

/// Debug aid: keep the extracted raw text next to the output so parsing
/// misses can be diagnosed against what the extractor actually saw.
fn dump_raw_lines(statement: &passbook_core::model::Statement) {
    let path = statement.path.with_extension("lines.txt");
    let body: String = statement
        .lines
        .iter()
        .map(|l| format!("p{} l{}: {}\n", l.page_number, l.line_index, l.text))
        .collect();
    if let Err(e) = std::fs::write(&path, body) {
        log::warn!("could not write {}: {e}", path.display());
    } else {
        println!("  raw text kept at {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::model::{RawLine, Statement};

    /// Fails for paths containing "bad", succeeds otherwise.
    struct FlakyExtractor;

    impl LineExtractor for FlakyExtractor {
        fn extract(&self, pdf: &Path) -> Result<Statement, PassbookError> {
            if pdf.to_string_lossy().contains("bad") {
                return Err(PassbookError::InvalidPdf {
                    path: pdf.to_path_buf(),
                    reason: "corrupt xref".into(),
                });
            }
            Ok(Statement {
                path: pdf.to_path_buf(),
                page_count: 1,
                lines: vec![RawLine {
                    page_number: 1,
                    line_index: 0,
                    text: "12/06/2024  SALARY CREDIT   5000.00   15230.50".to_string(),
                }],
            })
        }

        fn backend_name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn failure_on_first_file_does_not_abort_second() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pdf");
        let good = dir.path().join("good.pdf");

        let jobs = run(&[bad, good.clone()], &FlakyExtractor, false);

        assert_eq!(jobs.len(), 2);
        assert!(matches!(
            jobs[0].status,
            JobStatus::Failed { stage: "file", .. }
        ));
        assert!(matches!(jobs[1].status, JobStatus::Done { rows: 1, .. }));
        assert!(good.with_extension("xlsx").exists());
    }

    #[test]
    fn keep_text_writes_raw_lines_beside_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("june.pdf");

        let jobs = run(&[input.clone()], &FlakyExtractor, true);

        assert!(jobs[0].status.is_terminal());
        let dump = input.with_extension("lines.txt");
        let body = std::fs::read_to_string(dump).unwrap();
        assert!(body.contains("SALARY CREDIT"));
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Done {
            rows: 0,
            output: PathBuf::new()
        }
        .is_terminal());
        assert!(JobStatus::Failed {
            stage: "file",
            message: String::new()
        }
        .is_terminal());
        assert!(!JobStatus::Parsing.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
