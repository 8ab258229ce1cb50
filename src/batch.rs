//! Sequential batch driver: one transcript fully summarized and written
//! before the next begins. A bad transcript is recorded and skipped; it never
//! aborts the batch.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::Result;
use crate::excel::ExcelWriter;
use crate::summarize::Summarizer;

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    /// `(filename, message)` per failed transcript, in processing order.
    pub errors: Vec<(String, String)>,
}

/// `.txt` files directly inside `input_dir`, sorted by name so the batch
/// order (and the 회차 sequence) is deterministic across platforms.
pub fn list_transcripts(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("txt"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Runs summarize → write for every transcript in `input_dir`, printing one
/// `[OK]`/`[ERR]` line per file and collecting failures into the report.
pub async fn run_batch(
    summarizer: &Summarizer,
    writer: &ExcelWriter,
    input_dir: &Path,
) -> Result<BatchReport> {
    let files = list_transcripts(input_dir)?;
    info!("found {} transcript file(s) in {}", files.len(), input_dir.display());

    let mut report = BatchReport::default();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match process_file(summarizer, writer, &path, &name).await {
            Ok(row) => {
                report.processed += 1;
                println!("[OK] {name} -> row {row}");
            }
            Err(e) => {
                error!("processing {name} failed: {e}");
                println!("[ERR] {name}: {e}");
                report.errors.push((name, e.to_string()));
            }
        }
    }
    Ok(report)
}

async fn process_file(
    summarizer: &Summarizer,
    writer: &ExcelWriter,
    path: &Path,
    name: &str,
) -> Result<u32> {
    let transcript = std::fs::read_to_string(path)?;
    let record = summarizer.summarize(&transcript).await?;
    writer.write(&record, name)
}
