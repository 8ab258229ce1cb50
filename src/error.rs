use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds for the summarize-and-log pipeline.
///
/// `EmptyResponse` and `NoJsonFound` are recoverable inside the summarizer
/// (they trigger the marker-format fallback). Everything else is fatal for
/// the file being processed and is recorded by the batch driver.
#[derive(Debug, Error)]
pub enum Error {
    /// Both model modes exhausted their retries.
    #[error("generation failed in both model modes: json={json_mode} / text={text_mode}")]
    Generation { json_mode: String, text_mode: String },

    /// The model API answered with a non-success status.
    #[error("model API request failed: {0}")]
    Api(String),

    /// No text or decodable inline-data part in the model response.
    #[error("model response carried no usable text part")]
    EmptyResponse,

    /// No JSON object or array could be pulled out of the model output.
    #[error("no JSON body found in model output")]
    NoJsonFound,

    /// The workbook could not be saved because the file stayed locked.
    #[error("save failed, workbook still locked after {attempts} attempts: {}", .path.display())]
    WorkbookLocked { path: PathBuf, attempts: u32 },

    /// The configured sheet does not exist in the workbook.
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    /// Any other xlsx read/write failure.
    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    #[error("input directory not found: {}", .0.display())]
    MissingInputDir(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
