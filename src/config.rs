use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

/// Command-line surface of the batch tool.
#[derive(Debug, Parser)]
#[command(
    name = "mentor-minutes",
    version,
    about = "Summarize mentoring-session transcripts and append them to an xlsx log"
)]
pub struct Cli {
    /// Directory scanned (non-recursively) for UTF-8 .txt transcripts
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub input_dir: PathBuf,

    /// Target xlsx log file, created with the template header row if absent
    #[arg(long, value_name = "FILE", default_value = "outputs/log_to_excel_output.xlsx")]
    pub excel_path: PathBuf,

    /// Worksheet the rows are appended to
    #[arg(long, default_value = "Sheet1")]
    pub sheet_name: String,

    /// Model used in strict-JSON output mode
    #[arg(long, env = "MENTOR_MINUTES_JSON_MODEL", default_value = "gemini-2.5-flash")]
    pub json_model: String,

    /// Model used in plain-text fallback mode
    #[arg(long, env = "MENTOR_MINUTES_TEXT_MODEL", default_value = "gemini-1.5-flash")]
    pub text_model: String,

    /// Transcript length cap (characters) before the text is sent out
    #[arg(long, default_value_t = 115_000)]
    pub max_transcript_chars: usize,

    /// Extra attempts per model mode on top of the first one
    #[arg(long, default_value_t = 1)]
    pub retry_each: u32,
}

/// Everything the pipeline needs, resolved once at process start and passed
/// by reference into the summarizer and writer. Replaces any ambient global
/// state.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_dir: PathBuf,
    pub excel_path: PathBuf,
    pub sheet_name: String,
    pub json_model: String,
    pub text_model: String,
    pub api_key: String,
    pub max_transcript_chars: usize,
    pub retry_each: u32,
}

impl Config {
    /// Builds the runtime config from CLI flags plus the `GEMINI_API_KEY`
    /// environment variable, validating the input directory and creating the
    /// output directory if needed.
    pub fn load(cli: Cli) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)?;

        if !cli.input_dir.is_dir() {
            return Err(Error::MissingInputDir(cli.input_dir));
        }
        if let Some(parent) = cli.excel_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            input_dir: cli.input_dir,
            excel_path: cli.excel_path,
            sheet_name: cli.sheet_name,
            json_model: cli.json_model,
            text_model: cli.text_model,
            api_key,
            max_transcript_chars: cli.max_transcript_chars,
            retry_each: cli.retry_each,
        })
    }
}
