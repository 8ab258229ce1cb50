use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mentor_minutes::batch::run_batch;
use mentor_minutes::config::{Cli, Config};
use mentor_minutes::excel::ExcelWriter;
use mentor_minutes::summarize::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("mentor_minutes=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli).context("invalid configuration")?;

    // Long timeout: a single generateContent call on a big transcript can
    // take minutes.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let summarizer = Summarizer::new(client, &config);
    let writer = ExcelWriter::new(&config.excel_path, &config.sheet_name);

    let report = run_batch(&summarizer, &writer, &config.input_dir)
        .await
        .context("batch failed to start")?;

    println!();
    println!("완료: {}건 처리", report.processed);
    if !report.errors.is_empty() {
        println!("오류 목록:");
        for (file, message) in &report.errors {
            println!(" - {file}: {message}");
        }
    }
    Ok(())
}
