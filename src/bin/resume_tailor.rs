//! Command-line entry point
//!
//! `resume-tailor RESUME_PATH JOB_PATH [--tone professional|casual|academic] [--save]`

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use resume_tailor::services::output::save_output;
use resume_tailor::{CompletionClient, ResumeService, RetryConfig, Settings, TailorService, Tone};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "resume-tailor", version, about = "Tailor a resume to a job description")]
struct Cli {
    /// Plain-text resume file
    resume: PathBuf,

    /// Plain-text job description file
    job: PathBuf,

    /// Tone of the tailored resume
    #[arg(short, long, value_enum, default_value_t = CliTone::Professional)]
    tone: CliTone,

    /// Also write the result to OUTPUT_DIR
    #[arg(long)]
    save: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTone {
    Professional,
    Casual,
    Academic,
}

impl From<CliTone> for Tone {
    fn from(tone: CliTone) -> Self {
        match tone {
            CliTone::Professional => Tone::Professional,
            CliTone::Casual => Tone::Casual,
            CliTone::Academic => Tone::Academic,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(tailored) => {
            println!("{}", tailored);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let resume_text = tokio::fs::read_to_string(&cli.resume)
        .await
        .with_context(|| format!("Failed to read resume file {}", cli.resume.display()))?;
    let job_description = tokio::fs::read_to_string(&cli.job)
        .await
        .with_context(|| format!("Failed to read job description file {}", cli.job.display()))?;

    let settings = Settings::new()?;
    let client = CompletionClient::from_config(&settings.openai, RetryConfig::from(&settings.retry))?;
    let service = TailorService::new(client);

    let result = service
        .tailor(&resume_text, &job_description, cli.tone.into())
        .await?;

    if cli.save {
        let path = save_output(&settings.storage.output_dir, &result.content).await?;
        eprintln!("Saved to {}", path.display());
    }

    Ok(result.content)
}
