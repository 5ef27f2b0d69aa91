use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use classifier_sdk::ExperienceTier;

#[derive(Parser, Debug)]
#[command(
    name = "nps-pipeline",
    version,
    about = "Classify NPS survey comments with a language model and summarize the results"
)]
pub struct Cli {
    /// Load variables from this env file instead of searching for `.env`
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every commented row of a survey export
    Analyze(AnalyzeArgs),
    /// Dashboard metrics over an analysed table, as JSON
    Report(ReportArgs),
    /// Print the prompt for one row without calling the API
    Prompt(PromptArgs),
}

#[derive(Args, Debug)]
pub struct ColumnArgs {
    /// YAML file overriding the default column names
    #[arg(long, env = "NPS_COLUMNS")]
    pub columns: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Survey export (CSV with a header row)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Where to write the classified rows
    #[arg(long, short, default_value = "nps_clasificado.csv")]
    pub output: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Model identifier [env: NPS_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// Attempts per row, including the first [env: NPS_MAX_ATTEMPTS]
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Linear backoff base in seconds [env: NPS_BACKOFF_BASE_SECONDS]
    #[arg(long)]
    pub backoff_secs: Option<f64>,

    /// OpenAI-compatible endpoint [env: NPS_OPENAI_BASE_URL]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Only process the first N rows of the input
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Analysed table produced by `analyze`
    #[arg(long, short)]
    pub input: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Keep only these segments (repeatable)
    #[arg(long = "segment", value_parser = parse_segment)]
    pub segments: Vec<ExperienceTier>,

    /// First opening date to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last opening date to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Write the JSON here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PromptArgs {
    #[arg(long, short)]
    pub input: PathBuf,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// 1-based position among the rows that have a comment
    #[arg(long, default_value_t = 1)]
    pub row: usize,
}

fn parse_segment(value: &str) -> Result<ExperienceTier, String> {
    ExperienceTier::parse(value)
        .ok_or_else(|| format!("unknown segment '{}' (Promotor, Neutro, Detractor)", value))
}
