// nps-pipeline-rs/src/main.rs
// Command-line entry point: analyze, report and prompt subcommands

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use classifier_sdk::config::{CompositeConfigProvider, EnvConfigProvider, MemoryConfigProvider};
use classifier_sdk::{build_prompt, ClassifierConfig};
use env_logger::Env;
use tokio::sync::watch;

use nps_pipeline::exit_codes;
use nps_pipeline::{
    build_report, prepare, BatchOrchestrator, ColumnMap, PipelineError, ReportFilter, SurveyTable,
};

mod cli;
use cli::{AnalyzeArgs, Cli, Command, PromptArgs, ReportArgs};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            if let Err(e) = config_rs::load_environment_from(path) {
                eprintln!("Cannot load {}: {}", path.display(), e);
                std::process::exit(exit_codes::INVALID_INPUT);
            }
        }
        None => {
            config_rs::load_environment();
        }
    }

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            e.downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(exit_codes::RUNTIME_FAILURE)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Analyze(args) => analyze(args).await,
        Command::Report(args) => report(args),
        Command::Prompt(args) => prompt(args),
    }
}

fn load_columns(path: Option<&Path>) -> Result<ColumnMap, PipelineError> {
    match path {
        Some(path) => {
            let columns = ColumnMap::from_yaml_file(path)?;
            log::info!("Using column map {}", path.display());
            Ok(columns)
        }
        None => Ok(ColumnMap::default()),
    }
}

/// Flags first, then `NPS_*` variables, then the plain OpenAI variables
fn classifier_config(args: &AnalyzeArgs) -> Result<ClassifierConfig, PipelineError> {
    let mut overrides = MemoryConfigProvider::new();
    overrides.set_opt("model", args.model.as_ref());
    overrides.set_opt("max_attempts", args.max_attempts);
    overrides.set_opt("backoff_base_seconds", args.backoff_secs);
    overrides.set_opt("openai_base_url", args.base_url.as_ref());

    let mut fallback = MemoryConfigProvider::new();
    for (key, var) in [("openai_api_key", "OPENAI_API_KEY"), ("openai_base_url", "OPENAI_BASE_URL")] {
        let value = config_rs::get_env_or(var, "");
        if !value.is_empty() {
            fallback.set(key, value);
        }
    }

    let provider = CompositeConfigProvider::new()
        .with_provider(overrides)
        .with_provider(EnvConfigProvider::new().with_prefix("NPS"))
        .with_provider(fallback);

    Ok(ClassifierConfig::from_provider(&provider)?)
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<i32> {
    log::info!("{} starting", config_rs::get_formatted_component_name("ANALYZE"));

    let columns = load_columns(args.columns.columns.as_deref())?;
    let mut table = SurveyTable::from_csv_path(&args.input)?;
    if let Some(limit) = args.limit {
        table = table.head(limit);
        log::info!("Limited to the first {} rows", table.len());
    }

    let config = classifier_config(&args)?;
    let retry = config.retry_config();
    let client = classifier_sdk::openai_classifier(config).map_err(PipelineError::from)?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; stopping after the current row");
            let _ = cancel_tx.send(true);
        }
    });

    let orchestrator = BatchOrchestrator::new(Arc::new(client), retry)
        .with_cancellation(cancel_rx)
        .with_progress(Box::new(|p| {
            if p.sentinel {
                eprintln!("[{}/{}] case {}: failed after {} attempts", p.done, p.total, p.case_id, p.attempts);
            } else {
                eprintln!("[{}/{}] case {}", p.done, p.total, p.case_id);
            }
        }));

    let result = orchestrator.run(&table, &columns).await?;
    result.to_table().write_csv(&args.output)?;

    println!("Total surveys:      {}", result.total_rows);
    println!("With comment:       {}", result.total_rows - result.excluded_count);
    println!("Without comment:    {}", result.excluded_count);
    println!("Classified:         {}", result.classified_count());
    println!("Failed (sentinel):  {}", result.sentinel_count);
    println!("Output:             {}", args.output.display());

    if result.cancelled {
        println!("Run interrupted: {} rows written", result.rows.len());
        return Ok(exit_codes::RUNTIME_FAILURE);
    }
    Ok(exit_codes::SUCCESS)
}

fn report(args: ReportArgs) -> anyhow::Result<i32> {
    log::info!("{} starting", config_rs::get_formatted_component_name("REPORT"));

    let columns = load_columns(args.columns.columns.as_deref())?;
    let table = SurveyTable::from_csv_path(&args.input)?;
    let filter = ReportFilter {
        segments: args.segments,
        from: args.from,
        to: args.to,
    };

    let json = build_report(&table, &columns, filter)?.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("cannot write report to {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(exit_codes::SUCCESS)
}

fn prompt(args: PromptArgs) -> anyhow::Result<i32> {
    let columns = load_columns(args.columns.columns.as_deref())?;
    let table = SurveyTable::from_csv_path(&args.input)?;
    let prepared = prepare(&table, &columns)?;

    let row = args
        .row
        .checked_sub(1)
        .and_then(|i| prepared.selected.get(i))
        .ok_or_else(|| {
            PipelineError::Config(format!(
                "row {} out of range: {} rows have a comment",
                args.row,
                prepared.selected.len()
            ))
        })?;

    log::info!("Prompt for case {} (source row {})", row.case_id(), row.source_row);
    println!("{}", build_prompt(&row.feedback));
    Ok(exit_codes::SUCCESS)
}
