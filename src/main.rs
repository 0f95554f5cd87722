// src/main.rs

use clap::Parser;
use inventory2graph::{
    AppError, CommandLineInput, GraphDelivery, GraphSource, IngestedGraph, InventoryIngestion,
    PipelineConfig,
};
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("inventory2graph.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Ingests the inventory, then writes or summarizes the graph.
async fn execute_pipeline(config: &PipelineConfig) -> Result<(), AppError> {
    let ingestion = InventoryIngestion::new(config)?;

    let ingested = ingestion.ingest().await?;
    let bytes_written = ingestion.deliver(&ingested)?;
    report_completion(config, &ingested, bytes_written);

    Ok(())
}

fn report_completion(config: &PipelineConfig, ingested: &IngestedGraph, bytes_written: usize) {
    match &config.output_file {
        Some(path) => println!(
            "Wrote {} entities and {} relationships ({} bytes) to {}",
            ingested.graph.entities.len(),
            ingested.graph.relationships.len(),
            bytes_written,
            path.display()
        ),
        None => {
            println!("{}", ingested.report.describe());
            for line in ingested.report.summary.describe() {
                println!("{}", line);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = PipelineConfig::resolve(cli)?;

    execute_pipeline(&config).await?;

    Ok(())
}
