use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

mod ai;
mod app;
mod classify;
mod config;
mod db;
mod error;
mod export;
mod feed;
mod models;
mod pipeline;
mod services;

use app::App;
use config::Config;
use error::Result;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/headline-sentiment/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at info level instead of warn
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, classify and store new headlines once
    Ingest {
        /// GDELT timespan, e.g. 1hours or 30min
        #[arg(long)]
        timespan: Option<String>,
        #[arg(long)]
        num_records: Option<u32>,
        /// Write the export file afterwards
        #[arg(long)]
        export: bool,
    },
    /// Write the recent-articles window as JSON
    Export {
        #[arg(long)]
        min_count: Option<usize>,
        #[arg(long)]
        hours: Option<u32>,
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,
        #[arg(long)]
        stdout: bool,
    },
    /// Ingest and export on a fixed interval until Ctrl-C
    Watch {
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
    /// Classify a single headline and print the verdicts
    Classify { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only show warnings and errors unless --verbose
    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest {
            timespan,
            num_records,
            export,
        } => {
            if let Some(timespan) = timespan {
                config.ingest.timespan = timespan;
            }
            if let Some(num_records) = num_records {
                config.ingest.num_records = num_records;
            }

            let app = App::new(&config).await?;
            let report = app.ingest_once().await?;
            println!(
                "Stored {} of {} headlines ({} duplicates, {} skipped)",
                report.stored,
                report.received,
                report.duplicates,
                report.skipped()
            );

            if export {
                let count = app.export_default().await?;
                println!("Exported {} articles to {}", count, config.export.path);
            }
        }
        Command::Export {
            min_count,
            hours,
            output,
            stdout,
        } => {
            let app = App::new(&config).await?;
            let min_count = min_count.unwrap_or(config.export.min_count);
            let hours = hours.unwrap_or(config.export.hours);
            let path = (!stdout).then(|| output.unwrap_or_else(|| PathBuf::from(&config.export.path)));

            let count = app.export(min_count, hours, path.as_deref()).await?;
            if let Some(path) = path {
                println!("Exported {} articles to {}", count, path.display());
            }
        }
        Command::Watch { interval_minutes } => {
            let minutes = interval_minutes.unwrap_or(config.ingest.interval_minutes).max(1);
            let app = App::new(&config).await?;
            app.watch(Duration::from_secs(minutes * 60)).await?;
        }
        Command::Classify { text } => {
            let app = App::new(&config).await?;
            let analysis = app.classify(&text).await?;

            println!("emotion polarity: {}", analysis.polarity);
            if let Some(zero_shot) = analysis.zero_shot {
                println!("zero-shot:        {}", zero_shot);
            }
            println!("fused:            {}", analysis.fused);
            for (label, score) in &analysis.top_emotions {
                println!("  {label:<16}{score:.3}");
            }
        }
    }

    Ok(())
}
