use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fretwise_analysis::AnalysisPipeline;
use fretwise_audio::{CaptureConfig, CpalCapture};
use fretwise_domain::TuningResult;
use fretwise_tuner::{CancelToken, TuningLoop};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Guitar tuner and audio clip analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tune a guitar from the default microphone until interrupted
    Tune {
        /// Length of each captured frame in seconds
        #[arg(long, default_value_t = 0.5)]
        duration: f32,
        /// Capture sample rate in Hz
        #[arg(long, default_value_t = 44_100)]
        samplerate: u32,
    },
    /// Guess instrument, genre and key of an audio file
    Analyze {
        /// Path to the audio file to analyze
        filepath: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Tune {
            duration,
            samplerate,
        } => tune(CaptureConfig {
            duration_secs: duration,
            sample_rate: samplerate,
        }),
        Command::Analyze { filepath, format } => analyze(&filepath, format),
    }
}

fn tune(config: CaptureConfig) -> Result<()> {
    config.validate().context("invalid tuning options")?;
    let source = CpalCapture::open_default(&config).context("open audio input device")?;
    info!(device = source.device_name(), "capturing from input device");

    let cancel = CancelToken::new();
    let signals = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("start signal listener")?;
    signals.spawn(cancel_on_interrupt(cancel.clone()));

    let tuner = TuningLoop::new(source, config, cancel)?;
    println!("Press Ctrl+C to exit.");
    let summary = tuner.run(&mut |result: &TuningResult| println!("{result}"))?;
    println!("\nGoodbye!");
    info!(cycles = summary.cycles, "tuner stopped");
    signals.shutdown_background();
    Ok(())
}

async fn cancel_on_interrupt(cancel: CancelToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, finishing current cycle");
            cancel.cancel();
        }
        Err(err) => error!(%err, "cannot listen for Ctrl+C"),
    }
}

fn analyze(path: &Path, format: OutputFormat) -> Result<()> {
    let report = AnalysisPipeline::new().analyze_file(path)?;
    match format {
        OutputFormat::Text => {
            for line in report.lines() {
                println!("{line}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
