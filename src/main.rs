use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analyzer;
mod batch;
mod config;
mod engine;
mod engines;
mod error;
mod extraction;
mod preprocessing;
mod server;

#[derive(Parser, Debug)]
#[command(name = "labreport-ocr-server")]
#[command(about = "Extracts structured lab test results from report images")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "LAB_OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "LAB_OCR_PORT", default_value = "8000")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "LAB_OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Path to the tesseract executable (searched on PATH if not set)
    #[arg(long, env = "TESSERACT_CMD")]
    pub tesseract_cmd: Option<PathBuf>,

    /// Tesseract language model
    #[arg(long, env = "LAB_OCR_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Tesseract page segmentation mode
    #[arg(long, env = "LAB_OCR_PSM", default_value = "6")]
    pub psm: u8,

    /// Tesseract OCR engine mode
    #[arg(long, env = "LAB_OCR_OEM", default_value = "3")]
    pub oem: u8,

    /// Resolution hint passed to tesseract
    #[arg(long, env = "LAB_OCR_DPI", default_value = "300")]
    pub dpi: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process every report image in a directory and write a JSON summary
    Batch {
        /// Directory containing report images
        #[arg(long, default_value = "lbmaske")]
        input_dir: PathBuf,

        /// Directory for the JSON report and log file
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match &args.command {
        None => {
            init_tracing(&args.log_level, None)?;

            let config = config::Config::from(&args);

            tracing::info!(
                "Starting labreport-ocr-server v{}",
                env!("CARGO_PKG_VERSION")
            );
            log_tesseract(&config);
            tracing::info!("Binding to {}:{}", config.host, config.port);

            server::run(config).await
        }
        Some(Command::Batch {
            input_dir,
            output_dir,
        }) => {
            let options = batch::BatchOptions {
                input_dir: input_dir.clone(),
                output_dir: output_dir.clone(),
                run_stamp: batch::run_stamp(),
            };
            std::fs::create_dir_all(&options.output_dir)?;
            let _guard = init_tracing(
                &args.log_level,
                Some((&options.output_dir, batch::log_file_name(&options.run_stamp))),
            )?;

            let config = config::Config::from(&args);
            log_tesseract(&config);

            let result = tokio::task::spawn_blocking(move || batch::run(&config, &options)).await?;
            if let Err(e) = &result {
                tracing::error!("Batch run failed: {:#}", e);
            }
            result.map(|_| ())
        }
    }
}

/// Console logging, plus a plain-text log file when `log_file` is given
fn init_tracing(
    log_level: &str,
    log_file: Option<(&PathBuf, String)>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some((dir, name)) => {
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn log_tesseract(config: &config::Config) {
    match &config.tesseract_cmd {
        Some(path) => tracing::info!("Using Tesseract from: {}", path.display()),
        None => tracing::error!("Tesseract not found in common locations!"),
    }
}
