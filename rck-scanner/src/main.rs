//! Check-in scanner (rck-scanner) - Main entry point
//!
//! Command-line front end for the check-in pipeline: validate a payload,
//! check in by manual entry or from a still image, or run the full camera
//! pipeline as a kiosk against a directory of replayed frames.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rck_common::api::CheckinReceipt;
use rck_common::config::{load_config, TomlConfig};
use rck_common::events::{CameraStatus, NavigationTarget};
use rck_common::PayloadValidator;
use rck_scanner::camera::{CameraBackend, DirectoryReplayCamera, NoCameraBackend};
use rck_scanner::checkin::{CheckinOutcome, CheckinView, HttpCheckinClient};
use rck_scanner::decoder::RqrrDecoder;
use rck_scanner::scan::DisplayRefreshClock;
use rck_scanner::{CheckinPipeline, PipelineDeps, UploadOutcome};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "rck_scanner=debug,rck_common=info";

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("RCK_GIT_HASH"),
    ", built ",
    env!("RCK_BUILD_TIMESTAMP"),
    ")"
);

/// Command-line arguments for rck-scanner
#[derive(Parser, Debug)]
#[command(name = "rck-scanner")]
#[command(about = "QR check-in scanner for event runners")]
#[command(version)]
#[command(long_version = LONG_VERSION)]
struct Args {
    /// Configuration file (overrides RCK_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Registration API base URL
    #[arg(long, env = "RCK_API_URL")]
    api_url: Option<String>,

    /// Runner session token sent with each check-in
    #[arg(long, env = "RCK_LINE_TOKEN", hide_env_values = true)]
    line_token: Option<String>,

    /// Registration the scanner was opened from (navigated to on success)
    #[arg(long)]
    registration_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a payload against the checkpoint token grammar
    Validate { payload: String },

    /// Check in with a typed payload
    Enter { payload: String },

    /// Check in with the QR code in a still image
    Upload { image: PathBuf },

    /// Run the camera pipeline against a directory of frames
    ///
    /// Ctrl+C stops. On unix, SIGUSR1/SIGUSR2 simulate the host going to
    /// background / foreground.
    Kiosk {
        dir: PathBuf,

        /// Switch the torch on once the camera is live
        #[arg(long)]
        torch: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(token) = &args.line_token {
        config.api.line_token = Some(token.clone());
    }

    init_tracing(&config)?;
    info!("rck-scanner {}", LONG_VERSION);

    // The pipeline expects one cooperative thread, like a UI event loop.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(args, config))
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.logging.level == "info" {
            DEFAULT_LOG_FILTER.into()
        } else {
            config.logging.level.as_str().into()
        }
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

async fn run(args: Args, config: TomlConfig) -> Result<()> {
    match args.command {
        Command::Validate { ref payload } => validate(payload),
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Enter { ref payload } => {
            let pipeline = build_pipeline(&args, &config, Arc::new(NoCameraBackend))?;
            report(pipeline.submit_manual(payload).await)
        }
        Command::Upload { ref image } => {
            let pipeline = build_pipeline(&args, &config, Arc::new(NoCameraBackend))?;
            match pipeline
                .submit_image(image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?
            {
                UploadOutcome::NoCode => bail!("No QR code found in {}", image.display()),
                UploadOutcome::Processed(outcome) => report(outcome),
            }
        }
        Command::Kiosk { ref dir, torch } => {
            let backend = Arc::new(DirectoryReplayCamera::new(dir));
            let pipeline = build_pipeline(&args, &config, backend)?;
            kiosk(pipeline, config.tuning.frame_rate_hz, torch).await
        }
    }
}

fn validate(payload: &str) -> Result<()> {
    match PayloadValidator::parse(payload) {
        Some(token) => {
            println!("valid checkpoint token");
            println!("  event:      {}", token.event_id);
            println!("  checkpoint: {}", token.checkpoint_id);
            println!("  nonce:      {}", token.nonce);
            Ok(())
        }
        None => bail!("invalid payload '{}'", PayloadValidator::sanitize(payload)),
    }
}

fn build_pipeline(
    args: &Args,
    config: &TomlConfig,
    backend: Arc<dyn CameraBackend>,
) -> Result<CheckinPipeline> {
    let client = HttpCheckinClient::new(config.api.base_url.clone(), config.api.line_token.clone())
        .context("Failed to create check-in client")?;

    let deps = PipelineDeps {
        backend,
        decoder: Arc::new(RqrrDecoder),
        client: Arc::new(client),
        view: Arc::new(ConsoleView::default()),
        registration_id: args.registration_id.clone(),
    };
    CheckinPipeline::new(config, deps).context("Failed to initialize check-in pipeline")
}

fn report(outcome: CheckinOutcome) -> Result<()> {
    match outcome {
        CheckinOutcome::Succeeded(_) => Ok(()),
        CheckinOutcome::Failed(message) => bail!("Check-in failed: {}", message),
        CheckinOutcome::FormatRejected => bail!("Payload is not a checkpoint token"),
        CheckinOutcome::Ignored => bail!("Nothing was submitted"),
    }
}

async fn kiosk(pipeline: CheckinPipeline, frame_rate_hz: u32, torch: bool) -> Result<()> {
    let mut events = pipeline.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!("Pipeline event: {}", event.name());
        }
    });

    // A camera failure leaves manual entry usable in the app; the kiosk has
    // nothing else to offer, so it exits.
    pipeline
        .start(Box::new(DisplayRefreshClock::new(frame_rate_hz)))
        .await
        .context("Scanner could not start")?;

    if torch {
        if let Err(e) = pipeline.set_torch(true).await {
            warn!("Torch unavailable: {}", e);
        }
    }

    let outcome = tokio::select! {
        target = pipeline.wait_for_completion() => {
            info!("Check-in complete: {:?}", target);
            Ok(())
        }
        result = lifecycle_signals(&pipeline) => result,
    };

    pipeline.stop().await;
    outcome
}

/// Forward host signals until Ctrl+C
async fn lifecycle_signals(pipeline: &CheckinPipeline) -> Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal as unix_signal, SignalKind};
        let mut hide = unix_signal(SignalKind::user_defined1())
            .context("Failed to install SIGUSR1 handler")?;
        let mut show = unix_signal(SignalKind::user_defined2())
            .context("Failed to install SIGUSR2 handler")?;

        loop {
            tokio::select! {
                result = signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl+C")?;
                    info!("Received Ctrl+C, shutting down");
                    return Ok(());
                }
                _ = hide.recv() => pipeline.on_hidden().await,
                _ = show.recv() => {
                    if let Err(e) = pipeline.on_visible().await {
                        warn!("Camera did not come back: {}", e);
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down");
        Ok(())
    }
}

/// Terminal rendering of the scanner screen
#[derive(Debug)]
struct ConsoleView {
    mounted: AtomicBool,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self {
            mounted: AtomicBool::new(true),
        }
    }
}

impl CheckinView for ConsoleView {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    fn set_camera_status(&self, status: CameraStatus, message: &str) {
        println!("[camera {}] {}", status, message);
    }

    fn show_submitting(&self, visible: bool) {
        if visible {
            println!("Checking in...");
        }
    }

    fn show_format_error(&self, message: &str) {
        println!("✗ {}", message);
    }

    fn show_success(&self, receipt: &CheckinReceipt) {
        println!("✓ Checked in: BIB {} {}", receipt.bib_number, receipt.full_name());
        if !receipt.checkin_timestamp.is_empty() {
            println!("  at {}", receipt.checkin_timestamp);
        }
    }

    fn show_failure(&self, message: &str) {
        println!("✗ {}", message);
    }

    fn clear_result(&self) {}

    fn show_warning(&self, message: &str) {
        println!("! {}", message);
    }

    fn show_notice(&self, message: &str) {
        println!("{}", message);
    }

    fn navigate(&self, target: &NavigationTarget) {
        println!("→ {}", target);
        self.mounted.store(false, Ordering::Release);
    }
}
