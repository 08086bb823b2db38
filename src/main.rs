use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use spinbot::capture::MonitorCapture;
use spinbot::config::{GameConfig, GameKind};
use spinbot::games::{Runner, SlotRunner, WheelRunner};
use spinbot::guard::OverlayGuard;
use spinbot::input::{ActionExecutor, SystemPointer};
use spinbot::ocr::TextReader;
use spinbot::session::SessionDriver;

#[derive(Parser)]
#[command(
    name = "spinbot",
    version,
    about = "Plays a configured casino game by watching the screen and issuing human-timed input"
)]
struct Cli {
    /// Path to the game YAML config produced by the capture tool
    #[arg(long)]
    config: PathBuf,

    /// Session duration in minutes (overrides the config value)
    #[arg(long)]
    duration: Option<f64>,

    /// Fixed RNG seed for reproducible jitter and delays
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .format_timestamp_millis()
    .init();

    log::info!("spinbot v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = GameConfig::load(&cli.config)
        .with_context(|| format!("loading config {:?}", cli.config))?;
    if let Some(seed) = cli.seed {
        config.pacing.seed = Some(seed);
    }

    let duration = match cli.duration {
        Some(minutes) => Duration::from_secs_f64(minutes * 60.0),
        None => config.session.duration(),
    };

    // Resolve the state machine first so a config defect fails the session
    // before any capture or input backend is touched.
    let mut runner: Box<dyn Runner> = match config.kind {
        GameKind::Slot => Box::new(SlotRunner::from_config(&config)?),
        GameKind::Wheel => Box::new(WheelRunner::from_config(&config)?),
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            log::info!("interrupt received, stopping after the current action");
            stop.store(true, Ordering::SeqCst);
        })
        .context("installing interrupt handler")?;
    }

    let capture = MonitorCapture::new().context("initialising screen capture")?;
    let pointer = SystemPointer::new().context("initialising input backend")?;
    let input = ActionExecutor::new(Box::new(pointer), config.pacing.clone());
    let guard = OverlayGuard::new(config.overlays());

    let mut driver = SessionDriver::new(
        Box::new(capture),
        TextReader::tesseract(),
        input,
        guard,
        stop,
    );
    let summary = driver.run(runner.as_mut(), duration)?;

    log::info!(
        "done: {} rounds in {:.1} minutes",
        summary.rounds_played,
        summary.elapsed.as_secs_f64() / 60.0
    );
    Ok(())
}
