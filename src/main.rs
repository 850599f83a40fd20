// Rayyfy - terminal music player
// Search the catalog, stream, queue and download, all from the keyboard

use anyhow::Result;
use clap::Parser;
use rayyfy::audio::AudioPlayer;
use rayyfy::catalog::CatalogClient;
use rayyfy::config::Config;
use rayyfy::ui::{App, TerminalManager};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rayyfy")]
#[command(about = "A terminal music player for an online song catalog", version)]
struct Args {
    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,

    /// Catalog base URL, overrides the config file and RAYYFY_CATALOG_URL
    #[arg(long)]
    catalog_url: Option<String>,

    /// Use this config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging(dev: bool) -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("rayyfy").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotating file appender; the terminal belongs to the UI
    let file_appender = tracing_appender::rolling::daily(&log_dir, "rayyfy.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rayyfy=debug"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    let stderr_layer = dev.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}

/// Redirect stderr to /dev/null so ALSA chatter does not tear the TUI
#[cfg(unix)]
fn redirect_stderr_to_null() -> Result<()> {
    unsafe {
        let null_fd = libc::open(b"/dev/null\0".as_ptr() as *const libc::c_char, libc::O_WRONLY);
        if null_fd == -1 {
            return Err(anyhow::anyhow!("Failed to open /dev/null"));
        }

        if libc::dup2(null_fd, libc::STDERR_FILENO) == -1 {
            libc::close(null_fd);
            return Err(anyhow::anyhow!("Failed to redirect stderr"));
        }

        libc::close(null_fd);
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env_overrides();
            config
        }
        None => Config::load()?,
    };

    if let Some(url) = &args.catalog_url {
        config.catalog.base_url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.dev)?;

    info!("Rayyfy starting up");

    #[cfg(unix)]
    if !args.dev {
        debug!("Redirecting stderr to suppress ALSA errors");
        if let Err(e) = redirect_stderr_to_null() {
            debug!("Keeping stderr: {}", e);
        }
    }

    let config = load_config(&args)?;
    info!("Using catalog at {}", config.catalog.base_url);

    let catalog = CatalogClient::new(&config.catalog)?;
    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let player = AudioPlayer::new(catalog.stream_http().clone(), media_tx, config.audio.volume)?;

    let mut app = App::new(config, catalog, Box::new(player), media_rx);
    let mut terminal = TerminalManager::new()?;
    let result = app.run(&mut terminal).await;
    drop(terminal);

    if let Err(e) = &result {
        error!("Rayyfy exited with an error: {:#}", e);
    }
    info!("Rayyfy shut down");
    result
}
