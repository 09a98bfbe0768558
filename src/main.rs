use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ratio_spoof::cli::Args;
use ratio_spoof::config::SessionConfig;
use ratio_spoof::display::Display;
use ratio_spoof::emulation::{Emulation, ProfileRegistry};
use ratio_spoof::session::Session;
use ratio_spoof::torrent_file::TorrentFile;
use ratio_spoof::tracker::{HttpTracker, RetryPolicy};
use ratio_spoof::{Result, SpoofError};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    if let Err(e) = run(args).await {
        error!(error = %e, "Fatal error");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(args: Args) -> Result<()> {
    let registry = ProfileRegistry::load()?;
    if args.list_clients {
        for code in registry.list_codes() {
            println!("{}", code);
        }
        return Ok(());
    }

    let path = args
        .torrent
        .as_deref()
        .ok_or_else(|| SpoofError::Configuration("a torrent file is required".to_string()))?;
    let torrent = TorrentFile::open(path)?;
    let config = SessionConfig::resolve(&args, torrent.total_size)?;
    let profile = registry.resolve(&config.client_code)?;
    info!(
        torrent = %torrent.name,
        info_hash = %torrent.info_hash_hex(),
        client = %profile.name,
        "Starting session"
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let emulation = Emulation::new(profile, &mut rng);
    let tracker = HttpTracker::new(
        torrent.announce_urls.clone(),
        RetryPolicy::with_max_attempts(args.max_attempts),
    )?;

    let header = format!("{}\nclient: {}", torrent, emulation.name());
    let debug = config.debug;
    let session = Arc::new(Session::new(torrent, config, emulation, tracker, rng));

    let display = Display::new(header, session.shared_state(), debug);
    tokio::spawn(display.run());

    session.run(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown requested");
}
