use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use fallen_angels::{
    notify::Notifier,
    providers::http_client,
    watchlist::WatchlistSource,
    JupiterClient, ScanScheduler, Scanner, Settings, SolanaTrackerClient, SoundNotifier, Stores,
    WatchlistFile,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let stores = Stores::open(&settings.storage).context("Failed to open scanner state")?;

    let watchlist = WatchlistFile::new(&settings.storage.watchlist);
    let tokens = watchlist.load().context("Watchlist is not readable")?;
    info!(
        "Watchlist {} has {} token(s)",
        settings.storage.watchlist.display(),
        tokens.len()
    );

    let thresholds = settings.scanner.thresholds();
    info!(
        "Thresholds: drawdown >= {}%, volume change >= {}% ({}% below ${} market cap)",
        thresholds.min_drawdown_percent,
        thresholds.min_volume_change_percent,
        thresholds.min_volume_change_percent_micro,
        thresholds.micro_cap_threshold
    );

    let client = http_client(Duration::from_secs(settings.api.request_timeout_secs))?;
    let quotes = JupiterClient::new(
        client.clone(),
        &settings.api.jupiter_base_url,
        settings.api.jupiter_api_key.clone(),
    )?;
    let ranges = SolanaTrackerClient::new(
        client,
        &settings.api.solana_tracker_base_url,
        settings.api.solana_tracker_api_key.clone(),
    )?;
    let notifier = SoundNotifier::new(&settings.notifications)
        .map(|notifier| Arc::new(notifier) as Arc<dyn Notifier>);

    let scanner = Scanner::new(
        settings.scanner.clone(),
        stores,
        Box::new(watchlist),
        Arc::new(quotes),
        Arc::new(ranges),
        notifier,
    );

    let cancellation_token = CancellationToken::new();

    let scheduler = ScanScheduler::new(scanner, &settings.scanner);
    let scheduler_token = cancellation_token.child_token();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run(scheduler_token).await {
            error!("Scan scheduler failed: {:#}", e);
        }
    });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Scanner running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    // An in-flight cycle finishes before the scheduler returns
    info!("Waiting for the current scan cycle to finish...");
    let _ = scheduler_handle.await;

    info!("Scanner stopped");
    Ok(())
}
