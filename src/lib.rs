pub mod config;
pub mod cron;
pub mod db;
pub mod notify;
pub mod providers;
pub mod scanner;
pub mod utils;
pub mod watchlist;

pub use config::Settings;
pub use cron::ScanScheduler;
pub use db::Stores;
pub use notify::SoundNotifier;
pub use providers::{JupiterClient, SolanaTrackerClient};
pub use scanner::Scanner;
pub use watchlist::WatchlistFile;
