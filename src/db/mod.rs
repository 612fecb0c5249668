use anyhow::Context;
use log::info;

use crate::config::StorageSettings;

pub mod archive;
pub mod models;
pub mod storage;
pub mod store;

pub use archive::{LatestSnapshot, SnapshotArchive, TokenHistory};
pub use storage::{JsonFile, MemoryStorage, Storage};
pub use store::{AthStore, CooldownStore, KeyedStore, MonitoringStore};

pub const MONITORING_FILE: &str = "monitoring-state.json";
pub const COOLDOWNS_FILE: &str = "cooldowns.json";
pub const ATH_FILE: &str = "ath-data.json";
pub const HISTORY_FILE: &str = "token-history.json";
pub const LATEST_SNAPSHOT_FILE: &str = "latest-snapshot.json";
pub const ALERTS_FILE: &str = "alerts.json";

/// All durable state of the scanner.
///
/// The keyed stores (ATH cache, monitoring, cooldowns) are read at open time
/// and written through on every change. The archive is append-only and only
/// touched at the end of a cycle.
pub struct Stores {
    pub ath: AthStore,
    pub monitoring: MonitoringStore,
    pub cooldowns: CooldownStore,
    pub archive: SnapshotArchive,
}

impl Stores {
    /// Opens JSON-file backed stores under `settings.data_dir`, creating it if needed.
    pub fn open(settings: &StorageSettings) -> anyhow::Result<Self> {
        let dir = &settings.data_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        let stores = Self {
            ath: AthStore::open("ATH cache", Box::new(JsonFile::new(dir.join(ATH_FILE)))),
            monitoring: MonitoringStore::open(
                "monitoring state",
                Box::new(JsonFile::new(dir.join(MONITORING_FILE))),
            ),
            cooldowns: CooldownStore::open(
                "cooldowns",
                Box::new(JsonFile::new(dir.join(COOLDOWNS_FILE))),
            ),
            archive: SnapshotArchive::new(
                Box::new(JsonFile::new(dir.join(HISTORY_FILE))),
                Box::new(JsonFile::new(dir.join(LATEST_SNAPSHOT_FILE))),
                Box::new(JsonFile::new(dir.join(ALERTS_FILE))),
            ),
        };

        info!(
            "Opened state in {}: {} cached ATH record(s), {} monitored, {} in cooldown",
            dir.display(),
            stores.ath.len(),
            stores.monitoring.len(),
            stores.cooldowns.len()
        );

        Ok(stores)
    }

    /// Stores that never touch the filesystem.
    pub fn in_memory() -> Self {
        Self {
            ath: AthStore::open("ATH cache", Box::new(MemoryStorage::new())),
            monitoring: MonitoringStore::open("monitoring state", Box::new(MemoryStorage::new())),
            cooldowns: CooldownStore::open("cooldowns", Box::new(MemoryStorage::new())),
            archive: SnapshotArchive::new(
                Box::new(MemoryStorage::new()),
                Box::new(MemoryStorage::new()),
                Box::new(MemoryStorage::new()),
            ),
        }
    }
}
