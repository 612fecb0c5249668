use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rustc_hash::FxHashSet;

use crate::db::models::{AthRecord, CooldownEntry, CooldownStatus, MonitoringEntry};
use crate::db::storage::Storage;

/// Durable map keyed by token id.
///
/// The map is held in memory and written through to its [`Storage`] on
/// every mutation. Write failures are logged and swallowed: the in-memory
/// state keeps driving the current cycle while the durable copy lags.
pub struct KeyedStore<V> {
    name: &'static str,
    entries: BTreeMap<String, V>,
    storage: Box<dyn Storage<BTreeMap<String, V>>>,
}

pub type MonitoringStore = KeyedStore<MonitoringEntry>;
pub type CooldownStore = KeyedStore<CooldownEntry>;
pub type AthStore = KeyedStore<AthRecord>;

impl<V> KeyedStore<V> {
    /// Loads the map from storage. An unreadable document is set aside and
    /// the store starts empty.
    pub fn open(name: &'static str, storage: Box<dyn Storage<BTreeMap<String, V>>>) -> Self {
        let entries = match storage.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Failed to load {} from {}, starting empty: {:#}",
                    name,
                    storage.describe(),
                    e
                );
                match storage.set_aside() {
                    Ok(Some(location)) => warn!("Unreadable {} moved to {}", name, location),
                    Ok(None) => {},
                    Err(e) => error!("Failed to set aside unreadable {}: {:#}", name, e),
                }
                BTreeMap::new()
            },
        };

        Self {
            name,
            entries,
            storage,
        }
    }

    pub fn get(&self, token_id: &str) -> Option<&V> {
        self.entries.get(token_id)
    }

    pub fn contains(&self, token_id: &str) -> bool {
        self.entries.contains_key(token_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn upsert(&mut self, token_id: &str, value: V) {
        self.entries.insert(token_id.to_string(), value);
        self.persist();
    }

    /// Removes the entry, persisting only if something was removed.
    pub fn remove(&mut self, token_id: &str) -> Option<V> {
        let removed = self.entries.remove(token_id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Drops every entry whose key is not in `keep`. Returns the removed ids.
    pub fn prune_except(&mut self, keep: &FxHashSet<String>) -> Vec<String> {
        self.prune_where(|token_id, _| !keep.contains(token_id))
    }

    fn prune_where(&mut self, mut should_drop: impl FnMut(&str, &V) -> bool) -> Vec<String> {
        let removed: Vec<String> = self
            .entries
            .iter()
            .filter(|(token_id, value)| should_drop(token_id, value))
            .map(|(token_id, _)| token_id.clone())
            .collect();

        if !removed.is_empty() {
            for token_id in &removed {
                self.entries.remove(token_id);
            }
            info!("Pruned {} {} entr(ies)", removed.len(), self.name);
            self.persist();
        }

        removed
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.entries) {
            error!(
                "Failed to save {} to {}: {:#}",
                self.name,
                self.storage.describe(),
                e
            );
        }
    }
}

impl KeyedStore<MonitoringEntry> {
    /// Last recorded drawdown, if the token was monitored in a previous cycle.
    pub fn last_drawdown(&self, token_id: &str) -> Option<f64> {
        self.get(token_id).map(|entry| entry.last_drawdown_percent)
    }
}

impl KeyedStore<CooldownEntry> {
    pub fn is_active(&self, token_id: &str, now: DateTime<Utc>) -> CooldownStatus {
        match self.get(token_id) {
            Some(entry) if entry.is_active_at(now) => CooldownStatus::Active {
                until: entry.cooldown_until,
                drawdown_at_alert: entry.drawdown_at_alert,
            },
            _ => CooldownStatus::Inactive,
        }
    }

    /// Drops cooldowns that have already elapsed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        self.prune_where(|_, entry| !entry.is_active_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::storage::{JsonFile, MemoryStorage};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    /// Storage handle that stays inspectable after being boxed into a store.
    struct Shared<T>(Arc<MemoryStorage<T>>);

    impl<T: Clone + Default + Send> Storage<T> for Shared<T> {
        fn load(&self) -> anyhow::Result<T> {
            self.0.load()
        }

        fn save(&self, value: &T) -> anyhow::Result<()> {
            self.0.save(value)
        }

        fn describe(&self) -> String {
            self.0.describe()
        }
    }

    struct FailingStorage;

    impl<T> Storage<T> for FailingStorage {
        fn load(&self) -> anyhow::Result<T> {
            anyhow::bail!("disk unavailable")
        }

        fn save(&self, _value: &T) -> anyhow::Result<()> {
            anyhow::bail!("disk unavailable")
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn watchlist(ids: &[&str]) -> FxHashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_upsert_get_remove() {
        let mut store = MonitoringStore::open("monitoring", Box::new(MemoryStorage::new()));

        store.upsert("a", MonitoringEntry::new("a", "AAA", 70.0));
        assert_eq!(store.last_drawdown("a"), Some(70.0));

        store.upsert("a", MonitoringEntry::new("a", "AAA", 75.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.last_drawdown("a"), Some(75.0));

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.last_drawdown("a"), None);
    }

    #[test]
    fn test_mutations_are_written_through() {
        let backing = Arc::new(MemoryStorage::new());
        let mut store = MonitoringStore::open("monitoring", Box::new(Shared(backing.clone())));

        store.upsert("a", MonitoringEntry::new("a", "AAA", 70.0));
        store.upsert("b", MonitoringEntry::new("b", "BBB", 80.0));
        store.remove("a");

        let persisted = backing.load().unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(persisted.contains_key("b"));
    }

    #[test]
    fn test_prune_except_drops_unlisted_tokens() {
        let mut store = MonitoringStore::open("monitoring", Box::new(MemoryStorage::new()));
        store.upsert("a", MonitoringEntry::new("a", "AAA", 70.0));
        store.upsert("b", MonitoringEntry::new("b", "BBB", 80.0));
        store.upsert("c", MonitoringEntry::new("c", "CCC", 90.0));

        let removed = store.prune_except(&watchlist(&["b", "z"]));

        assert_eq!(removed, vec!["a".to_string(), "c".to_string()]);
        assert!(store.contains("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cooldown_activity() {
        let alert_time = Utc.with_ymd_and_hms(2024, 6, 1, 12, 10, 0).unwrap();
        let mut store = CooldownStore::open("cooldowns", Box::new(MemoryStorage::new()));
        store.upsert("a", CooldownEntry::new("a", "AAA", 66.0, &alert_time));

        assert_eq!(
            store.is_active("a", alert_time + Duration::minutes(5)),
            CooldownStatus::Active {
                until: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
                drawdown_at_alert: 66.0,
            }
        );
        assert_eq!(
            store.is_active("a", alert_time + Duration::minutes(20)),
            CooldownStatus::Inactive
        );
        // Elapsed but not deleted
        assert!(store.contains("a"));
        assert_eq!(store.is_active("missing", alert_time), CooldownStatus::Inactive);
    }

    #[test]
    fn test_prune_expired_cooldowns() {
        let early = Utc.with_ymd_and_hms(2024, 6, 1, 12, 10, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 12, 40, 0).unwrap();
        let mut store = CooldownStore::open("cooldowns", Box::new(MemoryStorage::new()));
        store.upsert("old", CooldownEntry::new("old", "OLD", 70.0, &early));
        store.upsert("new", CooldownEntry::new("new", "NEW", 70.0, &late));

        let removed = store.prune_expired(late + Duration::minutes(1));

        assert_eq!(removed, vec!["old".to_string()]);
        assert!(store.contains("new"));
    }

    #[test]
    fn test_reopen_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitoring-state.json");

        {
            let mut store = MonitoringStore::open("monitoring", Box::new(JsonFile::new(&path)));
            store.upsert("a", MonitoringEntry::new("a", "AAA", 64.0));
        }

        let store = MonitoringStore::open("monitoring", Box::new(JsonFile::new(&path)));
        assert_eq!(store.last_drawdown("a"), Some(64.0));
    }

    #[test]
    fn test_unreadable_file_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldowns.json");
        std::fs::write(&path, r#"{"a": {"lastAlert": "yesterday"}}"#).unwrap();

        let mut store = CooldownStore::open("cooldowns", Box::new(JsonFile::new(&path)));
        assert!(store.is_empty());

        let now = Utc::now();
        store.upsert("b", CooldownEntry::new("b", "BBB", 70.0, &now));

        let aside: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().contains("cooldowns.json.corrupt-"))
            .collect();
        assert_eq!(aside.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&aside[0]).unwrap(),
            r#"{"a": {"lastAlert": "yesterday"}}"#
        );

        let reopened = CooldownStore::open("cooldowns", Box::new(JsonFile::new(&path)));
        assert!(reopened.contains("b"));
    }

    #[test]
    fn test_storage_failures_do_not_lose_in_memory_state() {
        let mut store = MonitoringStore::open("monitoring", Box::new(FailingStorage));
        assert!(store.is_empty());

        store.upsert("a", MonitoringEntry::new("a", "AAA", 70.0));
        assert_eq!(store.last_drawdown("a"), Some(70.0));
    }
}
