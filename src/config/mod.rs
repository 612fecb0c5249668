#[allow(clippy::module_inception)]
mod config;

pub use self::config::{
    ApiSettings, NotificationSettings, ScannerSettings, Settings, StorageSettings,
};
