mod alert;
mod ath;
mod cooldown;
mod monitoring;
mod token_snapshot;

pub use alert::{Alert, AlertToken, BreakoutInfo, SpikeStats};
pub use ath::AthRecord;
pub use cooldown::{CooldownEntry, CooldownStatus};
pub use monitoring::MonitoringEntry;
pub use token_snapshot::{TokenSnapshot, WindowStats};
