//! Operator notifications.
//!
//! Notifications are best-effort: a failure is logged by the caller and
//! never interrupts a scan cycle.

use std::fmt;

use async_trait::async_trait;

mod sound;

pub use sound::SoundNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Spike,
    Breakout,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Spike => write!(f, "spike"),
            AlertKind::Breakout => write!(f, "breakout"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, kind: AlertKind) -> anyhow::Result<()>;
}
