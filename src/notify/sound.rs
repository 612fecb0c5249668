//! Audible alerts through an external WAV player.
//!
//! Spikes and breakouts each get their own sound so the operator can tell
//! them apart without looking at the terminal.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use tokio::process::Command;

use super::{AlertKind, Notifier};
use crate::config::NotificationSettings;

pub struct SoundNotifier {
    player: String,
    spike_sound: PathBuf,
    breakout_sound: PathBuf,
}

impl SoundNotifier {
    /// Returns None if notifications are disabled in settings.
    ///
    /// Missing sound files only produce a warning here; the failure surfaces
    /// again (and is logged) when an alert tries to play them.
    pub fn new(settings: &NotificationSettings) -> Option<Self> {
        if !settings.enabled {
            info!("Sound notifications are disabled");
            return None;
        }

        for sound in [&settings.spike_sound, &settings.breakout_sound] {
            if !sound.exists() {
                warn!("Alert sound not found: {}", sound.display());
            }
        }

        info!(
            "Sound notifications enabled (player: {}, spike: {}, breakout: {})",
            settings.player,
            settings.spike_sound.display(),
            settings.breakout_sound.display()
        );

        Some(Self {
            player: settings.player.clone(),
            spike_sound: settings.spike_sound.clone(),
            breakout_sound: settings.breakout_sound.clone(),
        })
    }

    pub fn sound_for(&self, kind: AlertKind) -> &Path {
        match kind {
            AlertKind::Spike => &self.spike_sound,
            AlertKind::Breakout => &self.breakout_sound,
        }
    }
}

#[async_trait]
impl Notifier for SoundNotifier {
    async fn notify(&self, kind: AlertKind) -> Result<()> {
        let sound = self.sound_for(kind);
        if !sound.exists() {
            bail!("sound file {} does not exist", sound.display());
        }

        let status = Command::new(&self.player)
            .arg(sound)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.player))?;

        if !status.success() {
            bail!("{} exited with {}", self.player, status);
        }
        Ok(())
    }
}
