//! Client configuration
//!
//! Loaded from a TOML file. Sync thresholds come from a per-device preset
//! and may be overridden field by field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub room: RoomConfig,
    pub sync: SyncConfig,
}

/// Which room to join and as whom
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Base URL of the room server, used to resolve relative media paths
    pub server_url: String,
    pub room_code: String,
    /// Server-assigned user id; a random one is generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub user_name: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            room_code: String::new(),
            user_id: None,
            user_name: "listener".to_string(),
        }
    }
}

/// Client class used to pick sync thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

/// Sync settings as written in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub device_class: DeviceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ceiling_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_adjustment_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_resync_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_sync_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_fallback_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_cooldown_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_sync_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_update_hz: Option<u32>,
}

impl SyncConfig {
    pub fn for_device(device_class: DeviceClass) -> Self {
        Self {
            device_class,
            ..Default::default()
        }
    }

    /// Resolve the preset for the device class and apply overrides
    pub fn tuning(&self) -> SyncTuning {
        let base = match self.device_class {
            DeviceClass::Desktop => SyncTuning::desktop(),
            DeviceClass::Mobile => SyncTuning::mobile(),
        };

        SyncTuning {
            delay_ceiling: self
                .delay_ceiling_ms
                .map(Duration::from_millis)
                .unwrap_or(base.delay_ceiling),
            max_adjustment_secs: self.max_adjustment_secs.unwrap_or(base.max_adjustment_secs),
            hard_resync_secs: self.hard_resync_secs.unwrap_or(base.hard_resync_secs),
            soft_sync_secs: self.soft_sync_secs.unwrap_or(base.soft_sync_secs),
            load_fallback: self
                .load_fallback_ms
                .map(Duration::from_millis)
                .unwrap_or(base.load_fallback),
            resync_cooldown: self
                .resync_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(base.resync_cooldown),
            backup_sync_delay: self
                .backup_sync_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.backup_sync_delay),
            time_update_hz: self.time_update_hz.unwrap_or(base.time_update_hz),
        }
    }
}

/// Effective sync thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTuning {
    /// Delays at or beyond this are treated as stale
    pub delay_ceiling: Duration,
    /// Upper bound on forward compensation
    pub max_adjustment_secs: f64,
    pub hard_resync_secs: f64,
    pub soft_sync_secs: f64,
    /// How long to wait for `canplay` before the fallback fires
    pub load_fallback: Duration,
    /// Minimum spacing between hard-resync sync requests
    pub resync_cooldown: Duration,
    pub backup_sync_delay: Duration,
    pub time_update_hz: u32,
}

impl SyncTuning {
    pub fn desktop() -> Self {
        Self {
            delay_ceiling: Duration::from_millis(10_000),
            max_adjustment_secs: 2.0,
            hard_resync_secs: 8.0,
            soft_sync_secs: 1.0,
            load_fallback: Duration::from_millis(DEFAULT_LOAD_FALLBACK_MS),
            resync_cooldown: Duration::from_millis(DEFAULT_RESYNC_COOLDOWN_MS),
            backup_sync_delay: Duration::from_millis(BACKUP_SYNC_DELAY_MS),
            time_update_hz: MAX_TIME_UPDATES_PER_SEC,
        }
    }

    /// Tighter ceiling, cap and thresholds for constrained clients
    pub fn mobile() -> Self {
        Self {
            delay_ceiling: Duration::from_millis(3_000),
            max_adjustment_secs: 1.0,
            hard_resync_secs: 3.0,
            soft_sync_secs: 0.5,
            ..Self::desktop()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.delay_ceiling.is_zero() {
            return Err(Error::Config("delay ceiling must be positive".into()));
        }
        if !(self.max_adjustment_secs > 0.0) {
            return Err(Error::Config("max adjustment must be positive".into()));
        }
        if !(self.soft_sync_secs > 0.0) || !(self.hard_resync_secs > 0.0) {
            return Err(Error::Config("sync thresholds must be positive".into()));
        }
        if self.soft_sync_secs >= self.hard_resync_secs {
            return Err(Error::Config(format!(
                "soft sync threshold ({}s) must be below hard resync threshold ({}s)",
                self.soft_sync_secs, self.hard_resync_secs
            )));
        }
        if self.time_update_hz == 0 {
            return Err(Error::Config("time update rate must be positive".into()));
        }
        Ok(())
    }
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self::desktop()
    }
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "room-sync-client")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.sync.tuning().validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write config as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Configured user id, or a fresh anonymous one
    pub fn user_id(&self) -> String {
        self.room
            .user_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}
