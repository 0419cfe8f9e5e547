use crate::codec::CompressionLevel;
use crate::error::{ParcelError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest payload the transport accepts for one document.
pub const DEFAULT_MAX_PART_BYTES: u64 = 45 * 1024 * 1024;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
pub const HISTORY_FILE: &str = "bot_file_history.json";
pub const SIZE_CACHE_FILE: &str = "file_size_cache.json";
pub const SCRATCH_DIR: &str = "scratch";

/// On-disk shape of the configuration file. Everything optional is defaulted
/// here; cross-field rules live in [`RawSettings::validate`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawSettings {
    pub folders_to_monitor: Vec<PathBuf>,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default = "default_max_part_bytes")]
    pub max_part_bytes: u64,
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_compression")]
    pub compression_level: String,
    #[serde(default)]
    pub enable_encryption: bool,
    #[serde(default)]
    pub zip_password: String,
    #[serde(default = "default_true")]
    pub enable_cache: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub disable_logs: bool,
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub flood: FloodLimits,
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}
fn default_max_part_bytes() -> u64 {
    DEFAULT_MAX_PART_BYTES
}
fn default_compression() -> String {
    "default".to_string()
}
fn default_true() -> bool {
    true
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TelegramSettings {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default)]
    pub forward_chat_id: Option<i64>,
    #[serde(default)]
    pub enable_forward: bool,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    60
}

impl TelegramSettings {
    /// Forward destination, only when forwarding is switched on.
    pub fn forward_target(&self) -> Option<i64> {
        match self.forward_chat_id {
            Some(id) if self.enable_forward && id != 0 => Some(id),
            _ => None,
        }
    }
}

/// Optional ceilings on flood-control retries. Both unset means retry forever.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodLimits {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub max_wait_seconds: Option<u64>,
}

impl FloodLimits {
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_seconds.map(Duration::from_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encryption {
    pub password: String,
}

/// Validated configuration. Construct through [`Settings::load`] or
/// [`RawSettings::validate`].
#[derive(Clone, Debug)]
pub struct Settings {
    pub folders: Vec<PathBuf>,
    pub check_interval: Duration,
    pub max_part_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub compression: CompressionLevel,
    pub encryption: Option<Encryption>,
    pub enable_cache: bool,
    pub data_dir: PathBuf,
    pub disable_logs: bool,
    pub telegram: TelegramSettings,
    pub backend_url: Option<String>,
    pub flood: FloodLimits,
}

impl RawSettings {
    pub fn validate(self) -> Result<Settings> {
        let compression: CompressionLevel = self.compression_level.parse()?;

        if self.enable_encryption && compression == CompressionLevel::None {
            return Err(ParcelError::Config(
                "encryption cannot be enabled when compression is set to 'none'".into(),
            ));
        }
        if self.enable_encryption && self.zip_password.is_empty() {
            return Err(ParcelError::Config(
                "encryption is enabled but zip_password is empty".into(),
            ));
        }
        if self.folders_to_monitor.is_empty() {
            return Err(ParcelError::Config("folders_to_monitor is empty".into()));
        }
        if self.max_part_bytes == 0 {
            return Err(ParcelError::Config("max_part_bytes must be positive".into()));
        }

        let allowed_extensions = self
            .allowed_extensions
            .iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Settings {
            folders: self.folders_to_monitor,
            check_interval: Duration::from_secs(self.check_interval),
            max_part_bytes: self.max_part_bytes,
            allowed_extensions,
            compression,
            encryption: self.enable_encryption.then(|| Encryption {
                password: self.zip_password,
            }),
            enable_cache: self.enable_cache,
            data_dir: self.data_dir,
            disable_logs: self.disable_logs,
            telegram: self.telegram,
            backend_url: self.backend_url.filter(|u| !u.trim().is_empty()),
            flood: self.flood,
        })
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ParcelError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawSettings = serde_json::from_str(text)
            .map_err(|e| ParcelError::Config(format!("invalid config: {e}")))?;
        raw.validate()
    }

    /// Fails unless the transport credentials are present. Only the daemon
    /// needs them; local subcommands do not.
    pub fn require_transport(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            return Err(ParcelError::Config("telegram.token is required".into()));
        }
        if self.telegram.chat_id == 0 {
            return Err(ParcelError::Config("telegram.chat_id is required".into()));
        }
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn password(&self) -> Option<&str> {
        self.encryption.as_ref().map(|e| e.password.as_str())
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    pub fn size_cache_path(&self) -> PathBuf {
        self.data_dir.join(SIZE_CACHE_FILE)
    }

    /// Parent of the per-file scratch directories.
    pub fn scratch_root(&self) -> PathBuf {
        self.data_dir.join(SCRATCH_DIR)
    }

    /// Extension allow-list check on the file name. An empty list allows all.
    pub fn extension_allowed(&self, path: &Path) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        self.allowed_extensions.iter().any(|ext| name.ends_with(ext))
    }
}
