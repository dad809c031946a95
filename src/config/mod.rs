//! Runtime configuration: default timezone, feed paging, and the snapshot
//! location. Stored as JSON under the platform config directory; saves are
//! atomic (tmp file + rename).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_TIMEZONE;
use crate::errors::{CoreError, CoreResult};

const CONFIG_FILE: &str = "config.json";
const APP_DIR: &str = "perdiem";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA zone applied when a user has none set.
    pub default_timezone: String,
    /// Transactions requested per sync page.
    pub sync_page_size: u32,
    /// Hard cap on pages per item sync; a feed that keeps reporting more
    /// pages past this is treated as misbehaving.
    pub max_sync_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timezone: DEFAULT_TIMEZONE.into(),
            sync_page_size: 500,
            max_sync_pages: 1000,
            snapshot_path: None,
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> CoreResult<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| CoreError::Configuration("no config directory available".into()))?
            .join(APP_DIR);
        Self::from_base(base)
    }

    pub fn with_base_dir(base: PathBuf) -> CoreResult<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> CoreResult<Self> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    pub fn load(&self) -> CoreResult<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn write_atomic(path: &Path, contents: &str) -> CoreResult<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
