use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Transfer tuning for the bundled curl agent (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Seconds to wait for the TCP/TLS connection.
    pub connect_timeout_secs: u64,
    /// Abort if the rate stays below this many bytes/sec for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    /// Optional User-Agent header (some IPTV portals require one).
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            user_agent: None,
        }
    }
}

/// Global configuration loaded from `~/.config/vdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdmConfig {
    /// Maximum number of jobs in the downloading state at once.
    pub max_concurrent: usize,
    /// Root folder for movies, series and cached covers (None = XDG data dir).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Minimum interval between progress writes to the job store, per job.
    pub progress_persist_interval_ms: u64,
    /// Optional transfer tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub transfer: Option<TransferConfig>,
}

impl Default for VdmConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            download_dir: None,
            progress_persist_interval_ms: 1000,
            transfer: None,
        }
    }
}

impl VdmConfig {
    /// Concurrency cap, never below 1.
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent.max(1)
    }

    pub fn progress_persist_interval(&self) -> Duration {
        Duration::from_millis(self.progress_persist_interval_ms)
    }

    pub fn transfer_config(&self) -> TransferConfig {
        self.transfer.clone().unwrap_or_default()
    }

    /// Download root: the configured dir, else `~/.local/share/vdm`.
    pub fn resolve_download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vdm")?;
        Ok(xdg_dirs.get_data_home())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = VdmConfig::default();
        assert_eq!(cfg.max_concurrent, 2);
        assert_eq!(cfg.progress_persist_interval_ms, 1000);
        assert!(cfg.download_dir.is_none());
        assert!(cfg.transfer.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = VdmConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: VdmConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrent, cfg.max_concurrent);
        assert_eq!(
            parsed.progress_persist_interval_ms,
            cfg.progress_persist_interval_ms
        );
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_concurrent = 4
            download_dir = "/srv/media"
            progress_persist_interval_ms = 250

            [transfer]
            connect_timeout_secs = 10
            low_speed_limit_bytes = 512
            low_speed_time_secs = 30
            user_agent = "VLC/3.0"
        "#;
        let cfg: VdmConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent, 4);
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/srv/media")));
        assert_eq!(cfg.progress_persist_interval(), Duration::from_millis(250));
        let transfer = cfg.transfer_config();
        assert_eq!(transfer.connect_timeout_secs, 10);
        assert_eq!(transfer.user_agent.as_deref(), Some("VLC/3.0"));
        assert_eq!(
            cfg.resolve_download_dir().unwrap(),
            PathBuf::from("/srv/media")
        );
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let cfg = VdmConfig {
            max_concurrent: 0,
            ..VdmConfig::default()
        };
        assert_eq!(cfg.effective_max_concurrent(), 1);
    }
}
