use crate::domain::{ComparisonPreset, DEFAULT_CROP_DEPTH, PresetName, SubmissionMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub preview_scale: f64,
    pub default_crop_depth: f64,
    pub preset: PresetName,
    pub submission_mode: SubmissionMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8000".to_string(),
            poll_interval_ms: 1000,
            request_timeout_secs: 30,
            preview_scale: 0.5,
            default_crop_depth: DEFAULT_CROP_DEPTH,
            preset: PresetName::Standard,
            submission_mode: SubmissionMode::Async,
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn comparison_preset(&self) -> ComparisonPreset {
        ComparisonPreset::named(self.preset)
    }
}

pub fn load_config() -> AppConfig {
    let path = config_path();
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("Ignoring malformed config {}: {}", path.display(), err);
            AppConfig::default()
        }
    }
}

pub fn save_config(config: &AppConfig) -> std::io::Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, contents)
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DOCCOMPARE_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    app_data_dir().join("config.toml")
}

fn app_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("DOCCOMPARE_DATA_HOME") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = home::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("DocCompare");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("DocCompare");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("doccompare");
        }
        if let Some(home) = home::home_dir() {
            return home.join(".local").join("share").join("doccompare");
        }
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".doccompare")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            service_url = "https://compare.example.com"
            preset = "tight"
            "#,
        )
        .unwrap();
        assert_eq!(config.service_url, "https://compare.example.com");
        assert_eq!(config.preset, PresetName::Tight);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.comparison_preset().ratio_threshold, 0.7);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = AppConfig {
            poll_interval_ms: 250,
            submission_mode: SubmissionMode::Sync,
            ..Default::default()
        };
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.poll_interval(), Duration::from_millis(250));
        assert_eq!(loaded.submission_mode, SubmissionMode::Sync);
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let config = AppConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
