use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::download::DEFAULT_FILE_NAME;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tesseract language code, e.g. "eng".
    pub language: String,
    /// Where `<language>.traineddata` lives. Defaults to the data dir.
    pub tessdata_dir: Option<PathBuf>,
    /// Name suggested when saving the recognized text.
    pub download_file_name: String,
    /// How long the "copied" toast stays visible.
    pub toast_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "eng".into(),
            tessdata_dir: None,
            download_file_name: DEFAULT_FILE_NAME.into(),
            toast_timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Directory: ~/.config/paper-ocr/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("paper-ocr");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    /// On first run the defaults are written out so they can be edited.
    pub fn load() -> Self {
        let path = Self::path();
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save() {
                log::warn!("Failed to write default config: {e}");
            }
            return config;
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn tessdata_dir(&self) -> PathBuf {
        self.tessdata_dir
            .clone()
            .unwrap_or_else(crate::engine::default_tessdata_dir)
    }

    /// libadwaita toasts time out in whole seconds; round up, never below 1.
    pub fn toast_timeout_secs(&self) -> u32 {
        let secs = self.toast_timeout_ms.div_ceil(1000).max(1);
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_web_app() {
        let config = Config::default();
        assert_eq!(config.language, "eng");
        assert_eq!(config.download_file_name, "converted.txt");
        assert_eq!(config.toast_timeout_ms, 2000);
        assert_eq!(config.toast_timeout_secs(), 2);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "language": "deu" }"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.language, "deu");
        assert_eq!(config.download_file_name, "converted.txt");
        assert_eq!(config.tessdata_dir, None);
    }

    #[test]
    fn missing_or_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::load_from(&path), Config::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            language: "chi_sim".into(),
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
            download_file_name: "scan.txt".into(),
            toast_timeout_ms: 1500,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        assert_eq!(config.tessdata_dir(), PathBuf::from("/opt/tessdata"));
    }

    #[test]
    fn toast_timeout_rounds_up_to_whole_seconds() {
        let mut config = Config::default();
        config.toast_timeout_ms = 1;
        assert_eq!(config.toast_timeout_secs(), 1);
        config.toast_timeout_ms = 0;
        assert_eq!(config.toast_timeout_secs(), 1);
        config.toast_timeout_ms = 2001;
        assert_eq!(config.toast_timeout_secs(), 3);
    }
}
