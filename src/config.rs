//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce le costanti della policy di compressione (fisse, non esposte)
//! - Definisce la struct `Config` con i parametri operativi del run
//! - Valida i parametri prima dell'avvio dello scan
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Policy fissa:
//! - Immagini: larghezza massima 1920px, qualità 80
//! - Video: H.264 (libx264) CRF 23 preset `medium`, audio AAC 128k, `+faststart`
//!
//! ## Parametri operativi:
//! - `assets_dir`: Directory radice degli asset (default: `assets`)
//! - `workers`: Numero di worker paralleli (default: 4)
//! - `encoder_command`: Encoder video esterno (default: `ffmpeg`)
//! - `optimizer_command`: Ottimizzatore immagini esterno (default: `optimize-images`)
//! - `preview_limit`: Righe mostrate nell'anteprima (default: 5)
//! - `json_output`: Anteprima e risultati in JSON (default: false)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CompressError;

/// Images wider than this are downscaled proportionally.
pub const MAX_WIDTH: u32 = 1920;
/// Quality target for image recompression (1-100).
pub const IMAGE_QUALITY: u8 = 80;
/// Constant rate factor for video (lower = better quality, larger file).
pub const VIDEO_CRF: u8 = 23;
/// x264 speed/efficiency preset.
pub const VIDEO_PRESET: &str = "medium";
pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "128k";

pub const DEFAULT_ASSETS_DIR: &str = "assets";
pub const DEFAULT_PREVIEW_LIMIT: usize = 5;

/// Operational settings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the asset tree, relative paths resolve against the invocation directory
    pub assets_dir: PathBuf,
    /// Number of candidates staged in parallel
    pub workers: usize,
    /// External video encoder executable
    pub encoder_command: String,
    /// External image optimizer executable
    pub optimizer_command: String,
    /// Number of ledger rows shown in the preview
    pub preview_limit: usize,
    /// Emit the preview and commit result as JSON on stdout
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            workers: 4,
            encoder_command: "ffmpeg".to_string(),
            optimizer_command: "optimize-images".to_string(),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CompressError::Validation(
                "Number of workers must be greater than 0".to_string(),
            )
            .into());
        }

        if self.encoder_command.trim().is_empty() {
            return Err(CompressError::Validation("Encoder command must not be empty".to_string()).into());
        }

        if self.optimizer_command.trim().is_empty() {
            return Err(CompressError::Validation("Optimizer command must not be empty".to_string()).into());
        }

        Ok(())
    }

    /// Load configuration from file, falling back to defaults when it is absent
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Asset root resolved against `cwd` when relative
    pub fn resolve_assets_dir(&self, cwd: &Path) -> PathBuf {
        if self.assets_dir.is_absolute() {
            self.assets_dir.clone()
        } else {
            cwd.join(&self.assets_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = 2;
        config.encoder_command = "  ".to_string();
        assert!(config.validate().is_err());

        config.encoder_command = "ffmpeg".to_string();
        config.optimizer_command = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.encoder_command, "ffmpeg");
        assert_eq!(config.optimizer_command, "optimize-images");
        assert_eq!(config.preview_limit, 5);
        assert!(!config.json_output);
    }

    #[test]
    fn test_resolve_assets_dir() {
        let config = Config::default();
        assert_eq!(
            config.resolve_assets_dir(Path::new("/srv/site")),
            PathBuf::from("/srv/site/assets")
        );

        let config = Config {
            assets_dir: PathBuf::from("/data/media"),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_assets_dir(Path::new("/srv/site")),
            PathBuf::from("/data/media")
        );
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            workers: 8,
            encoder_command: "/opt/ffmpeg/bin/ffmpeg".to_string(),
            preview_limit: 10,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.workers, 8);
        assert_eq!(loaded_config.encoder_command, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(loaded_config.optimizer_command, "optimize-images");
        assert_eq!(loaded_config.preview_limit, 10);
    }

    #[tokio::test]
    async fn test_missing_config_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.workers, 4);
    }

    #[tokio::test]
    async fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "workers": 2 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.encoder_command, "ffmpeg");
    }
}
