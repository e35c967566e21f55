//! # Video Strategy
//!
//! Ricodifica video con l'encoder esterno (FFmpeg).
//!
//! ## Policy fissa:
//! - Codec video: libx264, CRF 23, preset `medium`
//! - Codec audio: AAC 128k
//! - `-movflags +faststart` per lo streaming
//! - `-y`: sovrascrive la destinazione senza chiedere
//!
//! L'encoder legge l'originale e scrive direttamente nel path di staging.
//! Output silenzioso: conta solo l'exit status. Nessun retry.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::CompressionStrategy;
use crate::config::{AUDIO_BITRATE, AUDIO_CODEC, VIDEO_CODEC, VIDEO_CRF, VIDEO_PRESET};
use crate::utils::{file_label, to_os_args};

/// Handles video re-encoding
pub struct VideoStrategy {
    encoder: String,
}

impl VideoStrategy {
    pub fn new(encoder: impl Into<String>) -> Self {
        Self {
            encoder: encoder.into(),
        }
    }

    /// Full encoder argument list for one file
    pub fn encoder_args(source: &Path, destination: &Path) -> Vec<OsString> {
        let crf = VIDEO_CRF.to_string();
        to_os_args([
            OsStr::new("-y"),
            OsStr::new("-i"),
            source.as_os_str(),
            OsStr::new("-vcodec"),
            OsStr::new(VIDEO_CODEC),
            OsStr::new("-crf"),
            OsStr::new(&crf),
            OsStr::new("-preset"),
            OsStr::new(VIDEO_PRESET),
            OsStr::new("-acodec"),
            OsStr::new(AUDIO_CODEC),
            OsStr::new("-b:a"),
            OsStr::new(AUDIO_BITRATE),
            OsStr::new("-movflags"),
            OsStr::new("+faststart"),
            destination.as_os_str(),
        ])
    }

    async fn encode(&self, source: &Path, destination: &Path) -> bool {
        debug!(
            "🎬 Encoding {} (CRF: {}, preset: {})",
            file_label(source),
            VIDEO_CRF,
            VIDEO_PRESET
        );

        let start_time = std::time::Instant::now();
        let status = Command::new(&self.encoder)
            .args(Self::encoder_args(source, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        let elapsed = start_time.elapsed();

        match status {
            Ok(status) if status.success() => {
                debug!("✅ {} encoded in {:.1}s", file_label(source), elapsed.as_secs_f64());
                true
            }
            Ok(status) => {
                warn!(
                    "{} exited with {} after {:.1}s for {}",
                    self.encoder,
                    status,
                    elapsed.as_secs_f64(),
                    file_label(source)
                );
                false
            }
            Err(e) => {
                warn!("Failed to execute {}: {}", self.encoder, e);
                false
            }
        }
    }
}

impl CompressionStrategy for VideoStrategy {
    fn name(&self) -> &'static str {
        "video-encoder"
    }

    fn attempt<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, bool> {
        self.encode(source, destination).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_args() {
        let args = VideoStrategy::encoder_args(Path::new("in/clip.mp4"), Path::new("in/clip_temp.mp4"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();

        assert_eq!(
            args,
            vec![
                "-y", "-i", "in/clip.mp4", "-vcodec", "libx264", "-crf", "23", "-preset", "medium",
                "-acodec", "aac", "-b:a", "128k", "-movflags", "+faststart", "in/clip_temp.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_encoder_reports_failure() {
        let strategy = VideoStrategy::new("definitely-not-a-real-encoder-4821");
        let ok = strategy
            .attempt(Path::new("in.mp4"), Path::new("in_temp.mp4"))
            .await;
        assert!(!ok);
    }
}
