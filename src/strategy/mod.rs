//! # Compression Strategies
//!
//! Capacità comune a tutte le strategie: dato un file sorgente e un path di
//! destinazione in staging, prova a produrre una codifica più piccola.
//!
//! ## Contratto:
//! - `attempt(source, destination) -> bool`
//! - `true`: la destinazione contiene una codifica valida
//! - `false`: nessun output utilizzabile, il chiamante pulisce la destinazione
//! - Nessuna informazione di controllo oltre al booleano
//!
//! ## Varianti:
//! - `VideoStrategy`: encoder esterno, una sola invocazione, nessun retry
//! - `ImageStrategy`: catena a due anelli (ottimizzatore esterno → ricompressione in-process)
//!
//! La selezione avviene per `MediaKind` tramite `StrategySet`.

pub mod image;
pub mod video;

use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::file_manager::MediaKind;

pub use self::image::{ExternalOptimizer, ImageStrategy, InProcessRecompressor};
pub use self::video::VideoStrategy;

/// Attempt to write a smaller encoding of `source` at `destination`
pub trait CompressionStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// `true` only when `destination` now holds a usable encoding.
    ///
    /// For images the caller has already copied `source` to `destination`.
    fn attempt<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, bool>;
}

/// One strategy per media kind
#[derive(Clone)]
pub struct StrategySet {
    image: Arc<dyn CompressionStrategy>,
    video: Arc<dyn CompressionStrategy>,
}

impl StrategySet {
    pub fn new(image: Arc<dyn CompressionStrategy>, video: Arc<dyn CompressionStrategy>) -> Self {
        Self { image, video }
    }

    /// Production strategies wired to the configured external tools
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ImageStrategy::new(
                ExternalOptimizer::new(config.optimizer_command.clone()),
                InProcessRecompressor::default(),
            )),
            Arc::new(VideoStrategy::new(config.encoder_command.clone())),
        )
    }

    pub fn for_kind(&self, kind: MediaKind) -> &dyn CompressionStrategy {
        match kind {
            MediaKind::Image => self.image.as_ref(),
            MediaKind::Video => self.video.as_ref(),
        }
    }
}

/// Whether `command` can be spawned at all
pub async fn is_command_available(command: &str, probe_arg: &str) -> bool {
    tokio::process::Command::new(command)
        .arg(probe_arg)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .is_ok()
}

/// Log which external tools this run will use. Never fatal.
pub async fn report_available_tools(config: &Config) {
    info!("🔧 Checking external tools:");

    if is_command_available(&config.encoder_command, "-version").await {
        info!("  ✅ {} - video encoding", config.encoder_command);
    } else {
        warn!(
            "  ❌ {} - not found, videos will be left untouched",
            config.encoder_command
        );
    }

    if is_command_available(&config.optimizer_command, "--version").await {
        info!("  ✅ {} - image optimization", config.optimizer_command);
    } else {
        info!(
            "  ➖ {} - not found, images use built-in recompression",
            config.optimizer_command
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Fixed(&'static str, bool);

    impl CompressionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn attempt<'a>(&'a self, _source: &'a Path, _destination: &'a Path) -> BoxFuture<'a, bool> {
            let result = self.1;
            async move { result }.boxed()
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_kind() {
        let set = StrategySet::new(Arc::new(Fixed("img", true)), Arc::new(Fixed("vid", false)));

        assert_eq!(set.for_kind(MediaKind::Image).name(), "img");
        assert_eq!(set.for_kind(MediaKind::Video).name(), "vid");
        assert!(set.for_kind(MediaKind::Image).attempt(Path::new("a"), Path::new("b")).await);
        assert!(!set.for_kind(MediaKind::Video).attempt(Path::new("a"), Path::new("b")).await);
    }

    #[tokio::test]
    async fn test_missing_command_is_unavailable() {
        assert!(!is_command_available("definitely-not-a-real-tool-4821", "--version").await);
    }
}
