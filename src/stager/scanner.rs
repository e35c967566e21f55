//! # Scanner
//!
//! Orchestratore dello scan: discovery → staging parallelo → ledger.
//!
//! ## Gestione concorrenza:
//! - Semaforo con `workers` permessi, un task tokio per candidato
//! - I task vengono attesi in ordine di discovery, quindi il ledger mantiene
//!   l'ordine dello scan indipendentemente da quale worker finisce prima
//! - L'unico scrittore del ledger è il loop di raccolta
//!
//! ## Cancellazione:
//! - Segnale di stop via `broadcast` (Ctrl-C)
//! - Controllato prima e dopo l'attesa del permesso, mai durante un encode
//! - I candidati già avviati terminano normalmente

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{error, info, warn};

use super::{StageOutcome, StagingCoordinator};
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::ledger::ChangeLedger;
use crate::progress::{ProgressManager, ScanStats};
use crate::utils::stop_requested;

/// Result of one scan
#[derive(Debug)]
pub struct ScanReport {
    pub ledger: ChangeLedger,
    pub stats: ScanStats,
    /// Stale staging copies removed before scanning
    pub stale_removed: usize,
    /// Originals renamed back from a backup left by an interrupted swap
    pub restored: usize,
    /// Stopped early by the operator
    pub interrupted: bool,
}

/// Drives the staging coordinator over an asset tree
pub struct Scanner {
    coordinator: Arc<StagingCoordinator>,
    workers: usize,
    stop_receiver: Option<broadcast::Receiver<()>>,
    show_progress: bool,
}

impl Scanner {
    pub fn new(coordinator: StagingCoordinator, workers: usize) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            workers: workers.max(1),
            stop_receiver: None,
            show_progress: true,
        }
    }

    /// Honor stop signals between candidates
    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Checks if a stop signal has been received
    fn should_stop(&mut self) -> bool {
        stop_requested(self.stop_receiver.as_mut())
    }

    /// Scan `root` and stage every candidate.
    ///
    /// Fails only when `root` is not a directory.
    pub async fn scan(&mut self, root: &Path) -> Result<ScanReport> {
        if !tokio::fs::metadata(root).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(CompressError::MissingRoot(root.to_path_buf()).into());
        }

        let sweep = FileManager::sweep_stale_temps(root).await?;
        if sweep.removed > 0 {
            info!("🧹 Removed {} staging copies left by an interrupted run", sweep.removed);
        }

        info!("🔍 Scanning {}...", root.display());
        let candidates = FileManager::find_candidates(root)?;
        info!(
            "Found {} media files. Creating optimized previews...",
            candidates.len()
        );

        let progress = if self.show_progress {
            ProgressManager::new(candidates.len() as u64)
        } else {
            ProgressManager::hidden()
        };

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks: Vec<(PathBuf, _)> = Vec::with_capacity(candidates.len());
        let mut interrupted = false;

        for candidate in candidates {
            if self.should_stop() {
                interrupted = true;
                break;
            }

            let permit = semaphore.clone().acquire_owned().await?;
            // the stop may have arrived while waiting for a free worker
            if self.should_stop() {
                drop(permit);
                interrupted = true;
                break;
            }

            let coordinator = Arc::clone(&self.coordinator);
            let progress = progress.clone();
            let path = candidate.path.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let outcome = coordinator.process(&candidate.path).await;
                progress.record(&outcome);
                outcome
            });
            tasks.push((path, handle));
        }

        if interrupted {
            warn!("⏹️ Stop requested, not starting remaining candidates");
        }

        let mut ledger = ChangeLedger::new();
        let mut stats = ScanStats::new();

        for (path, task) in tasks {
            match task.await {
                Ok(outcome) => {
                    stats.record(&outcome);
                    if let StageOutcome::Accepted(change) = outcome {
                        ledger.append(change);
                    }
                }
                Err(e) => {
                    stats.abandoned += 1;
                    stats.candidates += 1;
                    error!("Staging task failed for {}: {}", path.display(), e);
                    let temp = FileManager::temp_path_for(&path);
                    if let Err(e) = FileManager::remove_if_exists(&temp).await {
                        warn!("Could not remove staging copy {}: {}", temp.display(), e);
                    }
                }
            }
        }

        progress.finish(&stats.format_summary());
        info!("{}", stats.format_summary());

        Ok(ScanReport {
            ledger,
            stats,
            stale_removed: sweep.removed,
            restored: sweep.restored,
            interrupted,
        })
    }
}
