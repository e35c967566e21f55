//! # Pipeline
//!
//! Scan → anteprima → decisione del chiamante → commit.
//!
//! La decisione è una closure fornita dal chiamante (prompt interattivo,
//! `--mode` da CLI, modalità fissa nei test), quindi la pipeline non sa
//! nulla di stdin.
//!
//! ## Casi particolari:
//! - Ledger vuoto: nessuna decisione, nessun commit
//! - Scan interrotto: il ledger parziale viene scartato (`Discard`) senza
//!   chiedere nulla
//! - Stop durante il commit: le entry già applicate restano, le altre
//!   vengono scartate

use anyhow::Result;
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::commit::{CommitEngine, CommitMode, CommitReport};
use crate::config::Config;
use crate::progress::ScanStats;
use crate::utils::drain_stop_signals;
use crate::report::PreviewReport;
use crate::stager::{Scanner, StagingCoordinator};
use crate::strategy::StrategySet;

/// Everything one run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub stats: ScanStats,
    pub stale_removed: usize,
    pub restored: usize,
    /// Scan or commit stopped by the operator
    pub interrupted: bool,
    pub preview: PreviewReport,
    /// `None` when nothing could be optimized
    pub commit: Option<CommitReport>,
}

pub struct Pipeline {
    scanner: Scanner,
    preview_limit: usize,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl Pipeline {
    pub fn new(scanner: Scanner, preview_limit: usize) -> Self {
        Self {
            scanner,
            preview_limit,
            stop_receiver: None,
        }
    }

    /// Pipeline with the real external tools
    pub fn from_config(config: &Config) -> Self {
        let coordinator = StagingCoordinator::new(StrategySet::from_config(config));
        let scanner = Scanner::new(coordinator, config.workers).with_progress(!config.json_output);
        Self::new(scanner, config.preview_limit)
    }

    /// Honor stop signals between scanned candidates and between committed entries
    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.scanner = self.scanner.with_cancellation(stop_receiver.resubscribe());
        self.stop_receiver = Some(stop_receiver);
        self
    }

    /// Scan `root`, let `decide` pick a mode from the preview, then commit.
    pub async fn run<F>(&mut self, root: &Path, decide: F) -> Result<RunOutcome>
    where
        F: FnOnce(&PreviewReport) -> Result<CommitMode>,
    {
        let scan = self.scanner.scan(root).await?;
        let preview = PreviewReport::from_ledger(&scan.ledger, self.preview_limit);

        let commit = if scan.ledger.is_empty() {
            info!("Nothing to commit");
            None
        } else if scan.interrupted {
            warn!("Scan interrupted, discarding {} staged files", scan.ledger.len());
            Some(CommitEngine::apply(&scan.ledger, CommitMode::Discard).await)
        } else {
            // a stop that arrived too late to cut the scan short must not cancel the commit
            if let Some(receiver) = self.stop_receiver.as_mut() {
                drain_stop_signals(receiver);
            }
            let mode = match decide(&preview) {
                Ok(mode) => mode,
                Err(e) => {
                    // staged copies must not outlive a failed decision
                    CommitEngine::apply(&scan.ledger, CommitMode::Discard).await;
                    return Err(e);
                }
            };
            Some(CommitEngine::apply_until(&scan.ledger, mode, self.stop_receiver.as_mut()).await)
        };

        let interrupted = scan.interrupted || commit.as_ref().is_some_and(|c| c.interrupted);
        Ok(RunOutcome {
            stats: scan.stats,
            stale_removed: scan.stale_removed,
            restored: scan.restored,
            interrupted,
            preview,
            commit,
        })
    }
}
