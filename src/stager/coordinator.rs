//! # Staging Coordinator
//!
//! Macchina a stati per singolo candidato.
//!
//! ## Flusso:
//! 1. Classificazione per estensione, suffissi riservati → `Skipped`
//! 2. Path temporaneo deterministico accanto all'originale (eventuale residuo
//!    di un run precedente viene eliminato)
//! 3. Immagini: copia dell'originale nel path temporaneo; video: nessuna copia
//! 4. Dimensione originale misurata prima di qualsiasi strategia
//! 5. Strategia per tipo → pending se ha successo e il temporaneo esiste,
//!    altrimenti `Failed` (temporaneo eliminato)
//! 6. `0 < nuova < originale` → `Accepted`, altrimenti `RejectedNoGain`
//!    (temporaneo eliminato)
//! 7. Qualsiasi errore inatteso → `Abandoned`, temporaneo eliminato, lo scan continua

use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::CompressError;
use crate::file_manager::{FileManager, MediaCandidate, MediaKind};
use crate::ledger::StagedChange;
use crate::strategy::StrategySet;
use crate::utils::file_label;

/// Terminal state of one candidate
#[derive(Debug)]
pub enum StageOutcome {
    /// Not a media file, or a pipeline artifact
    Skipped { path: PathBuf },
    /// No strategy produced an output
    Failed { path: PathBuf },
    /// Output was empty or not smaller
    RejectedNoGain {
        path: PathBuf,
        old_size: u64,
        new_size: u64,
    },
    /// Ready for the ledger
    Accepted(StagedChange),
    /// Unexpected error, candidate dropped
    Abandoned { path: PathBuf, reason: String },
}

impl StageOutcome {
    pub fn into_change(self) -> Option<StagedChange> {
        match self {
            Self::Accepted(change) => Some(change),
            _ => None,
        }
    }
}

/// Runs the staging state machine for single candidates
#[derive(Clone)]
pub struct StagingCoordinator {
    strategies: StrategySet,
}

impl StagingCoordinator {
    pub fn new(strategies: StrategySet) -> Self {
        Self { strategies }
    }

    /// Stage one file. Never fails: every error becomes an outcome.
    pub async fn process(&self, path: &Path) -> StageOutcome {
        let Some(candidate) = MediaCandidate::classify(path) else {
            debug!("Skipping {}", path.display());
            return StageOutcome::Skipped {
                path: path.to_path_buf(),
            };
        };

        let temp_path = candidate.temp_path();

        match self.stage(&candidate, &temp_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ Error on {}: {}", file_label(&candidate.path), e);
                discard_temp(&temp_path).await;
                StageOutcome::Abandoned {
                    path: candidate.path,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn stage(&self, candidate: &MediaCandidate, temp_path: &Path) -> Result<StageOutcome, CompressError> {
        let original = &candidate.path;

        if FileManager::remove_if_exists(temp_path).await? {
            debug!("Removed stale staging copy {}", temp_path.display());
        }

        // image strategies work on the copy, the encoder writes the temp path itself
        if candidate.kind == MediaKind::Image {
            tokio::fs::copy(original, temp_path).await?;
        }

        let old_size = FileManager::size_of(original).await?;

        let strategy = self.strategies.for_kind(candidate.kind);
        let succeeded = strategy.attempt(original, temp_path).await;

        if !succeeded || !tokio::fs::try_exists(temp_path).await? {
            debug!("{} produced no output for {}", strategy.name(), file_label(original));
            discard_temp(temp_path).await;
            return Ok(StageOutcome::Failed {
                path: original.clone(),
            });
        }

        let new_size = FileManager::size_of(temp_path).await?;

        match StagedChange::new(original.clone(), temp_path.to_path_buf(), old_size, new_size, candidate.kind) {
            Ok(change) => {
                debug!(
                    "Staged {}: {} -> {} bytes",
                    change.display_name(),
                    old_size,
                    new_size
                );
                Ok(StageOutcome::Accepted(change))
            }
            Err(no_gain) => {
                debug!("Rejecting {}: {}", file_label(original), no_gain);
                discard_temp(temp_path).await;
                Ok(StageOutcome::RejectedNoGain {
                    path: original.clone(),
                    old_size,
                    new_size,
                })
            }
        }
    }
}

async fn discard_temp(temp_path: &Path) {
    if let Err(e) = FileManager::remove_if_exists(temp_path).await {
        warn!("Could not remove staging copy {}: {}", temp_path.display(), e);
    }
}
