//! # Commit Engine
//!
//! Applica una `CommitMode` a ogni entry del ledger, in modo indipendente.
//!
//! ## Modalità:
//! - `Discard`: elimina la copia in staging, originale intatto
//! - `ReplaceKeepOld`: rimuove un eventuale backup precedente, rinomina
//!   l'originale in `<nome>_old.<ext>`, poi la copia in staging sull'originale
//! - `ReplaceDeleteOld`: la copia in staging sovrascrive l'originale con un
//!   singolo rename
//!
//! ## Fallimenti parziali:
//! Un errore su una entry viene registrato in `CommitReport::failures` e il
//! commit prosegue con le entry successive. Se il secondo rename di
//! `ReplaceKeepOld` fallisce, il backup viene rinominato di nuovo
//! sull'originale; l'errore dice se il ripristino è riuscito.
//!
//! ## Interruzione:
//! Con `apply_until` un segnale di stop viene controllato tra una entry e
//! l'altra, mai durante i rename. Le entry rimanenti vengono scartate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::CommitError;
use crate::file_manager::FileManager;
use crate::ledger::{ChangeLedger, StagedChange};
use crate::utils::stop_requested;

/// What to do with the staged copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Drop every staged copy
    Discard,
    /// Replace originals, keep them as `*_old`
    ReplaceKeepOld,
    /// Replace originals, keep no backup
    ReplaceDeleteOld,
}

impl CommitMode {
    pub fn replaces(&self) -> bool {
        !matches!(self, Self::Discard)
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Discard => "discard",
            Self::ReplaceKeepOld => "replace-keep-old",
            Self::ReplaceDeleteOld => "replace-delete-old",
        };
        f.write_str(label)
    }
}

/// Per-entry failure of a commit
#[derive(Debug)]
pub struct CommitFailure {
    pub original: PathBuf,
    pub error: CommitError,
}

/// Outcome of applying one mode to a ledger
#[derive(Debug)]
pub struct CommitReport {
    pub mode: CommitMode,
    /// Originals now holding the compressed bytes
    pub replaced: usize,
    /// Staged copies removed without touching the original
    pub discarded: usize,
    pub failures: Vec<CommitFailure>,
    /// Stopped by the operator, remaining entries were discarded
    pub interrupted: bool,
}

impl CommitReport {
    fn new(mode: CommitMode) -> Self {
        Self {
            mode,
            replaced: 0,
            discarded: 0,
            failures: Vec::new(),
            interrupted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct CommitEngine;

impl CommitEngine {
    /// Apply `mode` to every entry. Never stops early.
    pub async fn apply(ledger: &ChangeLedger, mode: CommitMode) -> CommitReport {
        Self::apply_until(ledger, mode, None).await
    }

    /// Apply `mode`, checking `stop` before each entry.
    ///
    /// Once a stop is seen, every remaining entry is discarded instead.
    pub async fn apply_until(
        ledger: &ChangeLedger,
        mode: CommitMode,
        mut stop: Option<&mut broadcast::Receiver<()>>,
    ) -> CommitReport {
        info!("⚡ Executing: {}...", mode);
        let mut report = CommitReport::new(mode);

        for change in ledger {
            if !report.interrupted && mode.replaces() && stop_requested(stop.as_deref_mut()) {
                warn!("⏹️ Interrupt received, discarding the remaining staged files");
                report.interrupted = true;
            }
            let entry_mode = if report.interrupted { CommitMode::Discard } else { mode };

            let result = match entry_mode {
                CommitMode::Discard => Self::discard(change).await,
                CommitMode::ReplaceKeepOld => Self::replace_keep_old(change).await,
                CommitMode::ReplaceDeleteOld => Self::replace_delete_old(change).await,
            };

            match result {
                Ok(()) if entry_mode.replaces() => report.replaced += 1,
                Ok(()) => report.discarded += 1,
                Err(error) => {
                    warn!("Error on {}: {}", change.display_name(), error);
                    report.failures.push(CommitFailure {
                        original: change.original_path().to_path_buf(),
                        error,
                    });
                }
            }
        }

        info!(
            "Commit finished: {} replaced, {} discarded, {} failed",
            report.replaced,
            report.discarded,
            report.failures.len()
        );
        report
    }

    async fn discard(change: &StagedChange) -> Result<(), CommitError> {
        let temp = change.temp_path();
        FileManager::remove_if_exists(temp)
            .await
            .map_err(|source| CommitError::DiscardTemp {
                temp: temp.to_path_buf(),
                source,
            })?;
        debug!("Discarded {}", temp.display());
        Ok(())
    }

    async fn replace_keep_old(change: &StagedChange) -> Result<(), CommitError> {
        let original = change.original_path();
        let temp = change.temp_path();
        let backup = FileManager::backup_path_for(original);

        ensure_temp(original, temp).await?;

        FileManager::remove_if_exists(&backup)
            .await
            .map_err(|source| CommitError::StaleBackup {
                backup: backup.clone(),
                source,
            })?;

        tokio::fs::rename(original, &backup)
            .await
            .map_err(|source| CommitError::BackupRename {
                original: original.to_path_buf(),
                backup: backup.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(temp, original).await {
            return Err(match tokio::fs::rename(&backup, original).await {
                Ok(()) => CommitError::SwapRolledBack {
                    original: original.to_path_buf(),
                    backup,
                    temp: temp.to_path_buf(),
                    source,
                },
                Err(rollback) => CommitError::SwapStranded {
                    original: original.to_path_buf(),
                    backup,
                    temp: temp.to_path_buf(),
                    source,
                    rollback,
                },
            });
        }

        debug!("Replaced {} (backup at {})", original.display(), backup.display());
        Ok(())
    }

    async fn replace_delete_old(change: &StagedChange) -> Result<(), CommitError> {
        let original = change.original_path();
        let temp = change.temp_path();

        ensure_temp(original, temp).await?;

        // rename over the original: either the old or the new bytes are there, never neither
        tokio::fs::rename(temp, original)
            .await
            .map_err(|source| CommitError::Overwrite {
                original: original.to_path_buf(),
                temp: temp.to_path_buf(),
                source,
            })?;

        debug!("Replaced {}", original.display());
        Ok(())
    }
}

async fn ensure_temp(original: &Path, temp: &Path) -> Result<(), CommitError> {
    match tokio::fs::try_exists(temp).await {
        Ok(true) => Ok(()),
        _ => Err(CommitError::MissingTemp {
            original: original.to_path_buf(),
            temp: temp.to_path_buf(),
        }),
    }
}
