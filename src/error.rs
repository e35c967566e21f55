//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - `CompressError`: errori durante scan e staging (I/O, decode immagini, task)
//! - `CommitError`: errori di commit per singola entry del ledger, con lo stato
//!   parziale esatto in cui è rimasto l'asset
//! - `NoGain`: esito del controllo dimensione, non è un vero errore
//!
//! ## Categorie:
//! - `Io`: file mancanti, permessi, rename falliti
//! - `Image` / `PngEncoding`: decode o encode fallito nel fallback in-process
//! - `MissingRoot`: directory degli asset assente, unico errore fatale del run
//! - `Validation`: configurazione non valida
//! - `Join`: un worker è andato in panic
//!
//! ## Esempio:
//! ```rust,ignore
//! if !root.is_dir() {
//!     return Err(CompressError::MissingRoot(root.to_path_buf()).into());
//! }
//! ```

use std::path::PathBuf;

/// Errors raised while scanning and staging candidates
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),

    #[error("Asset directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("Configuration error: {0}")]
    Validation(String),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The staged output is not strictly smaller than the original, or is empty.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no size gain ({old_size} -> {new_size} bytes)")]
pub struct NoGain {
    pub old_size: u64,
    pub new_size: u64,
}

/// Failure while applying a commit mode to one ledger entry.
///
/// Every variant states which steps of the rename sequence already happened,
/// so the operator knows where the original and the compressed bytes are.
#[derive(thiserror::Error, Debug)]
pub enum CommitError {
    #[error("could not remove staged copy {}: {source}", temp.display())]
    DiscardTemp {
        temp: PathBuf,
        source: std::io::Error,
    },

    #[error("could not remove previous backup {}: {source}; nothing was changed", backup.display())]
    StaleBackup {
        backup: PathBuf,
        source: std::io::Error,
    },

    #[error("could not move {} to {}: {source}; nothing was changed", original.display(), backup.display())]
    BackupRename {
        original: PathBuf,
        backup: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "original was moved to {} but {} could not replace it: {source}; original restored, compressed copy left at {}",
        backup.display(), temp.display(), temp.display()
    )]
    SwapRolledBack {
        original: PathBuf,
        backup: PathBuf,
        temp: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "original was moved to {} but {} could not replace it: {source}; restoring the original also failed ({rollback}). Original bytes are at {}, compressed copy at {}",
        backup.display(), temp.display(), backup.display(), temp.display()
    )]
    SwapStranded {
        original: PathBuf,
        backup: PathBuf,
        temp: PathBuf,
        source: std::io::Error,
        rollback: std::io::Error,
    },

    #[error("could not move {} over {}: {source}; original untouched, compressed copy left at {}", temp.display(), original.display(), temp.display())]
    Overwrite {
        original: PathBuf,
        temp: PathBuf,
        source: std::io::Error,
    },

    #[error("staged copy {} is missing; original {} untouched", temp.display(), original.display())]
    MissingTemp { original: PathBuf, temp: PathBuf },
}
