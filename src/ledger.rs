//! # Change Ledger Module
//!
//! Registro ordinato delle modifiche accettate durante lo scan.
//!
//! ## Responsabilità:
//! - `StagedChange`: una copia compressa in attesa di commit
//! - `ChangeLedger`: sequenza append-only, ordine di inserimento = ordine di scan
//! - `LedgerSummary`: aggregati per l'anteprima (totali e percentuale)
//!
//! ## Invarianti:
//! - Ogni entry soddisfa `0 < new_size < old_size`, verificato alla costruzione
//! - Nessuna entry viene modificata dopo l'inserimento
//! - Ogni `temp_path` appartiene a una sola entry

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::NoGain;
use crate::file_manager::MediaKind;

/// An accepted compression attempt awaiting the commit decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedChange {
    original_path: PathBuf,
    temp_path: PathBuf,
    old_size: u64,
    new_size: u64,
    kind: MediaKind,
    display_name: String,
}

impl StagedChange {
    /// Build a change, refusing it unless the staged copy is non-empty and
    /// strictly smaller than the original.
    pub fn new(
        original_path: PathBuf,
        temp_path: PathBuf,
        old_size: u64,
        new_size: u64,
        kind: MediaKind,
    ) -> Result<Self, NoGain> {
        if new_size == 0 || new_size >= old_size {
            return Err(NoGain { old_size, new_size });
        }

        let display_name = original_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self {
            original_path,
            temp_path,
            old_size,
            new_size,
            kind,
            display_name,
        })
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn old_size(&self) -> u64 {
        self.old_size
    }

    pub fn new_size(&self) -> u64 {
        self.new_size
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn saved_bytes(&self) -> u64 {
        self.old_size - self.new_size
    }
}

/// Aggregate view of a ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub count: usize,
    pub total_old: u64,
    pub total_new: u64,
    pub total_saved: u64,
    /// `None` for an empty ledger
    pub percent_saved: Option<f64>,
}

/// Ordered record of accepted staged changes
#[derive(Debug, Default)]
pub struct ChangeLedger {
    entries: Vec<StagedChange>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, change: StagedChange) {
        self.entries.push(change);
    }

    pub fn entries(&self) -> &[StagedChange] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StagedChange> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_old(&self) -> u64 {
        self.entries.iter().map(|c| c.old_size).sum()
    }

    pub fn total_new(&self) -> u64 {
        self.entries.iter().map(|c| c.new_size).sum()
    }

    /// `(old - new) / old * 100`, undefined for an empty ledger
    pub fn percent_saved(&self) -> Option<f64> {
        let total_old = self.total_old();
        if total_old == 0 {
            return None;
        }
        let saved = total_old - self.total_new();
        Some(saved as f64 / total_old as f64 * 100.0)
    }

    pub fn summary(&self) -> LedgerSummary {
        let total_old = self.total_old();
        let total_new = self.total_new();
        LedgerSummary {
            count: self.len(),
            total_old,
            total_new,
            total_saved: total_old - total_new,
            percent_saved: self.percent_saved(),
        }
    }
}

impl<'a> IntoIterator for &'a ChangeLedger {
    type Item = &'a StagedChange;
    type IntoIter = std::slice::Iter<'a, StagedChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
