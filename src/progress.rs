//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar dello scan e i contatori degli esiti.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif` (nascosta in modalità JSON)
//! - `ScanStats`: conteggio degli esiti per candidato
//!
//! ## Esiti tracciati:
//! - **accepted**: copia compressa entrata nel ledger
//! - **rejected_no_gain**: output vuoto o non più piccolo, scartato
//! - **failed**: nessuna strategia ha prodotto output
//! - **abandoned**: errore inatteso, candidato abbandonato
//! - **skipped**: non classificabile come media
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [========================>---------------] 61/100 (61%) ✅ banner.jpg: 38.2% smaller
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::stager::StageOutcome;
use crate::utils::file_label;

/// Manages the progress bar shown while staging
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (JSON mode, tests)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Advance by one candidate and describe its outcome
    pub fn record(&self, outcome: &StageOutcome) {
        self.bar.inc(1);
        self.bar.set_message(describe(outcome));
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

fn describe(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Accepted(change) => {
            let percent = change.saved_bytes() as f64 / change.old_size() as f64 * 100.0;
            format!("✅ {}: {:.1}% smaller", change.display_name(), percent)
        }
        StageOutcome::RejectedNoGain { path, .. } => format!("➖ {}: no gain", file_label(path)),
        StageOutcome::Failed { path } => format!("⚠️ {}: compression failed", file_label(path)),
        StageOutcome::Abandoned { path, .. } => format!("❌ {}: error", file_label(path)),
        StageOutcome::Skipped { path } => format!("⏩ {}: skipped", file_label(path)),
    }
}

/// Outcome counters for one scan
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanStats {
    pub candidates: usize,
    pub accepted: usize,
    pub rejected_no_gain: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub skipped: usize,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &StageOutcome) {
        self.candidates += 1;
        match outcome {
            StageOutcome::Accepted(_) => self.accepted += 1,
            StageOutcome::RejectedNoGain { .. } => self.rejected_no_gain += 1,
            StageOutcome::Failed { .. } => self.failed += 1,
            StageOutcome::Abandoned { .. } => self.abandoned += 1,
            StageOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Analyzed: {} files | Smaller: {} | No gain: {} | Failed: {} | Errors: {}",
            self.candidates, self.accepted, self.rejected_no_gain, self.failed, self.abandoned
        )
    }
}
