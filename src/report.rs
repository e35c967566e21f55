//! # Preview Report
//!
//! Riepilogo del ledger mostrato all'operatore prima della decisione.
//!
//! ## Formato console:
//! ```text
//! ==================================================
//!        OPTIMIZATION PREVIEW (7 files)
//! ==================================================
//! Filename                       | Type  | Saving
//! --------------------------------------------------
//! banner.jpg                     | IMAGE | -4.00 MB
//! ... and 2 more.
//! --------------------------------------------------
//! TOTAL Old Size:    10.00 MB
//! TOTAL New Size:    6.00 MB
//! TOTAL SAVED:       4.00 MB (40.00%)
//! ==================================================
//! ```

use serde::Serialize;
use std::fmt::Write as _;

use crate::file_manager::MediaKind;
use crate::ledger::{ChangeLedger, LedgerSummary};
use crate::utils::truncate_chars;

const NAME_WIDTH: usize = 29;
const RULE_WIDTH: usize = 50;

/// Bytes as megabytes (2^20) with two decimals
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1u64 << 20) as f64)
}

/// One shown ledger entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub name: String,
    pub kind: MediaKind,
    pub old_size: u64,
    pub new_size: u64,
    pub saved: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewReport {
    pub rows: Vec<PreviewRow>,
    /// Entries not listed in `rows`
    pub hidden: usize,
    pub summary: LedgerSummary,
}

impl PreviewReport {
    /// Build a preview listing at most `limit` entries
    pub fn from_ledger(ledger: &ChangeLedger, limit: usize) -> Self {
        let rows: Vec<PreviewRow> = ledger
            .iter()
            .take(limit)
            .map(|change| PreviewRow {
                name: truncate_chars(change.display_name(), NAME_WIDTH),
                kind: change.kind(),
                old_size: change.old_size(),
                new_size: change.new_size(),
                saved: change.saved_bytes(),
            })
            .collect();

        Self {
            hidden: ledger.len().saturating_sub(rows.len()),
            rows,
            summary: ledger.summary(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.count == 0
    }

    /// Console table
    pub fn render(&self) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, "       OPTIMIZATION PREVIEW ({} files)", self.summary.count);
        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, "{:<30} | {:<5} | Saving", "Filename", "Type");
        let _ = writeln!(out, "{}", light);

        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<30} | {:<5} | -{}",
                row.name,
                row.kind.label(),
                format_mb(row.saved)
            );
        }
        if self.hidden > 0 {
            let _ = writeln!(out, "... and {} more.", self.hidden);
        }

        let _ = writeln!(out, "{}", light);
        let _ = writeln!(out, "TOTAL Old Size:    {}", format_mb(self.summary.total_old));
        let _ = writeln!(out, "TOTAL New Size:    {}", format_mb(self.summary.total_new));
        match self.summary.percent_saved {
            Some(percent) => {
                let _ = writeln!(
                    out,
                    "TOTAL SAVED:       {} ({:.2}%)",
                    format_mb(self.summary.total_saved),
                    percent
                );
            }
            None => {
                let _ = writeln!(out, "TOTAL SAVED:       {}", format_mb(self.summary.total_saved));
            }
        }
        let _ = write!(out, "{}", heavy);

        out
    }
}
