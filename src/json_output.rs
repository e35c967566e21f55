//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (`--json`).
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout
//! - I log restano su stderr, quindi stdout è sempre parsabile
//!
//! ## Tipi di messaggi:
//! - `scan_complete`: statistiche dello scan
//! - `preview`: anteprima del ledger
//! - `nothing_to_do`: nessun file ulteriormente ottimizzabile
//! - `commit_complete`: esito del commit, con gli errori per file
//! - `error`: errore fatale

use serde::Serialize;
use std::path::PathBuf;

use crate::commit::{CommitMode, CommitReport};
use crate::progress::ScanStats;
use crate::report::PreviewReport;

/// JSON message type
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "scan_complete")]
    ScanComplete {
        root: PathBuf,
        stats: ScanStats,
        stale_removed: usize,
        restored: usize,
        interrupted: bool,
    },

    #[serde(rename = "preview")]
    Preview { report: PreviewReport },

    #[serde(rename = "nothing_to_do")]
    NothingToDo,

    #[serde(rename = "commit_complete")]
    CommitComplete {
        mode: CommitMode,
        replaced: usize,
        discarded: usize,
        failures: Vec<JsonFailure>,
        interrupted: bool,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Commit failure for one file
#[derive(Debug, Serialize)]
pub struct JsonFailure {
    pub path: PathBuf,
    pub error: String,
}

impl JsonMessage {
    /// Emit the message on stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn commit_complete(report: &CommitReport) -> Self {
        Self::CommitComplete {
            mode: report.mode,
            replaced: report.replaced,
            discarded: report.discarded,
            failures: report
                .failures
                .iter()
                .map(|f| JsonFailure {
                    path: f.original.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
            interrupted: report.interrupted,
        }
    }

    pub fn error(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            details,
        }
    }
}
