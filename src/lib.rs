//! # Asset Squeeze Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test di integrazione
//!
//! ## Architettura dei moduli:
//! - `config`: Policy di compressione fissa e configurazione operativa
//! - `error`: Tipi di errore custom (staging, commit, size gate)
//! - `file_manager`: Classificazione, naming riservato, discovery, misure
//! - `strategy`: Strategie di compressione (encoder video, catena immagini)
//! - `stager`: Staging per candidato e pool di worker
//! - `ledger`: Modifiche accettate in attesa di commit
//! - `commit`: Applicazione della modalità scelta
//! - `report` / `json_output`: Anteprima console e JSON
//! - `prompt`: Decisione interattiva dell'operatore
//! - `pipeline`: Orchestratore scan → decisione → commit
//! - `progress`: Progress bar e statistiche dello scan
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use asset_squeeze::{CommitMode, Config, Pipeline};
//!
//! let config = Config::default();
//! let mut pipeline = Pipeline::from_config(&config);
//! let outcome = pipeline.run(&root, |_preview| Ok(CommitMode::ReplaceKeepOld)).await?;
//! ```

pub mod commit;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod ledger;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod stager;
pub mod strategy;
pub mod utils;

pub use commit::{CommitEngine, CommitMode, CommitReport};
pub use config::Config;
pub use error::{CommitError, CompressError, NoGain};
pub use ledger::{ChangeLedger, StagedChange};
pub use pipeline::{Pipeline, RunOutcome};
pub use report::PreviewReport;
