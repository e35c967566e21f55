//! # Asset Squeeze - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing` (su stderr)
//! - Caricamento e validazione della configurazione
//! - Gestione di Ctrl-C per fase (scan, decisione, commit)
//! - Decisione dell'operatore (prompt interattivo oppure `--mode`)
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI e carica l'eventuale file di configurazione
//! 2. Configura il logging (`RUST_LOG`, altrimenti INFO o DEBUG con `--verbose`)
//! 3. Verifica che la directory degli asset esista (unico errore fatale)
//! 4. Scan, anteprima, decisione, commit
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-squeeze                       # ./assets, prompt interattivo
//! asset-squeeze public/media --workers 8
//! asset-squeeze --mode replace-delete-old --yes --json
//! asset-squeeze --workers 8 --save-config squeeze.json
//! ```

use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use asset_squeeze::commit::{CommitMode, CommitReport};
use asset_squeeze::json_output::JsonMessage;
use asset_squeeze::pipeline::Pipeline;
use asset_squeeze::prompt::ask_operator;
use asset_squeeze::report::PreviewReport;
use asset_squeeze::strategy::report_available_tools;
use asset_squeeze::Config;

#[derive(Parser)]
#[command(name = "asset-squeeze")]
#[command(about = "Compress image and video assets in place, with a preview before anything is replaced")]
struct Args {
    /// Asset directory (default: ./assets)
    assets_dir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Commit mode, skips the interactive prompt
    #[arg(short, long, value_enum)]
    mode: Option<CommitMode>,

    /// Confirm `--mode replace-delete-old`
    #[arg(short, long)]
    yes: bool,

    /// Print preview and results as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Number of files listed in the preview
    #[arg(long)]
    preview_limit: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,
}

impl Args {
    /// Apply command line overrides on top of `config`
    fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = self.assets_dir.clone() {
            config.assets_dir = dir;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(limit) = self.preview_limit {
            config.preview_limit = limit;
        }
        config.json_output |= self.json;
    }
}

// Run phases, read by the Ctrl-C listener
const SCANNING: u8 = 0;
const DECIDING: u8 = 1;
const COMMITTING: u8 = 2;
const DONE: u8 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("asset_squeeze=debug,warn")
        } else {
            EnvFilter::new("asset_squeeze=info,warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if args.mode == Some(CommitMode::ReplaceDeleteOld) && !args.yes {
        return Err(anyhow::anyhow!("--mode replace-delete-old requires --yes"));
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    if let Some(path) = &args.save_config {
        config.save_to_file(path).await?;
        info!("Configuration saved to {}", path.display());
        return Ok(());
    }

    if config.json_output && args.mode.is_none() {
        return Err(anyhow::anyhow!("--json requires --mode"));
    }

    let root = config.resolve_assets_dir(&std::env::current_dir()?);
    if !root.is_dir() {
        let message = format!("❌ '{}' folder not found.", root.display());
        if config.json_output {
            JsonMessage::error(message.clone(), None).emit();
        }
        return Err(anyhow::anyhow!(message));
    }

    report_available_tools(&config).await;

    let (stop_sender, stop_receiver) = broadcast::channel(1);
    let phase = Arc::new(AtomicU8::new(SCANNING));
    spawn_interrupt_listener(stop_sender, Arc::clone(&phase));

    let mut pipeline = Pipeline::from_config(&config).with_cancellation(stop_receiver);
    let json = config.json_output;
    let fixed_mode = args.mode;

    let outcome = pipeline
        .run(&root, |preview| {
            phase.store(DECIDING, Ordering::SeqCst);
            let mode = decide(preview, fixed_mode, json)?;
            phase.store(COMMITTING, Ordering::SeqCst);
            Ok(mode)
        })
        .await;
    phase.store(DONE, Ordering::SeqCst);
    let outcome = outcome?;

    if json {
        JsonMessage::ScanComplete {
            root: root.clone(),
            stats: outcome.stats.clone(),
            stale_removed: outcome.stale_removed,
            restored: outcome.restored,
            interrupted: outcome.interrupted,
        }
        .emit();
    }

    match &outcome.commit {
        None if json => JsonMessage::NothingToDo.emit(),
        Some(report) if json => JsonMessage::commit_complete(report).emit(),
        commit => {
            if let Some(report) = commit {
                for failure in &report.failures {
                    error!("Error on {}: {}", failure.original.display(), failure.error);
                }
            }
            for line in closing_lines(outcome.interrupted, commit.as_ref()) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Ctrl-C handling by phase.
///
/// While scanning or committing the first press sends a stop, honored between
/// files. A second press while scanning quits, while committing it is ignored
/// so no swap is cut in half. While deciding, or once done, it quits at once.
fn spawn_interrupt_listener(stop_sender: broadcast::Sender<()>, phase: Arc<AtomicU8>) {
    tokio::spawn(async move {
        let mut stop_sent_in = None;
        while tokio::signal::ctrl_c().await.is_ok() {
            let current = phase.load(Ordering::SeqCst);
            match current {
                SCANNING | COMMITTING if stop_sent_in != Some(current) => {
                    warn!("⏹️ Interrupt received, finishing the files in progress");
                    stop_sent_in = Some(current);
                    let _ = stop_sender.send(());
                }
                COMMITTING => warn!("Commit in progress, stopping after the current file"),
                _ => std::process::exit(130),
            }
        }
    });
}

fn decide(preview: &PreviewReport, fixed_mode: Option<CommitMode>, json: bool) -> Result<CommitMode> {
    if json {
        JsonMessage::Preview {
            report: preview.clone(),
        }
        .emit();
    } else {
        println!("\n\n{}", preview.render());
    }

    match fixed_mode {
        Some(mode) => {
            info!("Using commit mode {}", mode);
            Ok(mode)
        }
        None => prompt_blocking(io::stdin().lock(), io::stdout()),
    }
}

/// Ask the operator without stalling the runtime worker we are called on
fn prompt_blocking<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<CommitMode> {
    tokio::task::block_in_place(|| -> Result<CommitMode> {
        let mode = ask_operator(&mut input, &mut output)?;
        output.flush()?;
        Ok(mode)
    })
}

/// Closing lines for the terminal
fn closing_lines(interrupted: bool, commit: Option<&CommitReport>) -> Vec<String> {
    let Some(report) = commit else {
        return vec![if interrupted {
            "\n⏹️ Scan interrupted before anything was staged. No file was changed.".to_string()
        } else {
            "\n✅ No files could be optimized further.".to_string()
        }];
    };

    let mut lines = Vec::new();
    if report.interrupted {
        lines.push(format!(
            "⏹️ Commit interrupted: {} files replaced, {} staged files discarded.",
            report.replaced, report.discarded
        ));
        return lines;
    }
    if interrupted {
        lines.push(format!(
            "⏹️ Scan interrupted: {} staged files discarded, no file was replaced.",
            report.discarded
        ));
        return lines;
    }
    if report.mode == CommitMode::Discard {
        lines.push("❌ Cancelled.".to_string());
    }
    lines.push(format!("✅ Operation complete. Processed {} files.", report.replaced));
    lines
}
