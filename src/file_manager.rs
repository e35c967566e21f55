//! # File Management Module
//!
//! Questo modulo gestisce la classificazione dei file, le convenzioni di naming
//! e la discovery dei candidati.
//!
//! ## Responsabilità:
//! - Classificazione immagine / video per estensione (case-insensitive)
//! - Esclusione dei file generati dalla pipeline (suffissi `_temp` e `_old`)
//! - Calcolo deterministico dei path temporanei e di backup
//! - Misura delle dimensioni (l'unità su cui si basano tutte le decisioni)
//! - Discovery ricorsiva con `walkdir`
//! - Pulizia dei file temporanei rimasti da run interrotti, con ripristino
//!   dell'originale quando uno swap è stato interrotto a metà
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG, WebP
//! - **Video**: MP4, MOV, MKV, AVI
//!
//! ## Naming:
//! ```text
//! assets/hero/banner.JPG        originale
//! assets/hero/banner_temp.JPG   copia in staging
//! assets/hero/banner_old.JPG    backup dopo il commit
//! ```

use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi"];

/// Marks an in-flight staging copy
pub const TEMP_SUFFIX: &str = "_temp";
/// Marks the original kept after a replace-and-keep commit
pub const BACKUP_SUFFIX: &str = "_old";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Kind for a lowercase or mixed-case extension, without the dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file eligible for compression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaCandidate {
    /// Classify a path. `None` for unsupported extensions and pipeline artifacts.
    pub fn classify(path: &Path) -> Option<Self> {
        let kind = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaKind::from_extension)?;

        let stem = path.file_stem()?.to_string_lossy();
        if FileManager::is_reserved_stem(&stem) {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            kind,
        })
    }

    pub fn temp_path(&self) -> PathBuf {
        FileManager::temp_path_for(&self.path)
    }

    pub fn backup_path(&self) -> PathBuf {
        FileManager::backup_path_for(&self.path)
    }
}

/// What `FileManager::sweep_stale_temps` cleaned up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Staging copies deleted next to an intact original
    pub removed: usize,
    /// Originals renamed back from their backup
    pub restored: usize,
}

/// Manages naming conventions, sizes and discovery
pub struct FileManager;

impl FileManager {
    /// Size in bytes of `path`; fails if it does not exist or cannot be read
    pub async fn size_of(path: &Path) -> std::io::Result<u64> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(metadata.len())
    }

    pub fn is_reserved_stem(stem: &str) -> bool {
        stem.ends_with(TEMP_SUFFIX) || stem.ends_with(BACKUP_SUFFIX)
    }

    /// Insert `suffix` between the file stem and its extension.
    ///
    /// The extension keeps its original case: `a/Photo.JPG` becomes `a/Photo_temp.JPG`.
    pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = match path.extension() {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, suffix),
        };
        path.with_file_name(file_name)
    }

    pub fn temp_path_for(original: &Path) -> PathBuf {
        Self::with_suffix(original, TEMP_SUFFIX)
    }

    pub fn backup_path_for(original: &Path) -> PathBuf {
        Self::with_suffix(original, BACKUP_SUFFIX)
    }

    /// Original path a staging copy was derived from, if `path` is one
    pub fn original_for_temp(path: &Path) -> Option<PathBuf> {
        let ext = path.extension()?.to_string_lossy();
        MediaKind::from_extension(&ext)?;

        let stem = path.file_stem()?.to_string_lossy();
        let original_stem = stem.strip_suffix(TEMP_SUFFIX)?;
        if original_stem.is_empty() {
            return None;
        }

        Some(path.with_file_name(format!("{}.{}", original_stem, ext)))
    }

    /// Find all candidates under `root`, in a stable (name-sorted) order.
    ///
    /// Pipeline artifacts are excluded, so repeated runs never stage a backup
    /// or a staging copy.
    pub fn find_candidates(root: &Path) -> Result<Vec<MediaCandidate>> {
        let mut candidates = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(candidate) = MediaCandidate::classify(entry.path()) {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }

    /// Clean up after an interrupted run.
    ///
    /// A staging copy whose original exists is deleted. A staging copy whose
    /// original is missing but whose backup exists marks a swap cut short:
    /// the backup is renamed back onto the original and the copy deleted.
    /// Any other staging copy is left alone.
    pub async fn sweep_stale_temps(root: &Path) -> Result<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        let temps: Vec<(PathBuf, PathBuf)> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let original = Self::original_for_temp(e.path())?;
                Some((e.into_path(), original))
            })
            .collect();

        for (temp, original) in temps {
            if original.is_file() {
                match tokio::fs::remove_file(&temp).await {
                    Ok(()) => {
                        debug!("Removed stale staging copy: {}", temp.display());
                        outcome.removed += 1;
                    }
                    Err(e) => warn!("Could not remove stale staging copy {}: {}", temp.display(), e),
                }
                continue;
            }

            let backup = Self::backup_path_for(&original);
            if !backup.is_file() {
                continue;
            }
            if let Err(e) = tokio::fs::rename(&backup, &original).await {
                warn!(
                    "Could not restore {} from {}: {}",
                    original.display(),
                    backup.display(),
                    e
                );
                continue;
            }
            warn!(
                "♻️ Restored {} from {} (interrupted replace)",
                original.display(),
                backup.display()
            );
            outcome.restored += 1;
            if let Err(e) = Self::remove_if_exists(&temp).await {
                warn!("Could not remove stale staging copy {}: {}", temp.display(), e);
            }
        }

        Ok(outcome)
    }

    /// Remove `path` if present. Returns whether a file was deleted.
    pub async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classification() {
        let c = MediaCandidate::classify(Path::new("assets/photo.JPG")).unwrap();
        assert_eq!(c.kind, MediaKind::Image);

        let c = MediaCandidate::classify(Path::new("assets/clip.Mov")).unwrap();
        assert_eq!(c.kind, MediaKind::Video);

        assert!(MediaCandidate::classify(Path::new("assets/notes.txt")).is_none());
        assert!(MediaCandidate::classify(Path::new("assets/README")).is_none());
        assert!(MediaCandidate::classify(Path::new("assets/anim.gif")).is_none());
    }

    #[test]
    fn test_reserved_suffixes_are_excluded() {
        assert!(MediaCandidate::classify(Path::new("assets/photo_old.jpg")).is_none());
        assert!(MediaCandidate::classify(Path::new("assets/photo_temp.jpg")).is_none());
        assert!(MediaCandidate::classify(Path::new("assets/clip_old.mp4")).is_none());
        // suffix must end the stem
        assert!(MediaCandidate::classify(Path::new("assets/old_photo.jpg")).is_some());
        assert!(MediaCandidate::classify(Path::new("assets/photo_older.jpg")).is_some());
    }

    #[test]
    fn test_suffixed_paths() {
        let original = Path::new("assets/hero/Banner.JPG");
        assert_eq!(
            FileManager::temp_path_for(original),
            PathBuf::from("assets/hero/Banner_temp.JPG")
        );
        assert_eq!(
            FileManager::backup_path_for(original),
            PathBuf::from("assets/hero/Banner_old.JPG")
        );
        assert_eq!(
            FileManager::with_suffix(Path::new("a/archive.tar.mp4"), "_temp"),
            PathBuf::from("a/archive.tar_temp.mp4")
        );
    }

    #[test]
    fn test_original_for_temp() {
        assert_eq!(
            FileManager::original_for_temp(Path::new("a/pic_temp.png")),
            Some(PathBuf::from("a/pic.png"))
        );
        assert_eq!(FileManager::original_for_temp(Path::new("a/pic.png")), None);
        assert_eq!(FileManager::original_for_temp(Path::new("a/_temp.png")), None);
        assert_eq!(FileManager::original_for_temp(Path::new("a/doc_temp.txt")), None);
    }

    #[test]
    fn test_find_candidates() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("gallery");
        std::fs::create_dir_all(&nested).unwrap();

        for name in ["b.png", "a.jpg", "a_old.jpg", "a_temp.jpg", "notes.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(nested.join("clip.MP4"), b"x").unwrap();

        let found = FileManager::find_candidates(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.jpg", "b.png", "clip.MP4"]);
        assert_eq!(found[2].kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_sweep_stale_temps() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("a.jpg"), b"original").unwrap();
        std::fs::write(root.join("a_temp.jpg"), b"stale").unwrap();
        // no original next to it: left alone
        std::fs::write(root.join("orphan_temp.jpg"), b"keep").unwrap();

        let outcome = FileManager::sweep_stale_temps(root).await.unwrap();

        assert_eq!(outcome, SweepOutcome { removed: 1, restored: 0 });
        assert!(!root.join("a_temp.jpg").exists());
        assert!(root.join("orphan_temp.jpg").exists());
        assert_eq!(std::fs::read(root.join("a.jpg")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_sweep_restores_original_from_backup() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        // swap cut between the two renames: backup and copy, no original
        std::fs::write(root.join("a_old.jpg"), b"original").unwrap();
        std::fs::write(root.join("a_temp.jpg"), b"smaller").unwrap();

        let outcome = FileManager::sweep_stale_temps(root).await.unwrap();

        assert_eq!(outcome, SweepOutcome { removed: 0, restored: 1 });
        assert_eq!(std::fs::read(root.join("a.jpg")).unwrap(), b"original");
        assert!(!root.join("a_old.jpg").exists());
        assert!(!root.join("a_temp.jpg").exists());
    }

    #[tokio::test]
    async fn test_size_of() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        assert_eq!(FileManager::size_of(&path).await.unwrap(), 1234);
        assert!(FileManager::size_of(&dir.path().join("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"x").unwrap();

        assert!(FileManager::remove_if_exists(&path).await.unwrap());
        assert!(!FileManager::remove_if_exists(&path).await.unwrap());
    }
}
