use asset_squeeze::stager::{Scanner, StagingCoordinator};
use asset_squeeze::strategy::{CompressionStrategy, StrategySet};
use asset_squeeze::{CommitMode, Pipeline};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Writes `ratio` of the source size to the destination
struct Shrink {
    ratio: f64,
    calls: Arc<AtomicUsize>,
}

impl CompressionStrategy for Shrink {
    fn name(&self) -> &'static str {
        "shrink"
    }

    fn attempt<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, bool> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Ok(bytes) = tokio::fs::read(source).await else {
                return false;
            };
            let len = (bytes.len() as f64 * self.ratio) as usize;
            tokio::fs::write(destination, vec![b'z'; len]).await.is_ok()
        }
        .boxed()
    }
}

struct Fixture {
    dir: TempDir,
    calls: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("assets/hero")).unwrap();
        Self {
            dir,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("assets")
    }

    fn write(&self, rel: &str, bytes: usize) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::write(&path, vec![b'a'; bytes]).unwrap();
        path
    }

    fn pipeline(&self, image_ratio: f64, video_ratio: f64) -> Pipeline {
        let strategies = StrategySet::new(
            Arc::new(Shrink {
                ratio: image_ratio,
                calls: Arc::clone(&self.calls),
            }),
            Arc::new(Shrink {
                ratio: video_ratio,
                calls: Arc::clone(&self.calls),
            }),
        );
        let scanner = Scanner::new(StagingCoordinator::new(strategies), 3).with_progress(false);
        Pipeline::new(scanner, 5)
    }

    /// Every file under the root, relative and sorted
    fn listing(&self) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(self.root())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(self.root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        names.sort();
        names
    }
}

fn size(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

#[tokio::test]
async fn replace_keep_old_swaps_and_backs_up() {
    let fx = Fixture::new();
    let banner = fx.write("hero/banner.jpg", 1000);
    let clip = fx.write("intro.mp4", 4000);
    fx.write("notes.txt", 50);

    let outcome = fx
        .pipeline(0.6, 0.5)
        .run(&fx.root(), |preview| {
            assert_eq!(preview.summary.count, 2);
            assert_eq!(preview.summary.total_old, 5000);
            assert_eq!(preview.summary.total_new, 2600);
            Ok(CommitMode::ReplaceKeepOld)
        })
        .await
        .unwrap();

    let commit = outcome.commit.unwrap();
    assert_eq!(commit.replaced, 2);
    assert!(commit.is_clean());
    assert_eq!(size(&banner), 600);
    assert_eq!(size(&clip), 2000);
    assert_eq!(
        fx.listing(),
        vec!["hero/banner.jpg", "hero/banner_old.jpg", "intro.mp4", "intro_old.mp4", "notes.txt"]
    );
}

#[tokio::test]
async fn second_run_ignores_backups() {
    let fx = Fixture::new();
    fx.write("hero/banner.jpg", 1000);

    fx.pipeline(0.5, 0.5)
        .run(&fx.root(), |_| Ok(CommitMode::ReplaceKeepOld))
        .await
        .unwrap();
    let calls_after_first = fx.calls.load(Ordering::SeqCst);

    // identity strategy: the already compressed file cannot shrink further
    let outcome = fx
        .pipeline(1.0, 1.0)
        .run(&fx.root(), |_| panic!("nothing should be offered"))
        .await
        .unwrap();

    assert!(outcome.commit.is_none());
    assert_eq!(outcome.stats.candidates, 1);
    assert_eq!(fx.calls.load(Ordering::SeqCst), calls_after_first + 1);
    assert_eq!(fx.listing(), vec!["hero/banner.jpg", "hero/banner_old.jpg"]);
    assert_eq!(size(&fx.root().join("hero/banner_old.jpg")), 1000);
}

#[tokio::test]
async fn replace_delete_old_keeps_no_backup() {
    let fx = Fixture::new();
    let banner = fx.write("hero/banner.png", 800);

    let outcome = fx
        .pipeline(0.25, 0.5)
        .run(&fx.root(), |_| Ok(CommitMode::ReplaceDeleteOld))
        .await
        .unwrap();

    assert_eq!(outcome.commit.unwrap().replaced, 1);
    assert_eq!(size(&banner), 200);
    assert_eq!(fx.listing(), vec!["hero/banner.png"]);
}

#[tokio::test]
async fn discard_restores_pre_scan_state() {
    let fx = Fixture::new();
    let banner = fx.write("hero/banner.webp", 900);
    let clip = fx.write("intro.mov", 3000);
    let before = fx.listing();

    let outcome = fx
        .pipeline(0.5, 0.5)
        .run(&fx.root(), |_| Ok(CommitMode::Discard))
        .await
        .unwrap();

    let commit = outcome.commit.unwrap();
    assert_eq!(commit.replaced, 0);
    assert_eq!(commit.discarded, 2);
    assert_eq!(std::fs::read(&banner).unwrap(), vec![b'a'; 900]);
    assert_eq!(std::fs::read(&clip).unwrap(), vec![b'a'; 3000]);
    assert_eq!(fx.listing(), before);
}

#[tokio::test]
async fn size_gate_rejects_growth() {
    let fx = Fixture::new();
    let banner = fx.write("hero/banner.jpg", 500);

    let outcome = fx
        .pipeline(1.5, 1.5)
        .run(&fx.root(), |_| panic!("nothing should be offered"))
        .await
        .unwrap();

    assert!(outcome.commit.is_none());
    assert!(outcome.preview.is_empty());
    assert_eq!(outcome.stats.rejected_no_gain, 1);
    assert_eq!(std::fs::read(&banner).unwrap(), vec![b'a'; 500]);
    assert_eq!(fx.listing(), vec!["hero/banner.jpg"]);
}

#[tokio::test]
async fn stale_temp_from_crash_is_recovered() {
    let fx = Fixture::new();
    let banner = fx.write("hero/banner.jpg", 1000);
    std::fs::write(fx.root().join("hero/banner_temp.jpg"), b"truncated encode").unwrap();

    let outcome = fx
        .pipeline(0.5, 0.5)
        .run(&fx.root(), |preview| {
            assert_eq!(preview.rows.len(), 1);
            assert_eq!(preview.rows[0].old_size, 1000);
            Ok(CommitMode::Discard)
        })
        .await
        .unwrap();

    assert_eq!(outcome.stale_removed, 1);
    assert_eq!(std::fs::read(&banner).unwrap(), vec![b'a'; 1000]);
    assert_eq!(fx.listing(), vec!["hero/banner.jpg"]);
}

#[tokio::test]
async fn interrupted_swap_is_restored_then_processed() {
    let fx = Fixture::new();
    // a replace cut between its two renames: backup and copy, no original
    std::fs::write(fx.root().join("hero/banner_old.jpg"), vec![b'a'; 1000]).unwrap();
    std::fs::write(fx.root().join("hero/banner_temp.jpg"), vec![b'z'; 500]).unwrap();
    // no original and no backup: not ours to touch
    fx.write("hero/orphan_temp.png", 300);

    let outcome = fx
        .pipeline(0.5, 0.5)
        .run(&fx.root(), |preview| {
            assert_eq!(preview.rows.len(), 1);
            assert_eq!(preview.rows[0].old_size, 1000);
            Ok(CommitMode::Discard)
        })
        .await
        .unwrap();

    assert_eq!(outcome.restored, 1);
    assert_eq!(outcome.stale_removed, 0);
    assert_eq!(std::fs::read(fx.root().join("hero/banner.jpg")).unwrap(), vec![b'a'; 1000]);
    assert_eq!(fx.listing(), vec!["hero/banner.jpg", "hero/orphan_temp.png"]);
}

#[tokio::test]
async fn stop_during_commit_discards_the_rest() {
    let fx = Fixture::new();
    let banner = fx.write("hero/banner.jpg", 1000);
    let clip = fx.write("intro.mp4", 4000);
    let (stop_sender, stop_receiver) = broadcast::channel(1);

    let outcome = fx
        .pipeline(0.5, 0.5)
        .with_cancellation(stop_receiver)
        .run(&fx.root(), |_| {
            // operator presses Ctrl-C right after choosing
            stop_sender.send(()).unwrap();
            Ok(CommitMode::ReplaceKeepOld)
        })
        .await
        .unwrap();

    let commit = outcome.commit.unwrap();
    assert!(outcome.interrupted);
    assert!(commit.interrupted);
    assert_eq!(commit.replaced, 0);
    assert_eq!(commit.discarded, 2);
    assert_eq!(size(&banner), 1000);
    assert_eq!(size(&clip), 4000);
    assert_eq!(fx.listing(), vec!["hero/banner.jpg", "intro.mp4"]);
}

#[tokio::test]
async fn reserved_names_are_never_staged() {
    let fx = Fixture::new();
    fx.write("hero/photo_old.jpg", 1000);
    fx.write("hero/orphan_temp.png", 1000);

    let outcome = fx
        .pipeline(0.5, 0.5)
        .run(&fx.root(), |_| panic!("nothing should be offered"))
        .await
        .unwrap();

    assert_eq!(outcome.stats.candidates, 0);
    assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fx.listing(), vec!["hero/orphan_temp.png", "hero/photo_old.jpg"]);
}

#[tokio::test]
async fn missing_root_aborts_before_scanning() {
    let fx = Fixture::new();
    let result = fx
        .pipeline(0.5, 0.5)
        .run(&fx.dir.path().join("nope"), |_| Ok(CommitMode::Discard))
        .await;
    assert!(result.is_err());
}
