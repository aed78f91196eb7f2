use chrono::{Local, Months, NaiveDate};
use snapsafe::metadata::MetadataSource;
use snapsafe::model::{DeletionCandidate, OutcomeKind};
use snapsafe::{executor, AppConfig, Error, RunEngine, SilentReporter};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

/// Metadata source backed by a fixed map, standing in for exiftool.
struct FixedDates(HashMap<PathBuf, String>);

impl FixedDates {
    fn empty() -> Self {
        Self(HashMap::new())
    }

    fn with(mut self, path: &Path, date: NaiveDate) -> Self {
        self.0
            .insert(path.to_path_buf(), date.format("%Y:%m:%d 12:00:00").to_string());
        self
    }
}

impl MetadataSource for FixedDates {
    fn first_tag_value(&self, path: &Path, _tags: &[&str]) -> Option<String> {
        self.0.get(path).cloned()
    }
}

fn months_ago(months: u32) -> NaiveDate {
    Local::now()
        .date_naive()
        .checked_sub_months(Months::new(months))
        .unwrap()
}

fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        source_root: root.join("card").to_string_lossy().into_owned(),
        backup_root: root.join("backup").to_string_lossy().into_owned(),
        ledger_path: root.join("ledger.txt").to_string_lossy().into_owned(),
        retention_months: 12,
        concurrency: 4,
        ignore_patterns: vec![],
        archive_dir: None,
    }
}

fn count_files_recursive(dir: &Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files_recursive(&path);
            } else if path.is_file() {
                count += 1;
            }
        }
    }
    count
}

fn ledger_lines(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|s| s.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}

/// Three files dated 13, 11 and 1 months ago under a 12-month window:
/// exactly one is retired, all three are backed up first.
#[test]
fn test_end_to_end_backup_and_retire() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(&card).unwrap();

    let old = card.join("IMG_0001.JPG");
    let mid = card.join("IMG_0002.JPG");
    let new = card.join("IMG_0003.JPG");
    fs::write(&old, b"thirteen months old").unwrap();
    fs::write(&mid, b"eleven months old").unwrap();
    fs::write(&new, b"one month old").unwrap();

    let dates = FixedDates::empty()
        .with(&old, months_ago(13))
        .with(&mid, months_ago(11))
        .with(&new, months_ago(1));

    let engine = RunEngine::new(config.clone()).with_metadata_source(Box::new(dates));
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.backed_up, 3);
    assert_eq!(report.deduplicated, 0);
    assert_eq!(report.hash_failures, 0);
    assert_eq!(report.deletion_candidates, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.delete_failures, 0);

    // the old file is gone from the card but survives in the backup
    assert!(!old.exists());
    assert!(mid.exists());
    assert!(new.exists());
    assert_eq!(count_files_recursive(Path::new(&config.backup_root)), 3);
    assert_eq!(ledger_lines(Path::new(&config.ledger_path)), 3);

    let deleted: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.kind == OutcomeKind::Deleted)
        .collect();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].path, old);
    assert_eq!(deleted[0].resolved_date, Some(months_ago(13)));
}

/// Dry run: outcome records are produced, but source, backup and ledger are
/// all left untouched.
#[test]
fn test_dry_run_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(&card).unwrap();

    let old = card.join("IMG_0001.JPG");
    fs::write(&old, b"thirteen months old").unwrap();
    fs::write(card.join("IMG_0002.JPG"), b"one month old").unwrap();

    let dates = FixedDates::empty()
        .with(&old, months_ago(13))
        .with(&card.join("IMG_0002.JPG"), months_ago(1));

    let engine = RunEngine::new(config.clone())
        .with_metadata_source(Box::new(dates))
        .with_dry_run(true);
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.backed_up, 2);
    assert_eq!(report.deletion_candidates, 1);
    assert_eq!(report.deleted, 0);

    let simulated: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.kind == OutcomeKind::SimulatedDelete)
        .collect();
    assert_eq!(simulated.len(), 1);
    assert_eq!(simulated[0].path, old);

    // nothing on disk moved
    assert!(old.exists());
    assert_eq!(count_files_recursive(&card), 2);
    assert!(!Path::new(&config.backup_root).exists());
    assert!(!Path::new(&config.ledger_path).exists());
}

/// N eligible files, pool width K < N: every file is deleted exactly once
/// and exactly N file outcomes are emitted.
#[test]
fn test_concurrent_deletion_is_exact() {
    let tmp = tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.concurrency = 3;
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(&card).unwrap();

    let mut dates = FixedDates::empty();
    for i in 0..20 {
        let file = card.join(format!("IMG_{:04}.JPG", i));
        fs::write(&file, format!("contents {}", i)).unwrap();
        dates = dates.with(&file, months_ago(24));
    }

    let engine = RunEngine::new(config.clone()).with_metadata_source(Box::new(dates));
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.deletion_candidates, 20);
    assert_eq!(report.deleted, 20);
    assert_eq!(report.delete_failures, 0);
    assert_eq!(count_files_recursive(&card), 0);

    let mut deleted_paths: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.kind == OutcomeKind::Deleted)
        .map(|o| o.path.clone())
        .collect();
    assert_eq!(deleted_paths.len(), 20);
    deleted_paths.dedup();
    assert_eq!(deleted_paths.len(), 20, "every file deleted exactly once");
}

/// `/card/a/b/c` where only c's content is retired: c is removed, and b,
/// emptied by c's removal, goes in the same pass. `a` keeps its fresh file.
#[test]
fn test_reaping_cascades_bottom_up() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(card.join("a/b/c")).unwrap();

    let old = card.join("a/b/c/IMG_0001.JPG");
    fs::write(&old, b"ancient clip").unwrap();
    fs::write(card.join("a/keep.jpg"), b"fresh").unwrap();

    let dates = FixedDates::empty().with(&old, months_ago(20));

    let engine = RunEngine::new(config).with_metadata_source(Box::new(dates));
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.dirs_reaped, 2);
    assert!(!card.join("a/b").exists());
    assert!(card.join("a").is_dir());
    assert!(card.join("a/keep.jpg").exists());
}

/// Identical content re-synced under a new name in a later run is recognized
/// by the ledger and not re-recorded.
#[test]
fn test_cross_run_dedup() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(&card).unwrap();

    let original = card.join("IMG_0001.JPG");
    fs::write(&original, b"same shot").unwrap();
    let dates = FixedDates::empty().with(&original, months_ago(1));

    let first = RunEngine::new(config.clone())
        .with_metadata_source(Box::new(dates))
        .run(&SilentReporter)
        .unwrap();
    assert_eq!(first.backed_up, 1);
    assert_eq!(first.deduplicated, 0);

    // the same bytes come back under a different name
    let renamed = card.join("IMG_0001 (copy).JPG");
    fs::write(&renamed, b"same shot").unwrap();
    let dates = FixedDates::empty()
        .with(&original, months_ago(1))
        .with(&renamed, months_ago(1));

    let second = RunEngine::new(config.clone())
        .with_metadata_source(Box::new(dates))
        .run(&SilentReporter)
        .unwrap();
    assert_eq!(second.backed_up, 0);
    assert_eq!(second.deduplicated, 1);
    assert_eq!(ledger_lines(Path::new(&config.ledger_path)), 1);
}

/// Two identical files placed in the same run: one insert, one dedup.
#[test]
fn test_same_run_dedup() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(&card).unwrap();

    fs::write(card.join("IMG_0001.JPG"), b"burst frame").unwrap();
    fs::write(card.join("IMG_0001 (copy).JPG"), b"burst frame").unwrap();

    let engine = RunEngine::new(config.clone()).with_metadata_source(Box::new(FixedDates::empty()));
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.backed_up, 1);
    assert_eq!(report.deduplicated, 1);
    assert_eq!(ledger_lines(Path::new(&config.ledger_path)), 1);
}

/// The cutoff boundary is strict: dated at the cutoff survives, one day
/// earlier does not.
#[test]
fn test_cutoff_boundary_is_strict() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    let card = PathBuf::from(&config.source_root);
    fs::create_dir_all(&card).unwrap();

    let cutoff = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
    let before = card.join("before.jpg");
    let at = card.join("at.jpg");
    let after = card.join("after.jpg");
    for file in [&before, &at, &after] {
        fs::write(file, b"x").unwrap();
    }

    let dates = FixedDates::empty()
        .with(&before, cutoff.pred_opt().unwrap())
        .with(&at, cutoff)
        .with(&after, cutoff.succ_opt().unwrap());

    let engine = RunEngine::new(config)
        .with_metadata_source(Box::new(dates))
        .with_cutoff(cutoff);
    let report = engine.run(&SilentReporter).unwrap();

    assert_eq!(report.deletion_candidates, 1);
    assert!(!before.exists());
    assert!(at.exists());
    assert!(after.exists());
}

/// A missing media root is the one fatal condition, caught before any work.
#[test]
fn test_missing_source_root_is_fatal() {
    let tmp = tempdir().unwrap();
    let config = test_config(tmp.path());
    // note: card directory never created

    let engine = RunEngine::new(config.clone()).with_metadata_source(Box::new(FixedDates::empty()));
    let result = engine.run(&SilentReporter);

    assert!(matches!(result, Err(Error::SourceUnavailable(_))));
    assert!(!Path::new(&config.backup_root).exists());
    assert!(!Path::new(&config.ledger_path).exists());
}

/// A candidate whose file vanished before its worker reached it is recorded
/// as delete-failed and does not disturb its neighbors.
#[test]
fn test_vanished_candidate_is_recorded_not_fatal() {
    let tmp = tempdir().unwrap();
    let present = tmp.path().join("present.jpg");
    fs::write(&present, b"x").unwrap();

    let candidates = vec![
        DeletionCandidate {
            path: tmp.path().join("vanished.jpg"),
            resolved_date: months_ago(20),
        },
        DeletionCandidate {
            path: present.clone(),
            resolved_date: months_ago(20),
        },
    ];

    let outcomes = executor::execute(
        &candidates,
        false,
        &AtomicBool::new(false),
        &SilentReporter,
    );

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].kind, OutcomeKind::DeleteFailed);
    assert!(outcomes[0].detail.is_some());
    assert_eq!(outcomes[1].kind, OutcomeKind::Deleted);
    assert!(!present.exists());
}
