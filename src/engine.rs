use crate::archive::{Archiver, TarArchiver};
use crate::config::AppConfig;
use crate::error::Error;
use crate::executor;
use crate::ledger::{self, HashLedger};
use crate::metadata::{self, ExifTool, MetadataSource};
use crate::model::{DeletionCandidate, OutcomeKind, OutcomeRecord};
use crate::progress::ProgressReporter;
use crate::reaper;
use crate::retention;
use crate::scanner;
use crate::sync::{MirrorSync, SyncedFile, Synchronizer};
use chrono::{Local, NaiveDate};
use dashmap::DashMap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct RunEngine {
    config: AppConfig,
    dry_run: bool,
    cutoff_override: Option<NaiveDate>,
    metadata: Box<dyn MetadataSource>,
    synchronizer: Box<dyn Synchronizer>,
    archiver: Option<Box<dyn Archiver>>,
    cancel: Arc<AtomicBool>,
}

/// Aggregate result of one run: phase durations, terminal counts, and the
/// full ordered outcome sequence for external reporting.
#[derive(Debug)]
pub struct RunReport {
    pub cutoff: NaiveDate,
    pub sync_duration: Duration,
    pub hash_duration: Duration,
    pub delete_duration: Duration,
    pub reap_duration: Duration,
    pub backed_up: usize,
    pub deduplicated: usize,
    pub hash_failures: usize,
    pub deletion_candidates: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    pub dirs_reaped: usize,
    pub outcomes: Vec<OutcomeRecord>,
}

impl RunEngine {
    pub fn new(config: AppConfig) -> Self {
        let archiver = config
            .archive_dir
            .as_ref()
            .map(|dir| Box::new(TarArchiver::new(Path::new(dir))) as Box<dyn Archiver>);

        Self {
            config,
            dry_run: false,
            cutoff_override: None,
            metadata: Box::new(ExifTool),
            synchronizer: Box::new(MirrorSync),
            archiver,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Pin the cutoff instead of deriving it from today's date.
    pub fn with_cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.cutoff_override = Some(cutoff);
        self
    }

    pub fn with_metadata_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.metadata = source;
        self
    }

    pub fn with_synchronizer(mut self, synchronizer: Box<dyn Synchronizer>) -> Self {
        self.synchronizer = synchronizer;
        self
    }

    pub fn with_archiver(mut self, archiver: Option<Box<dyn Archiver>>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Token for stopping the run between stages; deletion workers also
    /// check it before touching their file.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the full backup-and-retire pipeline:
    /// 1. Mirror new media into the backup root
    /// 2. Hash the newly placed files and dedup against the ledger
    /// 3. Archive the backup root (non-dry runs with an archive dir)
    /// 4. Classify the full on-device set against the retention cutoff
    /// 5. Delete eligible files through the bounded worker pool
    /// 6. Reap directories left empty
    pub fn run(&self, progress: &dyn ProgressReporter) -> Result<RunReport, Error> {
        let source_root = PathBuf::from(&self.config.source_root);
        if !source_root.is_dir() {
            return Err(Error::SourceUnavailable(source_root));
        }
        let backup_root = PathBuf::from(&self.config.backup_root);

        // One cutoff for the whole run, however long it takes.
        let cutoff = match self.cutoff_override {
            Some(cutoff) => cutoff,
            None => retention::cutoff_date(Local::now().date_naive(), self.config.retention_months)
                .ok_or_else(|| Error::Other("retention window underflows the calendar".into()))?,
        };
        info!(
            "Retention cutoff: {} ({} month window{})",
            cutoff,
            self.config.retention_months,
            if self.dry_run { ", dry run" } else { "" },
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency.max(1))
            .build()
            .map_err(|err| Error::Other(format!("failed to build worker pool: {}", err)))?;

        // Phase 1: sync new media off the card
        progress.on_sync_start();
        let sync_start = Instant::now();
        let synced = self
            .synchronizer
            .sync(&source_root, &backup_root, self.dry_run)?;
        let sync_duration = sync_start.elapsed();
        progress.on_sync_complete(synced.len(), sync_duration.as_secs_f64());
        debug!(
            "Sync placed {} files in {:.2}s",
            synced.len(),
            sync_duration.as_secs_f64(),
        );

        self.check_cancelled(&source_root)?;

        // Phase 2: dedup newly placed content against the ledger
        progress.on_hash_start(synced.len());
        let hash_start = Instant::now();
        let mut hash_ledger = HashLedger::load(Path::new(&self.config.ledger_path), self.dry_run)?;
        let (backed_up, deduplicated, hash_failures) =
            self.dedup_new_files(&pool, &synced, &mut hash_ledger)?;
        let hash_duration = hash_start.elapsed();
        progress.on_hash_complete(backed_up, deduplicated, hash_duration.as_secs_f64());
        debug!(
            "Ledger holds {} hashes after dedup ({:.2}s)",
            hash_ledger.len(),
            hash_duration.as_secs_f64(),
        );

        // Phase 3: archive packaging (external collaborator, never on dry runs)
        if !self.dry_run {
            if let Some(archiver) = &self.archiver {
                match archiver.archive(&backup_root) {
                    Ok(artifact) => info!("Archive written to {}", artifact.display()),
                    Err(err) => warn!("Archiving failed, continuing: {}", err),
                }
            }
        }

        self.check_cancelled(&source_root)?;

        // Phase 4: classify everything currently on the device, not just
        // this run's transfers
        let device_files = scanner::collect_files(&source_root, &self.config.ignore_patterns)?;
        let mut candidates = self.classify(&pool, &device_files, cutoff);
        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        progress.on_classify_complete(candidates.len(), device_files.len());
        info!(
            "{} of {} on-device files eligible for retirement",
            candidates.len(),
            device_files.len(),
        );
        let deletion_candidates = candidates.len();

        self.check_cancelled(&source_root)?;

        // Phase 5: delete
        progress.on_delete_start(candidates.len());
        let delete_start = Instant::now();
        let mut outcomes =
            pool.install(|| executor::execute(&candidates, self.dry_run, &self.cancel, progress));
        let delete_duration = delete_start.elapsed();
        let deleted = count_kind(&outcomes, OutcomeKind::Deleted);
        let delete_failures = count_kind(&outcomes, OutcomeKind::DeleteFailed);
        progress.on_delete_complete(deleted, delete_failures, delete_duration.as_secs_f64());

        // Phase 6: reap, strictly after every deletion has settled
        let reap_start = Instant::now();
        let dir_outcomes = reaper::reap_empty_dirs(&source_root, self.dry_run);
        let reap_duration = reap_start.elapsed();
        let dirs_reaped = count_kind(&dir_outcomes, OutcomeKind::DirRemoved);
        progress.on_reap_complete(dirs_reaped, reap_duration.as_secs_f64());
        outcomes.extend(dir_outcomes);

        Ok(RunReport {
            cutoff,
            sync_duration,
            hash_duration,
            delete_duration,
            reap_duration,
            backed_up,
            deduplicated,
            hash_failures,
            deletion_candidates,
            deleted,
            delete_failures,
            dirs_reaped,
            outcomes,
        })
    }

    fn check_cancelled(&self, source_root: &Path) -> Result<(), Error> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        // the card may have been yanked mid-run; stop issuing work if so
        if !source_root.is_dir() {
            self.cancel.store(true, Ordering::Relaxed);
            return Err(Error::SourceUnavailable(source_root.to_path_buf()));
        }
        Ok(())
    }

    /// Hash newly placed files in parallel (pure per-file work), then funnel
    /// every ledger decision through this single owner, serially. Identical
    /// content placed twice in one run is grouped first so same-run extras
    /// dedup too. Returns (backed_up, deduplicated, hash_failures).
    fn dedup_new_files(
        &self,
        pool: &rayon::ThreadPool,
        synced: &[SyncedFile],
        hash_ledger: &mut HashLedger,
    ) -> Result<(usize, usize, usize), Error> {
        let failures = AtomicUsize::new(0);
        let by_hash: DashMap<blake3::Hash, Vec<PathBuf>> = DashMap::new();

        pool.install(|| {
            synced.par_iter().for_each(|file| {
                // dry runs never wrote the destination copy; hash the source
                let target = if self.dry_run { &file.source } else { &file.dest };
                match ledger::hash_file(target) {
                    Ok(hash) => {
                        by_hash.entry(hash).or_default().push(file.dest.clone());
                    }
                    Err(err) => {
                        warn!(
                            "Could not hash {} (excluded from ledger this run): {}",
                            target.display(),
                            err
                        );
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        });

        let mut backed_up = 0usize;
        let mut deduplicated = 0usize;
        for entry in by_hash.iter() {
            let paths = entry.value();
            if hash_ledger.insert(*entry.key())? {
                backed_up += 1;
                deduplicated += paths.len() - 1;
                if paths.len() > 1 {
                    debug!(
                        "Same-run duplicates of {}: {:?}",
                        paths[0].display(),
                        &paths[1..],
                    );
                }
            } else {
                deduplicated += paths.len();
                info!("Content already archived, not re-recording: {:?}", paths);
            }
        }

        Ok((backed_up, deduplicated, failures.load(Ordering::Relaxed)))
    }

    fn classify(
        &self,
        pool: &rayon::ThreadPool,
        files: &[PathBuf],
        cutoff: NaiveDate,
    ) -> Vec<DeletionCandidate> {
        pool.install(|| {
            files
                .par_iter()
                .filter_map(|path| {
                    // absent dates are skipped here, never treated as eligible
                    let date = metadata::resolve_date(self.metadata.as_ref(), path)?;
                    if retention::is_eligible(date, cutoff) {
                        Some(DeletionCandidate {
                            path: path.clone(),
                            resolved_date: date,
                        })
                    } else {
                        None
                    }
                })
                .collect()
        })
    }
}

fn count_kind(outcomes: &[OutcomeRecord], kind: OutcomeKind) -> usize {
    outcomes.iter().filter(|o| o.kind == kind).count()
}
