use crate::model::{DeletionCandidate, OutcomeKind, OutcomeRecord};
use crate::progress::ProgressReporter;
use rayon::prelude::*;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, error};

/// Remove every candidate on the ambient worker pool, emitting exactly one
/// OutcomeRecord per candidate regardless of success. Workers share nothing
/// but the outcome collection; one file's failure never blocks another, and
/// the output order matches the candidate order.
pub fn execute(
    candidates: &[DeletionCandidate],
    dry_run: bool,
    cancel: &AtomicBool,
    progress: &dyn ProgressReporter,
) -> Vec<OutcomeRecord> {
    let total = candidates.len();
    let done = AtomicUsize::new(0);

    candidates
        .par_iter()
        .map(|candidate| {
            let record = process_one(candidate, dry_run, cancel);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress.on_delete_progress(finished, total);
            record
        })
        .collect()
}

fn process_one(
    candidate: &DeletionCandidate,
    dry_run: bool,
    cancel: &AtomicBool,
) -> OutcomeRecord {
    if cancel.load(Ordering::Relaxed) {
        return OutcomeRecord::file(
            OutcomeKind::DeleteFailed,
            candidate.path.clone(),
            candidate.resolved_date,
        )
        .with_detail("cancelled before execution".to_string());
    }

    if dry_run {
        debug!("dry-run: would delete {}", candidate.path.display());
        return OutcomeRecord::file(
            OutcomeKind::SimulatedDelete,
            candidate.path.clone(),
            candidate.resolved_date,
        );
    }

    match fs::remove_file(&candidate.path) {
        Ok(()) => {
            debug!("deleted {}", candidate.path.display());
            OutcomeRecord::file(
                OutcomeKind::Deleted,
                candidate.path.clone(),
                candidate.resolved_date,
            )
        }
        Err(err) => {
            error!("Failed to remove '{}': {}", candidate.path.display(), err);
            OutcomeRecord::file(
                OutcomeKind::DeleteFailed,
                candidate.path.clone(),
                candidate.resolved_date,
            )
            .with_detail(err.to_string())
        }
    }
}
