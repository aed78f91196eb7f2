use crate::model::{OutcomeKind, OutcomeRecord};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Remove directories left empty after deletion, deepest first so a removed
/// child can make its parent eligible within the same pass. Must run strictly
/// after the deletion stage, since emptiness is only meaningful once
/// deletions have settled. Each removal is independent and non-fatal; the root itself
/// is never removed.
pub fn reap_empty_dirs(root: &Path, dry_run: bool) -> Vec<OutcomeRecord> {
    let mut outcomes = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .follow_links(false)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        // re-check emptiness right before acting; the walk snapshot is stale
        // once children have been removed
        match is_empty_dir(entry.path()) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                warn!("Cannot read directory {}: {}", entry.path().display(), err);
                continue;
            }
        }

        if dry_run {
            debug!("dry-run: would remove empty dir {}", entry.path().display());
            outcomes.push(OutcomeRecord::dir(
                OutcomeKind::SimulatedDirRemoval,
                entry.path().to_path_buf(),
            ));
            continue;
        }

        match fs::remove_dir(entry.path()) {
            Ok(()) => {
                debug!("removed empty dir {}", entry.path().display());
                outcomes.push(OutcomeRecord::dir(
                    OutcomeKind::DirRemoved,
                    entry.path().to_path_buf(),
                ));
            }
            Err(err) => {
                // commonly a benign race: the directory gained content after
                // the emptiness check
                warn!("Could not remove {}: {}", entry.path().display(), err);
                outcomes.push(
                    OutcomeRecord::dir(
                        OutcomeKind::DirRemovalFailed,
                        entry.path().to_path_buf(),
                    )
                    .with_detail(err.to_string()),
                );
            }
        }
    }

    outcomes
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}
