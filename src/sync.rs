use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One file placed (or, in simulate mode, that would be placed) at the
/// destination by a sync pass. Carried as typed paths end to end, never
/// serialized through a delimited text format.
#[derive(Debug, Clone)]
pub struct SyncedFile {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// External transfer collaborator. Copies new/changed files from the source
/// root into the destination root and reports what it placed there.
pub trait Synchronizer: Send + Sync {
    /// In simulate mode no write of any kind is performed; the returned set
    /// is what a real pass would have placed.
    fn sync(
        &self,
        source_root: &Path,
        dest_root: &Path,
        simulate: bool,
    ) -> io::Result<Vec<SyncedFile>>;
}

/// Mirror-style one-way copy. A destination file is rewritten only when it
/// is missing or its size or mtime disagrees with the source. Per-file copy
/// failures are logged and skipped; they never abort the pass.
pub struct MirrorSync;

impl Synchronizer for MirrorSync {
    fn sync(
        &self,
        source_root: &Path,
        dest_root: &Path,
        simulate: bool,
    ) -> io::Result<Vec<SyncedFile>> {
        let mut placed = Vec::new();

        for entry in WalkDir::new(source_root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        "Skipping unreadable entry under {}: {}",
                        source_root.display(),
                        err
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(source_root)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            let dest = dest_root.join(rel);

            match needs_copy(entry.path(), &dest) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(err) => {
                    warn!("Cannot compare {}: {}", dest.display(), err);
                    continue;
                }
            }

            if !simulate {
                if let Err(err) = copy_one(entry.path(), &dest) {
                    warn!(
                        "Failed to copy {} -> {}: {}",
                        entry.path().display(),
                        dest.display(),
                        err
                    );
                    continue;
                }
                debug!("Copied {} -> {}", entry.path().display(), dest.display());
            } else {
                debug!("simulate: would copy {} -> {}", entry.path().display(), dest.display());
            }

            placed.push(SyncedFile {
                source: entry.path().to_path_buf(),
                dest,
            });
        }

        Ok(placed)
    }
}

fn copy_one(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

fn needs_copy(source: &Path, dest: &Path) -> io::Result<bool> {
    let dest_meta = match fs::metadata(dest) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(err) => return Err(err),
    };
    let source_meta = fs::metadata(source)?;

    if source_meta.len() != dest_meta.len() {
        return Ok(true);
    }
    match (source_meta.modified(), dest_meta.modified()) {
        (Ok(source_time), Ok(dest_time)) => Ok(source_time > dest_time),
        _ => Ok(false),
    }
}
