use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::error;

/// Parallel traversal of the media root. Collects every regular file,
/// filtering by glob ignore patterns. Skips symlinks; directories we cannot
/// read are logged and skipped rather than failing the scan.
pub fn collect_files(root: &Path, ignore_globs: &[String]) -> io::Result<Vec<PathBuf>> {
    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                error!("Invalid glob pattern '{}': {}", glob, err);
                None
            }
        })
        .collect();

    let files: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
    visit_dirs(root, &files, &ignore_patterns)?;
    Ok(files.into_inner().unwrap())
}

fn visit_dirs(
    dir: &Path,
    files: &Mutex<Vec<PathBuf>>,
    ignore_patterns: &[Pattern],
) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    if ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(dir))
    {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!("Access denied reading directory {}: {}", dir.display(), err);
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading entry in directory {}: {}", dir.display(), err),
                ));
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                // the entry vanished between readdir and stat
                error!("Error getting file type for {}: {}", path.display(), err);
                return Ok(());
            }
        };

        if file_type.is_dir() {
            visit_dirs(&path, files, ignore_patterns)?;
        } else if file_type.is_file()
            && !ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(&path))
        {
            files.lock().unwrap().push(path);
        }
        Ok(())
    })?;

    Ok(())
}
