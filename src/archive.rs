use crate::error::Error;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// External archive packaging. Invoked only on non-dry runs.
pub trait Archiver: Send + Sync {
    /// Produce a compressed archive of `dir`, returning the artifact path.
    fn archive(&self, dir: &Path) -> Result<PathBuf, Error>;
}

/// Shells out to `tar` for a gzipped snapshot of the backup root.
pub struct TarArchiver {
    output_dir: PathBuf,
}

impl TarArchiver {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }
}

impl Archiver for TarArchiver {
    fn archive(&self, dir: &Path) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|err| Error::Archive(format!("cannot create archive dir: {}", err)))?;

        let dir_name = dir.file_name().unwrap_or(dir.as_os_str());
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let artifact = self
            .output_dir
            .join(format!("{}-{}.tar.gz", dir_name.to_string_lossy(), stamp));
        let parent = dir.parent().unwrap_or_else(|| Path::new("."));

        let status = Command::new("tar")
            .arg("-czf")
            .arg(&artifact)
            .arg("-C")
            .arg(parent)
            .arg(dir_name)
            .status()
            .map_err(|err| Error::Archive(format!("failed to spawn tar: {}", err)))?;

        if !status.success() {
            return Err(Error::Archive(format!("tar exited with {}", status)));
        }

        info!("Archived {} to {}", dir.display(), artifact.display());
        Ok(artifact)
    }
}
