use blake3::Hash;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Append-only set of content hashes archived by previous runs.
///
/// The persisted file holds one hex digest per line and is loaded fully into
/// memory at run start: membership tests never re-read the file, and every
/// insert decision goes through one owner (`&mut self`), so parallel hashers
/// can never lose an append to a stale read.
pub struct HashLedger {
    path: PathBuf,
    hashes: HashSet<Hash>,
    read_only: bool,
}

impl HashLedger {
    /// Load the ledger from `path`, starting empty when the file does not
    /// exist yet. Malformed lines are skipped with a warning rather than
    /// poisoning the whole ledger.
    pub fn load(path: &Path, read_only: bool) -> io::Result<Self> {
        let mut hashes = HashSet::new();

        match File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    let entry = line.trim();
                    if entry.is_empty() {
                        continue;
                    }
                    match Hash::from_hex(entry) {
                        Ok(hash) => {
                            hashes.insert(hash);
                        }
                        Err(err) => {
                            warn!("Skipping malformed ledger entry '{}': {}", entry, err);
                        }
                    }
                }
                debug!("Loaded {} hashes from {}", hashes.len(), path.display());
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", path.display());
            }
            Err(err) => return Err(err),
        }

        Ok(Self {
            path: path.to_path_buf(),
            hashes,
            read_only,
        })
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    /// Idempotent insert: returns `false` (and writes nothing) when the hash
    /// is already present. In read-only mode the in-memory set still grows so
    /// within-run dedup keeps working, but the file is never touched.
    pub fn insert(&mut self, hash: Hash) -> io::Result<bool> {
        if !self.hashes.insert(hash) {
            return Ok(false);
        }

        if !self.read_only {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            writeln!(file, "{}", hash.to_hex())?;
        }

        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Content hash of a file's full byte content, streamed in 64 KiB chunks.
pub fn hash_file(path: &Path) -> io::Result<Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize())
}
