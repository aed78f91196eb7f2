use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

/// A file classified eligible for removal but not yet processed.
#[derive(Debug, Clone)]
pub struct DeletionCandidate {
    pub path: PathBuf,
    pub resolved_date: NaiveDate,
}

/// Tag describing what happened to one candidate or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    SimulatedDelete,
    Deleted,
    DeleteFailed,
    DirRemoved,
    DirRemovalFailed,
    SimulatedDirRemoval,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::SimulatedDelete => "simulated-delete",
            OutcomeKind::Deleted => "deleted",
            OutcomeKind::DeleteFailed => "delete-failed",
            OutcomeKind::DirRemoved => "dir-removed",
            OutcomeKind::DirRemovalFailed => "dir-removal-failed",
            OutcomeKind::SimulatedDirRemoval => "simulated-dir-removal",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per processed candidate or directory. Never mutated after
/// creation; the full sequence is handed to reporting as-is.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub kind: OutcomeKind,
    pub path: PathBuf,
    /// Resolved creation date of the file; absent for directories.
    pub resolved_date: Option<NaiveDate>,
    /// Error text for the failure kinds.
    pub detail: Option<String>,
}

impl OutcomeRecord {
    pub fn file(kind: OutcomeKind, path: PathBuf, resolved_date: NaiveDate) -> Self {
        Self {
            kind,
            path,
            resolved_date: Some(resolved_date),
            detail: None,
        }
    }

    pub fn dir(kind: OutcomeKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            resolved_date: None,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}
