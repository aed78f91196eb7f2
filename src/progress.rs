/// Trait for reporting run progress.
///
/// The CLI implements this with tracing/indicatif; tests run silent.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_sync_start(&self) {}
    fn on_sync_complete(&self, _new_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_complete(&self, _backed_up: usize, _deduplicated: usize, _duration_secs: f64) {}
    fn on_classify_complete(&self, _candidates: usize, _scanned: usize) {}
    fn on_delete_start(&self, _total: usize) {}
    fn on_delete_progress(&self, _done: usize, _total: usize) {}
    fn on_delete_complete(&self, _deleted: usize, _failed: usize, _duration_secs: f64) {}
    fn on_reap_complete(&self, _removed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
