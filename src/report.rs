use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use snapsafe::{OutcomeRecord, ProgressReporter, RunReport};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// CLI progress reporter using indicatif.
///
/// - Sync phase: spinner (unknown total upfront)
/// - Delete phase: progress bar (candidate count known)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn spinner(&self, message: &'static str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(message);
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }
}

impl ProgressReporter for CliReporter {
    fn on_sync_start(&self) {
        self.spinner("Backing up new media...");
    }

    fn on_sync_complete(&self, new_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Sync complete: {} new files in {:.2}s",
            new_files, duration_secs
        );
    }

    fn on_hash_start(&self, _total_files: usize) {
        self.spinner("Hashing new files against the ledger...");
    }

    fn on_hash_complete(&self, backed_up: usize, deduplicated: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Dedup complete: {} backed up, {} already archived in {:.2}s",
            backed_up, deduplicated, duration_secs
        );
    }

    fn on_delete_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Retiring [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_delete_progress(&self, done: usize, _total: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_position(done as u64);
        }
    }

    fn on_delete_complete(&self, deleted: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Retire complete: {} deleted, {} failed in {:.2}s",
            deleted, failed, duration_secs
        );
    }

    fn on_reap_complete(&self, removed: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Reap complete: {} empty directories removed in {:.2}s",
            removed, duration_secs
        );
    }
}

pub fn print_summary(report: &RunReport) {
    info!(
        "Sync: {}, Hash: {}, Delete: {}, Reap: {}",
        format!("{:.2}s", report.sync_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.hash_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.delete_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.reap_duration.as_secs_f64()).green(),
    );
    info!(
        "{} backed up, {} deduplicated, {} hash failures",
        format!("{}", report.backed_up).green(),
        format!("{}", report.deduplicated).cyan(),
        format!("{}", report.hash_failures).red(),
    );
    info!(
        "{} candidates older than {}: {} deleted, {} failed, {} directories reaped",
        format!("{}", report.deletion_candidates).yellow(),
        report.cutoff,
        format!("{}", report.deleted).red(),
        format!("{}", report.delete_failures).red(),
        format!("{}", report.dirs_reaped).cyan(),
    );
}

/// Export the full outcome sequence for external reporting.
pub fn write_outcomes_csv(
    path: &Path,
    outcomes: &[OutcomeRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["outcome", "path", "resolved_date", "detail"])?;

    for outcome in outcomes {
        let target = outcome.path.to_string_lossy();
        let date = outcome
            .resolved_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        writer.write_record([
            outcome.kind.as_str(),
            target.as_ref(),
            date.as_str(),
            outcome.detail.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
