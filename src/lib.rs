pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod metadata;
pub mod model;
pub mod progress;
pub mod reaper;
pub mod retention;
pub mod scanner;
pub mod sync;

pub use config::AppConfig;
pub use engine::{RunEngine, RunReport};
pub use error::Error;
pub use model::{DeletionCandidate, OutcomeKind, OutcomeRecord};
pub use progress::{ProgressReporter, SilentReporter};
