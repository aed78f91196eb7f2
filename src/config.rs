use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Mount point of the media source (SD card, camera, ...).
    pub source_root: String,
    /// Where new media is mirrored to.
    pub backup_root: String,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    /// How old a file must be before it is retired from the source.
    #[serde(default = "default_retention_months")]
    pub retention_months: u32,
    /// Worker pool width for hashing and deletion.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// When set, non-dry runs tar up the backup root into this directory.
    #[serde(default)]
    pub archive_dir: Option<String>,
}

fn default_ledger_path() -> String {
    "snapsafe_ledger.txt".to_string()
}

fn default_retention_months() -> u32 {
    12
}

fn default_concurrency() -> usize {
    4
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
