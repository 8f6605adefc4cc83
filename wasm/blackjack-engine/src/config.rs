use serde::Deserialize;

use crate::bankroll::{DEFAULT_BALANCE, MIN_REMOTE_BALANCE};

fn default_starting_balance() -> f64 {
    DEFAULT_BALANCE
}

fn default_min_remote_balance() -> f64 {
    MIN_REMOTE_BALANCE
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
    #[serde(default = "default_min_remote_balance")]
    pub min_remote_balance: f64,
    /// Fixed shuffle seed; fresh entropy per table when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl TableConfig {
    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            starting_balance: default_starting_balance(),
            min_remote_balance: default_min_remote_balance(),
            seed: None,
            log_level: None,
        }
    }
}
