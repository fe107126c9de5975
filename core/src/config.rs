use crate::{
    error::{BenchError, BenchResult},
    scaling::ScaleConfig,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "pgbench.db";
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// How each statement reaches the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    /// Literal values substituted into the SQL text.
    #[default]
    Inline,
    /// Bound parameters, statement prepared on every call.
    ParameterizedOnce,
    /// Bound parameters on a statement prepared once per connection.
    PreparedReused,
}

impl QueryStrategy {
    /// The pgbench `--protocol` name for this strategy.
    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Inline            => "simple",
            Self::ParameterizedOnce => "extended",
            Self::PreparedReused    => "prepared",
        }
    }
}

/// Table upkeep performed before the timed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maintenance {
    Skip,
    /// Empty history and refresh statistics on tellers and branches.
    #[default]
    Standard,
    /// VACUUM the whole database, then ANALYZE.
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    /// Create the tables (if missing) and seed them before the run.
    pub initialize:   bool,
    pub drop_tables:  bool,
    /// Empty all four tables before seeding.
    pub truncate:     bool,
    pub primary_keys: bool,
    /// Implies primary keys: SQLite needs a unique parent key.
    pub foreign_keys: bool,
    /// Type account ids as `bigint`.
    pub big_integers: bool,
    pub maintenance:  Maintenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Database file path or SQLite URI.
    pub database:                String,
    pub clients:                 usize,
    pub transactions_per_client: u64,
    pub scale:                   u32,
    pub select_only:             bool,
    pub transaction_blocks:      bool,
    pub strategy:                QueryStrategy,
    /// Master seed for the client RNG streams. Random when absent.
    pub seed:                    Option<u64>,
    /// Log every failed transaction at warn level.
    pub verbose:                 bool,
    pub sample_interval_ms:      u64,
    pub busy_timeout_ms:         u64,
    pub init:                    InitOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            database:                DEFAULT_DATABASE.to_string(),
            clients:                 1,
            transactions_per_client: 10,
            scale:                   1,
            select_only:             false,
            transaction_blocks:      true,
            strategy:                QueryStrategy::Inline,
            seed:                    None,
            verbose:                 false,
            sample_interval_ms:      DEFAULT_SAMPLE_INTERVAL_MS,
            busy_timeout_ms:         DEFAULT_BUSY_TIMEOUT_MS,
            init:                    InitOptions::default(),
        }
    }
}

impl RunConfig {
    /// Load a JSON run configuration. Missing fields take their defaults.
    pub fn load(path: &str) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BenchError::InvalidConfig(format!("Cannot read {path}: {e}")))?;
        let config: RunConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small, seeded, self-initializing configuration for tests.
    pub fn default_test(database: &str) -> Self {
        Self {
            database:                database.to_string(),
            clients:                 1,
            transactions_per_client: 50,
            seed:                    Some(0x5EED),
            sample_interval_ms:      10,
            init: InitOptions {
                initialize:   true,
                primary_keys: true,
                maintenance:  Maintenance::Skip,
                ..InitOptions::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.clients == 0 {
            return Err(BenchError::InvalidConfig("clients must be at least 1".into()));
        }
        if self.scale == 0 {
            return Err(BenchError::InvalidConfig("scale factor must be at least 1".into()));
        }
        if self.database.is_empty() {
            return Err(BenchError::InvalidConfig("database must not be empty".into()));
        }
        if self.sample_interval_ms == 0 {
            return Err(BenchError::InvalidConfig("sample interval must be positive".into()));
        }
        Ok(())
    }

    pub fn scale_config(&self) -> ScaleConfig {
        ScaleConfig::new(self.scale)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
