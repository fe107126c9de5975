//! tpcb-bench: TPC-B style load generator for SQLite.
//!
//! Usage:
//!   tpcb-bench -i -s 2 bench.db
//!   tpcb-bench -c 8 -t 1000 -M prepared bench.db
//!   tpcb-bench --config run.json --json

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tpcb_core::{
    config::{InitOptions, Maintenance, QueryStrategy, RunConfig},
    run_benchmark,
    service_file::ServiceFile,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Protocol {
    /// Literal values in the SQL text
    Simple,
    /// Bound parameters, prepared on every call
    Extended,
    /// Bound parameters on statements prepared once per client
    Prepared,
}

impl From<Protocol> for QueryStrategy {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Simple   => QueryStrategy::Inline,
            Protocol::Extended => QueryStrategy::ParameterizedOnce,
            Protocol::Prepared => QueryStrategy::PreparedReused,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tpcb-bench")]
#[command(about = "TPC-B style benchmark: seeds a scaled dataset and measures transaction throughput")]
#[command(version)]
struct Cli {
    /// Database file (or SQLite URI)
    #[arg(default_value = tpcb_core::config::DEFAULT_DATABASE)]
    database: String,

    /// Number of clients simulated, that is, number of concurrent database sessions
    #[arg(short, long, default_value_t = 1)]
    clients: usize,

    /// Number of transactions each client runs
    #[arg(short, long, default_value_t = 10)]
    transactions: u64,

    /// Scale factor: 1 branch, 10 tellers and 10000 accounts per unit
    #[arg(short, long, default_value_t = 1)]
    scale: u32,

    /// Run the built-in select-only script
    #[arg(short = 'S', long)]
    select_only: bool,

    /// Protocol used to submit queries
    #[arg(short = 'M', long, value_enum, default_value_t = Protocol::Simple)]
    protocol: Protocol,

    /// Let every statement commit on its own
    #[arg(long)]
    no_transaction_blocks: bool,

    /// Create the tables and seed the dataset before the run
    #[arg(short, long)]
    initialize: bool,

    /// Drop tables before creating them
    #[arg(long)]
    drop_tables: bool,

    /// Empty all tables before seeding
    #[arg(long)]
    truncate: bool,

    /// Declare primary keys on the standard tables
    #[arg(long)]
    primary_keys: bool,

    /// Declare foreign keys between the standard tables (implies primary keys)
    #[arg(long)]
    foreign_keys: bool,

    /// Use bigint for account ids
    #[arg(long)]
    big_integers: bool,

    /// Perform no maintenance before running the test
    #[arg(short, long, conflicts_with = "vacuum_all")]
    no_vacuum: bool,

    /// Vacuum and analyze the whole database before running the test.
    /// With neither -n nor -v, history is emptied and tellers and branches are analyzed.
    #[arg(short, long)]
    vacuum_all: bool,

    /// Master seed for the client random streams
    #[arg(long)]
    seed: Option<u64>,

    /// How long a client waits on a locked database before failing a statement
    #[arg(long, default_value_t = tpcb_core::config::DEFAULT_BUSY_TIMEOUT_MS)]
    busy_timeout_ms: u64,

    /// Memory sampling interval
    #[arg(long, default_value_t = tpcb_core::config::DEFAULT_SAMPLE_INTERVAL_MS)]
    sample_interval_ms: u64,

    /// Take the database from this entry of the service file
    #[arg(long)]
    service: Option<String>,

    /// Load the whole run configuration from a JSON file (other run flags are ignored)
    #[arg(long)]
    config: Option<String>,

    /// Log every failed transaction
    #[arg(long)]
    verbose: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("run configuration from {path}; command-line run flags ignored");
                RunConfig::load(path).with_context(|| format!("loading {path}"))?
            }
            None => self.config_from_flags(),
        };
        if let Some(name) = &self.service {
            let services = ServiceFile::load().context("reading service file")?;
            config.database = services.database(name)?;
            log::info!("service {name} resolved to {}", config.database);
        }
        Ok(config)
    }

    /// Default log filter when RUST_LOG is unset. Failed transactions are
    /// logged at warn only in verbose mode.
    fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "warn"
        } else {
            "error"
        }
    }

    fn config_from_flags(&self) -> RunConfig {
        let maintenance = if self.no_vacuum {
            Maintenance::Skip
        } else if self.vacuum_all {
            Maintenance::Full
        } else {
            Maintenance::Standard
        };
        RunConfig {
            database:                self.database.clone(),
            clients:                 self.clients,
            transactions_per_client: self.transactions,
            scale:                   self.scale,
            select_only:             self.select_only,
            transaction_blocks:      !self.no_transaction_blocks,
            strategy:                self.protocol.into(),
            seed:                    self.seed,
            verbose:                 self.verbose,
            sample_interval_ms:      self.sample_interval_ms,
            busy_timeout_ms:         self.busy_timeout_ms,
            init: InitOptions {
                initialize:   self.initialize,
                drop_tables:  self.drop_tables,
                truncate:     self.truncate,
                primary_keys: self.primary_keys,
                foreign_keys: self.foreign_keys,
                big_integers: self.big_integers,
                maintenance,
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.default_log_filter()),
    )
    .init();

    let config = cli.run_config()?;

    if !cli.json {
        print_banner(&config);
    }

    let report = run_benchmark(&config)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("* Benchmark finished *");
        println!();
        println!("{report}");
    }
    Ok(())
}

fn print_banner(config: &RunConfig) {
    println!("*********************************************************");
    println!("* tpcb-bench v{:<42}*", env!("CARGO_PKG_VERSION"));
    println!("*********************************************************");
    println!();
    println!("Database: {}", config.database);
    println!();
    println!("Number of clients: {}", config.clients);
    println!("Number of transactions per client: {}", config.transactions_per_client);
    println!("Scale factor: {}", config.scale);
    println!("Protocol: {}", config.strategy.protocol_name());
    if config.select_only {
        println!("Transaction mode:  SELECT-only");
    } else {
        println!("Transaction mode:  TPC-B like");
    }
    if config.init.initialize {
        println!("Initializing dataset before the run");
    }
    println!();
    println!("* Starting Benchmark Run *");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("tpcb-bench").chain(args.iter().copied());
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn defaults_match_pgbench() {
        let config = parse(&[]).config_from_flags();
        assert_eq!(config.database, tpcb_core::config::DEFAULT_DATABASE);
        assert_eq!(config.clients, 1);
        assert_eq!(config.transactions_per_client, 10);
        assert_eq!(config.scale, 1);
        assert!(config.transaction_blocks, "transaction blocks are on unless disabled");
        assert_eq!(config.strategy, QueryStrategy::Inline);
        assert_eq!(config.init.maintenance, Maintenance::Standard);
        assert!(!config.init.initialize);
    }

    #[test]
    fn vacuum_flags_select_maintenance() {
        assert_eq!(parse(&["-n"]).config_from_flags().init.maintenance, Maintenance::Skip);
        assert_eq!(parse(&["-v"]).config_from_flags().init.maintenance, Maintenance::Full);
        assert_eq!(parse(&["--vacuum-all"]).config_from_flags().init.maintenance, Maintenance::Full);
        assert!(Cli::try_parse_from(["tpcb-bench", "-n", "-v"]).is_err(), "-n and -v conflict");
    }

    #[test]
    fn protocol_names_map_to_strategies() {
        let cases = [
            ("simple", QueryStrategy::Inline),
            ("extended", QueryStrategy::ParameterizedOnce),
            ("prepared", QueryStrategy::PreparedReused),
        ];
        for (name, strategy) in cases {
            let config = parse(&["-M", name]).config_from_flags();
            assert_eq!(config.strategy, strategy, "-M {name}");
            assert_eq!(config.strategy.protocol_name(), name);
        }
        assert!(Cli::try_parse_from(["tpcb-bench", "-M", "binary"]).is_err());
    }

    #[test]
    fn run_and_init_flags_reach_the_config() {
        let cli = parse(&[
            "-c", "8", "-t", "250", "-s", "3", "-S", "--no-transaction-blocks", "-i",
            "--drop-tables", "--truncate", "--foreign-keys", "--big-integers",
            "--seed", "42", "--busy-timeout-ms", "900", "--sample-interval-ms", "25",
            "--verbose", "bench.db",
        ]);
        let config = cli.config_from_flags();
        assert_eq!(config.database, "bench.db");
        assert_eq!(config.clients, 8);
        assert_eq!(config.transactions_per_client, 250);
        assert_eq!(config.scale, 3);
        assert!(config.select_only);
        assert!(!config.transaction_blocks);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.busy_timeout_ms, 900);
        assert_eq!(config.sample_interval_ms, 25);
        assert!(config.verbose);
        assert!(config.init.initialize);
        assert!(config.init.drop_tables);
        assert!(config.init.truncate);
        assert!(config.init.foreign_keys);
        assert!(config.init.big_integers);
        assert!(!config.init.primary_keys);
    }

    #[test]
    fn config_file_overrides_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let from_file = RunConfig {
            database: "from-file.db".into(),
            clients: 3,
            strategy: QueryStrategy::PreparedReused,
            ..RunConfig::default()
        };
        std::fs::write(&path, serde_json::to_string(&from_file).unwrap()).unwrap();

        let cli = parse(&["-c", "9", "-M", "simple", "--config", path.to_str().unwrap(), "flags.db"]);
        let config = cli.run_config().unwrap();
        assert_eq!(config, from_file);
    }

    #[test]
    fn verbose_lowers_the_default_log_filter() {
        assert_eq!(parse(&[]).default_log_filter(), "error");
        assert_eq!(parse(&["--verbose"]).default_log_filter(), "warn");
    }
}
