use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use station_printer::{Charset, DEFAULT_PRINTER_PORT};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WORK_DIR: &str = "./data";
pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_PRINTER_HOST: &str = "192.168.1.19";
pub const DEFAULT_PRINTER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PRINTER_SETTLE_MS: u64 = 1_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_ORDER_RETENTION_MINS: u64 = 120;
pub const DEFAULT_LEDGER_CAPACITY: usize = 1_000;
pub const DEFAULT_TIMEZONE: &str = "Europe/Amsterdam";

// One year
const MAX_RETENTION_MINS: i64 = 60 * 24 * 365;

const ORDERS_DB_FILE: &str = "orders.redb";
const LEDGER_DB_FILE: &str = "ledger.redb";

/// Command line entry point
#[derive(Debug, Parser)]
#[command(name = "print-server", version, about = "Station 134 order intake and receipt printing")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Run the HTTP API and the print dispatcher (default)
    Serve,
    /// Print a test receipt and exit
    Test,
    /// Print the effective configuration and exit
    Config,
}

/// Print server configuration
///
/// # Environment variables
///
/// Every option can be set through the environment (or a `.env` file):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | redb files and logs |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | PRINTER_HOST | 192.168.1.19 | receipt printer host |
/// | PRINTER_PORT | 9100 | raw printing port |
/// | PRINTER_TIMEOUT_MS | 5000 | connect/write timeout |
/// | PRINTER_SETTLE_MS | 1000 | delay before closing the socket |
/// | PRINTER_CHARSET | utf8 | `utf8` or `cp1252` |
/// | PRINTER_OPEN_DRAWER | false | kick the cash drawer on every receipt |
/// | POLL_INTERVAL_MS | 30000 | dispatcher tick interval |
/// | FEED_URL | - | remote order feed, local store when unset |
/// | DISPATCHER_ENABLED | true | run the dispatcher in this process |
/// | ORDER_RETENTION_MINS | 120 | order retention and feed window |
/// | LEDGER_CAPACITY | 1000 | printed-order ledger size |
/// | TIMEZONE | Europe/Amsterdam | receipt clock |
/// | LOG_LEVEL | info | log filter |
/// | LOG_DIR | - | daily rolling log files |
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Working directory for databases
    #[arg(long, env = "WORK_DIR", default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// HTTP API port
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    #[arg(long, env = "PRINTER_HOST", default_value = DEFAULT_PRINTER_HOST)]
    pub printer_host: String,

    #[arg(long, env = "PRINTER_PORT", default_value_t = DEFAULT_PRINTER_PORT)]
    pub printer_port: u16,

    #[arg(long, env = "PRINTER_TIMEOUT_MS", default_value_t = DEFAULT_PRINTER_TIMEOUT_MS)]
    pub printer_timeout_ms: u64,

    #[arg(long, env = "PRINTER_SETTLE_MS", default_value_t = DEFAULT_PRINTER_SETTLE_MS)]
    pub printer_settle_ms: u64,

    /// Character table for receipt text
    #[arg(long, env = "PRINTER_CHARSET", default_value = "utf8")]
    pub printer_charset: Charset,

    /// Kick the cash drawer before each cut
    #[arg(
        long,
        env = "PRINTER_OPEN_DRAWER",
        default_value_t = false,
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub printer_open_drawer: bool,

    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Base URL of another instance's order API; the local store is used when unset
    #[arg(long, env = "FEED_URL")]
    pub feed_url: Option<String>,

    #[arg(
        long,
        env = "DISPATCHER_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub dispatcher_enabled: bool,

    #[arg(long, env = "ORDER_RETENTION_MINS", default_value_t = DEFAULT_ORDER_RETENTION_MINS)]
    pub order_retention_mins: u64,

    #[arg(long, env = "LEDGER_CAPACITY", default_value_t = DEFAULT_LEDGER_CAPACITY)]
    pub ledger_capacity: usize,

    /// IANA timezone for receipt timestamps
    #[arg(long, env = "TIMEZONE", default_value = DEFAULT_TIMEZONE, value_parser = parse_timezone)]
    pub timezone: Tz,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Invalid FEED_URL '{0}': must start with http:// or https://")]
    FeedUrl(String),

    #[error("Invalid printer address: {0}")]
    Printer(#[from] station_printer::PrintError),
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

impl Config {
    /// Configuration with every default, rooted at `work_dir` (tests, embedding)
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: DEFAULT_HTTP_PORT,
            printer_host: DEFAULT_PRINTER_HOST.to_string(),
            printer_port: DEFAULT_PRINTER_PORT,
            printer_timeout_ms: DEFAULT_PRINTER_TIMEOUT_MS,
            printer_settle_ms: DEFAULT_PRINTER_SETTLE_MS,
            printer_charset: Charset::Utf8,
            printer_open_drawer: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            feed_url: None,
            dispatcher_enabled: true,
            order_retention_mins: DEFAULT_ORDER_RETENTION_MINS,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            timezone: chrono_tz::Europe::Amsterdam,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }

    /// Reject values that parse but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("POLL_INTERVAL_MS"));
        }
        if self.order_retention_mins == 0 {
            return Err(ConfigError::Zero("ORDER_RETENTION_MINS"));
        }
        if self.ledger_capacity == 0 {
            return Err(ConfigError::Zero("LEDGER_CAPACITY"));
        }
        if self.printer_timeout_ms == 0 {
            return Err(ConfigError::Zero("PRINTER_TIMEOUT_MS"));
        }
        if let Some(url) = &self.feed_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::FeedUrl(url.clone()));
        }
        station_printer::NetworkPrinter::new(&self.printer_host, self.printer_port)?;
        Ok(())
    }

    pub fn orders_db_path(&self) -> PathBuf {
        self.work_dir.join(ORDERS_DB_FILE)
    }

    pub fn ledger_db_path(&self) -> PathBuf {
        self.work_dir.join(LEDGER_DB_FILE)
    }

    pub fn printer_timeout(&self) -> Duration {
        Duration::from_millis(self.printer_timeout_ms)
    }

    pub fn printer_settle_delay(&self) -> Duration {
        Duration::from_millis(self.printer_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Orders older than this are neither fed to the dispatcher nor kept
    pub fn retention(&self) -> chrono::Duration {
        let mins = i64::try_from(self.order_retention_mins)
            .unwrap_or(MAX_RETENTION_MINS)
            .min(MAX_RETENTION_MINS);
        chrono::Duration::minutes(mins)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WORK_DIR             = {}", self.work_dir.display())?;
        writeln!(f, "HTTP_PORT            = {}", self.http_port)?;
        writeln!(f, "PRINTER_HOST         = {}", self.printer_host)?;
        writeln!(f, "PRINTER_PORT         = {}", self.printer_port)?;
        writeln!(f, "PRINTER_TIMEOUT_MS   = {}", self.printer_timeout_ms)?;
        writeln!(f, "PRINTER_SETTLE_MS    = {}", self.printer_settle_ms)?;
        writeln!(f, "PRINTER_CHARSET      = {}", self.printer_charset)?;
        writeln!(f, "PRINTER_OPEN_DRAWER  = {}", self.printer_open_drawer)?;
        writeln!(f, "POLL_INTERVAL_MS     = {}", self.poll_interval_ms)?;
        writeln!(
            f,
            "FEED_URL             = {}",
            self.feed_url.as_deref().unwrap_or("(local store)")
        )?;
        writeln!(f, "DISPATCHER_ENABLED   = {}", self.dispatcher_enabled)?;
        writeln!(f, "ORDER_RETENTION_MINS = {}", self.order_retention_mins)?;
        writeln!(f, "LEDGER_CAPACITY      = {}", self.ledger_capacity)?;
        writeln!(f, "TIMEZONE             = {}", self.timezone.name())?;
        writeln!(f, "LOG_LEVEL            = {}", self.log_level)?;
        write!(
            f,
            "LOG_DIR              = {}",
            self.log_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(stdout only)".to_string())
        )
    }
}
