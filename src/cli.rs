//! Command-line interface.

use crate::models::{EpsMode, Metric};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// A terminal journal for stock prices, EPS and valuation ratios.
///
/// Register tickers, record dated prices, keep an EPS profile per ticker
/// (fixed, forward estimate, or trailing twelve months from quarterly
/// figures) and watch PER/PBR move over time.
#[derive(Parser, Debug, Clone)]
#[command(name = "stonklog")]
#[command(author = "Thomas Vincent")]
#[command(version)]
#[command(about = "A terminal journal for stock prices, EPS and valuation ratios", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "STONKLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the stored data
    #[arg(long, global = true, env = "STONKLOG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output - log debug details to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register or list stocks
    #[command(subcommand)]
    Stock(StockCommand),

    /// Add, list or remove valuation records
    #[command(subcommand)]
    Record(RecordCommand),

    /// Inspect or edit a ticker's EPS profile
    #[command(subcommand)]
    Eps(EpsCommand),

    /// Write all data to a JSON file
    Export {
        /// Output file (default: stock-tracker-<date>.json)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with the contents of a JSON file
    Import {
        /// File previously written by `export`
        file: PathBuf,
    },

    /// Read price, EPS, BPS, PER and PBR from a screenshot
    Ocr {
        /// Image file
        image: PathBuf,
    },

    /// Show records and a chart of one metric
    View(ViewArgs),

    /// Show or create the configuration file
    Config {
        /// Write a sample config to the config path
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum StockCommand {
    /// Register a new ticker
    Add {
        /// Ticker code (stored uppercase)
        ticker: String,
        /// Display name
        name: String,
    },
    /// List registered tickers
    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecordCommand {
    /// Record a dated price
    Add(RecordAddArgs),
    /// List records, oldest first
    List {
        /// Only this ticker
        #[arg(short = 't', long)]
        ticker: Option<String>,
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete a record by id
    Remove {
        id: String,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RecordAddArgs {
    /// Ticker code
    #[arg(short = 't', long)]
    pub ticker: String,

    /// Observation date (YYYY-MM-DD)
    #[arg(short = 'd', long)]
    pub date: String,

    /// Share price; read from --image when omitted
    #[arg(short = 'p', long)]
    pub price: Option<f64>,

    /// Book value per share
    #[arg(long)]
    pub bps: Option<f64>,

    /// Free-form note
    #[arg(short = 'm', long, default_value = "")]
    pub memo: String,

    /// Screenshot to read a missing price or BPS from (scanned only when one is missing)
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EpsCommand {
    /// Show the profile and the EPS it resolves to
    Show {
        ticker: String,
    },
    /// Change mode or values
    Set(EpsSetArgs),
    /// Add or overwrite one quarter's EPS
    Quarter {
        ticker: String,
        /// Fiscal quarter, e.g. 2024Q3
        quarter: String,
        #[arg(allow_negative_numbers = true)]
        eps: f64,
    },
    /// Delete one quarter's EPS
    RemoveQuarter {
        ticker: String,
        quarter: String,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EpsSetArgs {
    pub ticker: String,

    /// Which EPS valuations use
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Fixed EPS value
    #[arg(long, allow_negative_numbers = true, conflicts_with = "clear_fixed")]
    pub fixed: Option<f64>,

    /// Forward EPS estimate
    #[arg(long, allow_negative_numbers = true, conflicts_with = "clear_forward")]
    pub forward: Option<f64>,

    /// Unset the fixed EPS
    #[arg(long)]
    pub clear_fixed: bool,

    /// Unset the forward EPS
    #[arg(long)]
    pub clear_forward: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ViewArgs {
    /// Start filtered to this ticker
    #[arg(short = 't', long)]
    pub ticker: Option<String>,

    /// Metric to chart (default from config)
    #[arg(short = 'M', long, value_enum)]
    pub metric: Option<MetricArg>,

    /// Batch mode - print once and exit
    #[arg(short = 'b', long)]
    pub batch: bool,

    /// Disable deleting from the view
    #[arg(long)]
    pub read_only: bool,
}

/// EPS mode options.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Use the fixed EPS
    Fixed,
    /// Sum of the latest four quarters
    Quarterly,
    /// Use the forward estimate
    Forward,
}

impl From<ModeArg> for EpsMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fixed => EpsMode::Fixed,
            ModeArg::Quarterly => EpsMode::Quarterly,
            ModeArg::Forward => EpsMode::Forward,
        }
    }
}

/// Chart metric options.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Price,
    Eps,
    Per,
    Pbr,
}

impl From<MetricArg> for Metric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Price => Metric::Price,
            MetricArg::Eps => Metric::Eps,
            MetricArg::Per => Metric::Per,
            MetricArg::Pbr => Metric::Pbr,
        }
    }
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text format
    Text,
    /// Comma-separated values (CSV)
    Csv,
    /// JavaScript Object Notation (JSON)
    Json,
}

impl From<OutputFormat> for crate::export::ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => crate::export::ExportFormat::Text,
            OutputFormat::Csv => crate::export::ExportFormat::Csv,
            OutputFormat::Json => crate::export::ExportFormat::Json,
        }
    }
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_add() {
        let args = Args::parse_from(["stonklog", "stock", "add", "7203", "Toyota Motor"]);
        match args.command {
            Command::Stock(StockCommand::Add { ticker, name }) => {
                assert_eq!(ticker, "7203");
                assert_eq!(name, "Toyota Motor");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_record_add_flags() {
        let args = Args::parse_from([
            "stonklog", "record", "add", "-t", "AAPL", "-d", "2024-05-01", "-p", "180.5", "-m", "post split",
        ]);
        let Command::Record(RecordCommand::Add(add)) = args.command else {
            panic!("expected record add");
        };
        assert_eq!(add.ticker, "AAPL");
        assert_eq!(add.price, Some(180.5));
        assert_eq!(add.memo, "post split");
        assert!(add.image.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["stonklog", "stock", "list", "--data-dir", "/tmp/d", "-v"]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/d")));
        assert!(args.verbose);
    }

    #[test]
    fn test_eps_set_negative_and_conflicts() {
        let args = Args::parse_from(["stonklog", "eps", "set", "X", "--mode", "forward", "--forward", "-1.5"]);
        let Command::Eps(EpsCommand::Set(set)) = args.command else {
            panic!("expected eps set");
        };
        assert!(matches!(set.mode, Some(ModeArg::Forward)));
        assert_eq!(set.forward, Some(-1.5));

        assert!(Args::try_parse_from(["stonklog", "eps", "set", "X", "--fixed", "1", "--clear-fixed"]).is_err());
    }

    #[test]
    fn test_invalid_price_rejected() {
        assert!(Args::try_parse_from(["stonklog", "record", "add", "-t", "X", "-d", "2024-01-01", "-p", "abc"]).is_err());
    }
}
