//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// QueryFlow - SQL flow graph analyzer
#[derive(Parser, Debug)]
#[command(name = "queryflow")]
#[command(about = "Compile SQL statements into flow graphs with stats and hints", long_about = None)]
#[command(version)]
pub struct Args {
    /// SQL files to analyze (reads from stdin if none provided)
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Analyze this SQL string instead of files/stdin
    #[arg(short, long, value_name = "SQL", conflicts_with = "files")]
    pub execute: Option<String>,

    /// SQL dialect
    #[arg(short, long, default_value = "generic", value_enum)]
    pub dialect: DialectArg,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Parse timeout per statement, in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Suppress hints in table output
    #[arg(short, long)]
    pub quiet: bool,
}

/// SQL dialect options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Generic,
    Ansi,
    Bigquery,
    Clickhouse,
    Databricks,
    Duckdb,
    Hive,
    Mssql,
    Mysql,
    Postgres,
    Redshift,
    Snowflake,
    Sqlite,
}

impl From<DialectArg> for queryflow_core::Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Generic => queryflow_core::Dialect::Generic,
            DialectArg::Ansi => queryflow_core::Dialect::Ansi,
            DialectArg::Bigquery => queryflow_core::Dialect::Bigquery,
            DialectArg::Clickhouse => queryflow_core::Dialect::Clickhouse,
            DialectArg::Databricks => queryflow_core::Dialect::Databricks,
            DialectArg::Duckdb => queryflow_core::Dialect::Duckdb,
            DialectArg::Hive => queryflow_core::Dialect::Hive,
            DialectArg::Mssql => queryflow_core::Dialect::Mssql,
            DialectArg::Mysql => queryflow_core::Dialect::Mysql,
            DialectArg::Postgres => queryflow_core::Dialect::Postgres,
            DialectArg::Redshift => queryflow_core::Dialect::Redshift,
            DialectArg::Snowflake => queryflow_core::Dialect::Snowflake,
            DialectArg::Sqlite => queryflow_core::Dialect::Sqlite,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary table
    Table,
    /// Full JSON result
    Json,
}
