//! Request and configuration types.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SQL dialect for parsing and dialect-specific preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
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

impl Dialect {
    /// Maps to the corresponding sqlparser dialect implementation.
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{
            AnsiDialect, BigQueryDialect, ClickHouseDialect, DatabricksDialect, DuckDbDialect,
            GenericDialect, HiveDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
            RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
        };
        match self {
            Dialect::Generic => Box::new(GenericDialect {}),
            Dialect::Ansi => Box::new(AnsiDialect {}),
            Dialect::Bigquery => Box::new(BigQueryDialect {}),
            Dialect::Clickhouse => Box::new(ClickHouseDialect {}),
            Dialect::Databricks => Box::new(DatabricksDialect {}),
            Dialect::Duckdb => Box::new(DuckDbDialect {}),
            Dialect::Hive => Box::new(HiveDialect {}),
            Dialect::Mssql => Box::new(MsSqlDialect {}),
            Dialect::Mysql => Box::new(MySqlDialect {}),
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
            Dialect::Snowflake => Box::new(SnowflakeDialect {}),
            Dialect::Sqlite => Box::new(SQLiteDialect {}),
        }
    }

    /// Canonical lowercase name, matching the serde representation.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Ansi => "ansi",
            Dialect::Bigquery => "bigquery",
            Dialect::Clickhouse => "clickhouse",
            Dialect::Databricks => "databricks",
            Dialect::Duckdb => "duckdb",
            Dialect::Hive => "hive",
            Dialect::Mssql => "mssql",
            Dialect::Mysql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Redshift => "redshift",
            Dialect::Snowflake => "snowflake",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Dialect::Generic),
            "ansi" => Ok(Dialect::Ansi),
            "bigquery" => Ok(Dialect::Bigquery),
            "clickhouse" => Ok(Dialect::Clickhouse),
            "databricks" => Ok(Dialect::Databricks),
            "duckdb" => Ok(Dialect::Duckdb),
            "hive" => Ok(Dialect::Hive),
            "mssql" | "tsql" => Ok(Dialect::Mssql),
            "mysql" => Ok(Dialect::Mysql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "redshift" => Ok(Dialect::Redshift),
            "snowflake" => Ok(Dialect::Snowflake),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}

/// Tunable limits and timeouts for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeOptions {
    /// Parse timeout in milliseconds; beyond this the regex fallback engages.
    pub parse_timeout_ms: u64,

    /// Maximum accepted input size; larger input is truncated and flagged.
    pub max_sql_size_bytes: usize,

    /// Maximum number of statements per batch before a count-limit error.
    pub max_query_count: usize,

    /// Maximum CTE/subquery nesting depth compiled into child sub-graphs.
    pub max_nesting_depth: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            parse_timeout_ms: 5000,
            max_sql_size_bytes: 1024 * 1024,
            max_query_count: 100,
            max_nesting_depth: 10,
        }
    }
}

/// A batch analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// SQL text, possibly containing multiple `;`-separated statements
    pub sql: String,

    /// Dialect to parse with
    #[serde(default)]
    pub dialect: Dialect,

    /// Limits and timeouts
    #[serde(default)]
    pub options: AnalyzeOptions,
}

impl AnalyzeRequest {
    pub fn new(sql: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            sql: sql.into(),
            dialect,
            options: AnalyzeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnalyzeOptions) -> Self {
        self.options = options;
        self
    }
}
