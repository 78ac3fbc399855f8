//! QueryFlow command-line interface.

mod cli;
mod input;
mod output;

use anyhow::Result;
use clap::Parser;
use queryflow_core::{analyze, AnalyzeOptions, AnalyzeRequest};
use std::process::ExitCode;

use cli::{Args, OutputFormat};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    let sql = input::read_input(args.execute.as_deref(), &args.files)?;

    let mut options = AnalyzeOptions::default();
    if let Some(timeout_ms) = args.timeout_ms {
        options.parse_timeout_ms = timeout_ms;
    }
    let request = AnalyzeRequest::new(sql, args.dialect.into()).with_options(options);
    let result = analyze(&request);

    match args.format {
        OutputFormat::Json => println!("{}", output::format_json(&result, args.compact)?),
        OutputFormat::Table => print!("{}", output::format_table(&result, args.quiet)),
    }

    if result.error_count > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
