//! Input handling for file reading and stdin support.

use anyhow::{Context, Result};
use std::io::{self, Read};
use std::path::PathBuf;

/// Reads the SQL to analyze: the `-e` string, the given files concatenated,
/// or stdin when neither is present.
pub fn read_input(execute: Option<&str>, files: &[PathBuf]) -> Result<String> {
    if let Some(sql) = execute {
        return Ok(sql.to_string());
    }
    if files.is_empty() {
        read_from_stdin()
    } else {
        read_from_files(files)
    }
}

fn read_from_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;
    Ok(content)
}

fn read_from_files(files: &[PathBuf]) -> Result<String> {
    let mut combined = String::new();
    for path in files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        if !combined.is_empty() && !combined.trim_end().ends_with(';') {
            combined.push_str(";\n");
        }
        combined.push_str(&content);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_string_wins() {
        let sql = read_input(Some("SELECT 1"), &[]).unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[test]
    fn test_missing_file_errors() {
        let result = read_input(None, &[PathBuf::from("/nonexistent/file.sql")]);
        assert!(result.is_err());
    }
}
