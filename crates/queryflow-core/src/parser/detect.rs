//! Dialect detection by syntax fingerprint scoring.
//!
//! Each dialect has weighted markers (quoting style, path operators,
//! proprietary clauses). The highest unique score above a threshold wins;
//! ties and weak signals return `None` so the orchestrator keeps the
//! requested dialect.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Dialect;

/// Minimum score a dialect must reach before we trust the guess.
const SCORE_THRESHOLD: u32 = 2;

struct Marker {
    dialect: Dialect,
    pattern: &'static str,
    weight: u32,
}

const MARKERS: &[Marker] = &[
    // T-SQL
    Marker { dialect: Dialect::Mssql, pattern: r"\[[A-Za-z_][\w ]*\]", weight: 3 },
    Marker { dialect: Dialect::Mssql, pattern: r"(?i)\bSELECT\s+TOP\s+\d+", weight: 3 },
    Marker { dialect: Dialect::Mssql, pattern: r"(?i)\bNOLOCK\b", weight: 3 },
    Marker { dialect: Dialect::Mssql, pattern: r"(?i)\bISNULL\s*\(", weight: 1 },
    Marker { dialect: Dialect::Mssql, pattern: r"(?i)\bGETDATE\s*\(", weight: 2 },
    // MySQL
    Marker { dialect: Dialect::Mysql, pattern: r"`[^`]+`", weight: 2 },
    Marker { dialect: Dialect::Mysql, pattern: r"(?i)\bLIMIT\s+\d+\s*,\s*\d+", weight: 2 },
    Marker { dialect: Dialect::Mysql, pattern: r"(?i)\bGROUP_CONCAT\s*\(", weight: 2 },
    Marker { dialect: Dialect::Mysql, pattern: r"(?i)\bSTRAIGHT_JOIN\b", weight: 3 },
    Marker { dialect: Dialect::Mysql, pattern: r"(?m)^\s*#", weight: 1 },
    // Postgres
    Marker { dialect: Dialect::Postgres, pattern: r"::\s*\w+", weight: 2 },
    Marker { dialect: Dialect::Postgres, pattern: r"(?i)\bILIKE\b", weight: 2 },
    Marker { dialect: Dialect::Postgres, pattern: r"->>?\s*'", weight: 2 },
    Marker { dialect: Dialect::Postgres, pattern: r"(?i)\bRETURNING\b", weight: 1 },
    // Snowflake
    Marker { dialect: Dialect::Snowflake, pattern: r"(?i)\bQUALIFY\b", weight: 3 },
    Marker { dialect: Dialect::Snowflake, pattern: r"(?i)\bFLATTEN\s*\(", weight: 3 },
    Marker { dialect: Dialect::Snowflake, pattern: r"(?i)\bLATERAL\s+FLATTEN", weight: 3 },
    // BigQuery
    Marker { dialect: Dialect::Bigquery, pattern: r"(?i)\bSTRUCT\s*<", weight: 3 },
    Marker { dialect: Dialect::Bigquery, pattern: r"(?i)\bUNNEST\s*\(", weight: 2 },
    Marker { dialect: Dialect::Bigquery, pattern: r"`[\w-]+\.[\w.-]+`", weight: 3 },
];

fn compiled_markers() -> &'static [(Dialect, Regex, u32)] {
    static COMPILED: OnceLock<Vec<(Dialect, Regex, u32)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        MARKERS
            .iter()
            .map(|marker| {
                let regex = Regex::new(marker.pattern).expect("marker regex is valid");
                (marker.dialect, regex, marker.weight)
            })
            .collect()
    })
}

/// Guesses the dialect from syntax markers, or `None` when no dialect
/// scores clearly above the rest.
pub(crate) fn detect_dialect(sql: &str) -> Option<Dialect> {
    let mut scores: Vec<(Dialect, u32)> = Vec::new();

    for (dialect, regex, weight) in compiled_markers() {
        if regex.is_match(sql) {
            match scores.iter_mut().find(|(d, _)| d == dialect) {
                Some((_, score)) => *score += weight,
                None => scores.push((*dialect, *weight)),
            }
        }
    }

    scores.sort_by(|a, b| b.1.cmp(&a.1));
    let (best, best_score) = *scores.first()?;
    if best_score < SCORE_THRESHOLD {
        return None;
    }
    // a tie is not a unique winner
    if scores.get(1).is_some_and(|(_, score)| *score == best_score) {
        return None;
    }
    Some(best)
}
