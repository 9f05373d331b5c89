//! Input records: one agent per line, `<symbol> <preparation> <usage>`.
//!
//! Symbols are `e`/`E` (east) and `w`/`W` (west), upper case meaning
//! expedited. Durations are positive tick counts. Blank lines and lines
//! starting with `#` are skipped; anything else malformed is fatal.

use std::path::Path;

use tracing::debug;

use crossing_core::{AgentSpec, CrossingError};

/// Parses records into agent specs, ids assigned in input order.
pub fn parse_records(input: &str, max_agents: usize) -> Result<Vec<AgentSpec>, CrossingError> {
    let mut specs = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [symbol, preparation, usage] = fields.as_slice() else {
            return Err(config_error(
                line,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        };

        let mut chars = symbol.chars();
        let (direction, priority) = match (chars.next(), chars.next()) {
            (Some(c), None) => AgentSpec::decode_symbol(c),
            _ => None,
        }
        .ok_or_else(|| config_error(line, format!("unknown direction symbol '{symbol}'")))?;

        let preparation = parse_ticks(line, "preparation", preparation)?;
        let usage = parse_ticks(line, "usage", usage)?;

        specs.push(AgentSpec::new(specs.len(), direction, priority, preparation, usage));
    }

    if specs.len() > max_agents {
        return Err(CrossingError::Capacity {
            count: specs.len(),
            max: max_agents,
        });
    }

    debug!(agents = specs.len(), "parsed records");
    Ok(specs)
}

/// Reads and parses a record file.
pub fn load_records<P: AsRef<Path>>(
    path: P,
    max_agents: usize,
) -> Result<Vec<AgentSpec>, CrossingError> {
    let content = std::fs::read_to_string(path)?;
    parse_records(&content, max_agents)
}

fn parse_ticks(line: usize, field: &str, raw: &str) -> Result<u32, CrossingError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| config_error(line, format!("{field} '{raw}' is not an integer")))?;
    if value <= 0 {
        return Err(config_error(
            line,
            format!("{field} must be positive, got {value}"),
        ));
    }
    u32::try_from(value).map_err(|_| config_error(line, format!("{field} {value} is too large")))
}

fn config_error(line: usize, reason: String) -> CrossingError {
    CrossingError::Config { line, reason }
}
