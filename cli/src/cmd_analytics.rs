//! Offline aggregation over a crawled `events.json`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use starkindex_core::analytics::{caller_leaderboard, leaderboard, map_class_attributes, occurrences};
use starkindex_core::{DecodedRecord, EventKind};
use starkindex_storage::read_records;

async fn load(input: &Path) -> Result<Vec<DecodedRecord>> {
    let records = read_records(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    tracing::debug!(input = %input.display(), records = records.len(), "loaded records");
    Ok(records)
}

/// Print to stdout, or write pretty JSON to `output`.
async fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        None => crate::print_json(value),
        Some(path) => {
            let bytes = serde_json::to_vec_pretty(value)?;
            tokio::fs::write(path, bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(output = %path.display(), "wrote results");
            Ok(())
        }
    }
}

/// Per-kind leaderboard, or a caller leaderboard over every record when no
/// filter is given.
pub async fn run_leaderboard(
    input: &Path,
    event_filter: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let records = load(input).await?;
    let entries = match event_filter {
        Some(name) => leaderboard(&records, name.parse::<EventKind>()?),
        None => caller_leaderboard(&records),
    };
    emit(&entries, output).await
}

pub async fn run_occurrences(input: &Path, by: &str, output: Option<&Path>) -> Result<()> {
    let records = load(input).await?;
    let rows: Vec<Value> = occurrences(&records, by)
        .iter()
        .map(|o| o.to_json(by))
        .collect();
    emit(&rows, output).await
}

pub async fn run_attributes(input: &Path, output: Option<&Path>) -> Result<()> {
    let records = load(input).await?;
    emit(&map_class_attributes(&records)?, output).await
}
