//! Performance CSV ingestion.
//!
//! Reads the per-invocation counter CSV produced by the perf-invok capture
//! tool. The header names carry leading spaces (a quirk of the producer)
//! and must match verbatim; field values are trimmed before parsing.

use crate::metrics::{MeasuredInvocation, PerformanceMetrics};
use crate::utils::config::{
    COL_CACHE_MISSES, COL_CYCLES, COL_INSTRUCTIONS, COL_MEM_INSTRUCTIONS, COL_TIME_ELAPSED,
};
use crate::utils::error::MetricsError;
use log::debug;
use std::path::Path;

/// Column positions resolved from the CSV header
///
/// **Private** - one lookup per file, then O(1) per row.
struct ColumnIndexes {
    time_us: usize,
    instructions: usize,
    cycles: usize,
    mem_instructions: usize,
    cache_misses: usize,
}

impl ColumnIndexes {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, MetricsError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(MetricsError::MissingColumn(name))
        };

        Ok(Self {
            time_us: find(COL_TIME_ELAPSED)?,
            instructions: find(COL_INSTRUCTIONS)?,
            cycles: find(COL_CYCLES)?,
            mem_instructions: find(COL_MEM_INSTRUCTIONS)?,
            cache_misses: find(COL_CACHE_MISSES)?,
        })
    }
}

/// Load per-invocation counters from a perf-invok CSV file
///
/// **Public** - entry point for the metric-based clustering strategies
///
/// # Returns
/// One record per invocation, indexed by row order starting at 0
///
/// # Errors
/// * `MetricsError::ReadFailed` - I/O or CSV framing error
/// * `MetricsError::MissingColumn` - a required header is absent
/// * `MetricsError::InvalidValue` - a field does not parse as an integer
pub fn load_invocations_from_file(
    path: impl AsRef<Path>,
) -> Result<Vec<MeasuredInvocation>, MetricsError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let columns = ColumnIndexes::from_headers(reader.headers()?)?;

    let mut invocations = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let field = |column: usize, name: &'static str| parse_counter(&record, column, name, index);

        invocations.push(MeasuredInvocation {
            index,
            metrics: PerformanceMetrics {
                time_us: field(columns.time_us, COL_TIME_ELAPSED)?,
                instructions: field(columns.instructions, COL_INSTRUCTIONS)?,
                cycles: field(columns.cycles, COL_CYCLES)?,
                mem_instructions: field(columns.mem_instructions, COL_MEM_INSTRUCTIONS)?,
                cache_misses: field(columns.cache_misses, COL_CACHE_MISSES)?,
            },
        });
    }

    debug!(
        "Loaded {} invocations from {}",
        invocations.len(),
        path.display()
    );

    Ok(invocations)
}

/// Parse one counter field, tolerating the producer's space padding
///
/// **Private** - internal helper for load_invocations_from_file
fn parse_counter(
    record: &csv::StringRecord,
    column: usize,
    name: &'static str,
    row: usize,
) -> Result<u64, MetricsError> {
    let raw = record.get(column).unwrap_or("");
    raw.trim().parse::<u64>().map_err(|_| MetricsError::InvalidValue {
        row,
        column: name,
        value: raw.to_string(),
    })
}
