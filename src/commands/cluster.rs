//! Clustering command implementations.
//!
//! Each command:
//! 1. Validates its parameters (fail fast, before any computation)
//! 2. Ingests the input (binary trace or performance CSV)
//! 3. Runs the selected clustering strategy
//! 4. Writes the result document

use crate::cluster::{
    dbscan_instr, dbscan_precomputed, estimate_epsilon_by_coverage, instr_ipc_density,
    AdaptiveParams, GridParams,
};
use crate::distance::{disjoint_sets, DistanceEngine};
use crate::metrics::load_invocations_from_file;
use crate::trace::TraceStore;
use crate::utils::config::DEFAULT_MIN_SAMPLES;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Arguments for the `trace` command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct TraceArgs {
    /// Input binary traces, analyzed one after another
    pub trace_files: Vec<PathBuf>,

    /// Worker count for the distance-matrix build
    pub num_threads: usize,

    /// Skip traces whose matrix estimate exceeds this budget (MiB)
    pub max_memory: Option<usize>,

    /// Fixed epsilon; estimated from coverage when absent
    pub epsilon: Option<f64>,

    /// Coverage fraction for epsilon estimation
    pub coverage: f64,

    /// Output path for the result document
    pub output: PathBuf,
}

/// Validate trace-command parameters before any work begins
///
/// **Public** - called from main.rs right after argument parsing
pub fn validate_trace_args(args: &TraceArgs) -> Result<()> {
    if args.num_threads < 1 {
        bail!("Number of threads should be >= 1");
    }
    if let Some(max_memory) = args.max_memory {
        if max_memory < 1 {
            bail!("Max memory should be >= 1");
        }
    }
    if let Some(epsilon) = args.epsilon {
        if epsilon <= 0.0 {
            bail!("Epsilon should be > 0");
        }
    }
    if !(args.coverage > 0.0 && args.coverage <= 1.0) {
        bail!("Coverage should be in (0,1] range");
    }
    Ok(())
}

/// Execute the `trace` command over a batch of trace files
///
/// **Public** - main entry point called from main.rs
///
/// A trace whose distance-matrix estimate exceeds the memory budget is
/// skipped with a warning and the batch continues; every other failure
/// aborts the run.
pub fn execute_trace(args: TraceArgs) -> Result<()> {
    let multiple = args.trace_files.len() > 1;

    for trace_file in &args.trace_files {
        info!("Analyzing trace {}", trace_file.display());

        let mut store = TraceStore::from_file(trace_file)
            .with_context(|| format!("Failed to ingest trace {}", trace_file.display()))?;

        if let Some(max_memory) = args.max_memory {
            let needed = store.estimate_needed_memory() / (1024 * 1024);
            if needed > max_memory {
                warn!(
                    "Need more memory than allowed to process trace: {} out of {} MiB",
                    needed, max_memory
                );
                continue;
            }
        }

        info!(
            "Clustering {} invocations ({} sets)",
            store.invocation_count(),
            store.invocation_set_count()
        );

        let invocation_sets = store.invocation_set_ids();

        // The matrix is O(n²); free the raw invocation list first
        store.release_invocations();

        let mut engine = DistanceEngine::new(args.num_threads);
        let matrix = engine
            .compute(store.invocation_sets(), disjoint_sets)
            .context("Failed to compute distance matrix")?;

        let epsilon = match args.epsilon {
            Some(epsilon) => epsilon,
            None => estimate_epsilon_by_coverage(matrix, args.coverage)
                .context("Failed to estimate epsilon")?,
        };

        let result = dbscan_precomputed(matrix, epsilon, DEFAULT_MIN_SAMPLES, invocation_sets)
            .context("Clustering failed")?;

        let output = output_path_for(&args.output, trace_file, multiple);
        result
            .to_file(&output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Results written to {}", output.display());
    }

    Ok(())
}

/// Per-trace output path: batches get the trace stem prefixed so results
/// do not overwrite each other
///
/// **Private** - internal helper for execute_trace
fn output_path_for(output: &Path, trace_file: &Path, multiple: bool) -> PathBuf {
    if !multiple {
        return output.to_path_buf();
    }

    let stem = trace_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("trace");
    let name = output
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("clusters.json");
    output.with_file_name(format!("{}.{}", stem, name))
}

/// Arguments for the `instr` command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct InstrArgs {
    /// Input performance CSV
    pub perf_invok_csv: PathBuf,

    /// Strategy tuning knobs
    pub params: AdaptiveParams,

    /// Output path for the result document
    pub output: PathBuf,
}

/// Execute the `instr` command
///
/// **Public** - main entry point called from main.rs
pub fn execute_instr(args: InstrArgs) -> Result<()> {
    args.params
        .validate()
        .context("Invalid instr parameters")?;

    let invocations = load_invocations_from_file(&args.perf_invok_csv).with_context(|| {
        format!(
            "Failed to load performance CSV {}",
            args.perf_invok_csv.display()
        )
    })?;

    let result = dbscan_instr(&invocations, &args.params).context("Clustering failed")?;

    result
        .to_file(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Results written to {}", args.output.display());

    Ok(())
}

/// Arguments for the `instr-ipc-density` command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct DensityArgs {
    /// Input performance CSV
    pub perf_invok_csv: PathBuf,

    /// Strategy tuning knobs
    pub params: GridParams,

    /// Output path for the result document
    pub output: PathBuf,
}

/// Execute the `instr-ipc-density` command
///
/// **Public** - main entry point called from main.rs
pub fn execute_density(args: DensityArgs) -> Result<()> {
    args.params
        .validate()
        .context("Invalid instr-ipc-density parameters")?;

    let invocations = load_invocations_from_file(&args.perf_invok_csv).with_context(|| {
        format!(
            "Failed to load performance CSV {}",
            args.perf_invok_csv.display()
        )
    })?;

    let result = instr_ipc_density(&invocations, &args.params).context("Clustering failed")?;

    result
        .to_file(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Results written to {}", args.output.display());

    Ok(())
}
