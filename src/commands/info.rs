//! Result-inspection command implementations.
//!
//! Reads a persisted clustering result and answers summary, representative,
//! and membership queries without re-running any clustering.

use crate::result::{ClusterAssignment, ClusteringInformation};
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Arguments for `info summary`
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct SummaryArgs {
    /// Persisted clustering result
    pub cluster_file: PathBuf,

    /// Restrict the summary to one cluster
    pub cluster: Option<usize>,
}

/// Print a summary of a clustering result
///
/// **Public** - main entry point called from main.rs
pub fn execute_summary(args: SummaryArgs) -> Result<()> {
    let info = load(&args.cluster_file)?;

    let Some(cluster) = args.cluster else {
        match info.epsilon() {
            Some(epsilon) => println!("Epsilon parameter: {}", epsilon),
            None => println!("Epsilon parameter: none"),
        }
        println!(
            "Invocation count: {} (in {} sets)",
            info.invocation_count(),
            info.invocation_set_count()
        );
        println!("Cluster count: {}", info.cluster_count());
        println!(
            "Noise invocations: {} (in {} sets)",
            info.noise_invocation_count(),
            info.noise_invocation_set_count()
        );
        println!(
            "Instruction coverage: {:.2} %",
            info.instruction_coverage(None)
        );
        println!(
            "Invocation coverage: {:.2} %",
            info.invocation_coverage(None)
        );
        return Ok(());
    };

    if cluster >= info.cluster_count() {
        bail!(
            "Wrong cluster. Valid cluster range [0,{})",
            info.cluster_count()
        );
    }

    println!("Cluster id: {}", cluster);
    println!(
        "Invocation count: {}",
        info.invocation_count_in_cluster(cluster)
    );
    println!(
        "Instruction coverage: {:.2} %",
        info.instruction_coverage(Some(cluster))
    );
    println!(
        "Invocation coverage: {:.2} %",
        info.invocation_coverage(Some(cluster))
    );
    println!(
        "Instructions: {:.0}",
        info.extra_cluster_metric(cluster, "instructions")
    );
    println!("Cycles: {:.0}", info.extra_cluster_metric(cluster, "cycles"));
    println!("IPC: {:.2}", info.extra_cluster_metric(cluster, "ipc"));

    Ok(())
}

/// Arguments for `info representative`
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RepresentativeArgs {
    /// Persisted clustering result
    pub cluster_file: PathBuf,

    /// Only emit representatives of noise sets
    pub noise: bool,

    /// Only emit the representative of this cluster
    pub cluster: Option<usize>,

    /// Invocation ids excluded from selection
    pub ignore: Vec<usize>,

    /// Seed for random selection; deterministic first-member selection
    /// when absent
    pub seed: Option<u64>,
}

/// Print representative invocations for clusters and/or noise sets
///
/// **Public** - main entry point called from main.rs
pub fn execute_representative(args: RepresentativeArgs) -> Result<()> {
    let info = load(&args.cluster_file)?;
    let mut rng = args.seed.map(StdRng::seed_from_u64);

    if let Some(cluster) = args.cluster {
        if cluster >= info.cluster_count() {
            bail!(
                "Wrong cluster. Valid cluster range [0,{})",
                info.cluster_count()
            );
        }
        if let Some(id) = pick_cluster(&info, cluster, &args.ignore, rng.as_mut()) {
            println!("{}", id);
        }
        return Ok(());
    }

    if args.noise {
        for id in pick_noise(&info, &args.ignore, rng.as_mut()) {
            println!("{}", id);
        }
        return Ok(());
    }

    for cluster in 0..info.cluster_count() {
        if let Some(id) = pick_cluster(&info, cluster, &args.ignore, rng.as_mut()) {
            println!("{}", id);
        }
    }
    for id in pick_noise(&info, &args.ignore, rng.as_mut()) {
        println!("{}", id);
    }

    Ok(())
}

/// Cluster representative: seeded-random or deterministic first member
///
/// **Private** - internal helper for execute_representative
fn pick_cluster(
    info: &ClusteringInformation,
    cluster: usize,
    ignore: &[usize],
    rng: Option<&mut StdRng>,
) -> Option<usize> {
    match rng {
        Some(rng) => info.random_invocation_in_cluster(cluster, ignore, rng),
        None => info.invocation_in_cluster(cluster, ignore),
    }
}

/// Noise representatives: seeded-random or deterministic first members
///
/// **Private** - internal helper for execute_representative
fn pick_noise(
    info: &ClusteringInformation,
    ignore: &[usize],
    rng: Option<&mut StdRng>,
) -> Vec<usize> {
    match rng {
        Some(rng) => info.random_noise_invocations(ignore, rng),
        None => info.noise_representatives(ignore),
    }
}

/// Arguments for `info invocation`
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct InvocationArgs {
    /// Persisted clustering result
    pub cluster_file: PathBuf,

    /// Invocation id to look up
    pub invocation_id: usize,
}

/// Print where one invocation ended up
///
/// **Public** - main entry point called from main.rs
pub fn execute_invocation(args: InvocationArgs) -> Result<()> {
    let info = load(&args.cluster_file)?;

    match info.cluster_id_for_invocation(args.invocation_id) {
        None => println!("Invocation {} doesn't exist", args.invocation_id),
        Some(ClusterAssignment::Noise) => {
            println!("Invocation {} is a noise point", args.invocation_id)
        }
        Some(ClusterAssignment::Cluster(cluster)) => println!(
            "Invocation {} belongs to cluster {}",
            args.invocation_id, cluster
        ),
    }

    Ok(())
}

/// Load a result file with context
///
/// **Private** - shared by all info subcommands
fn load(path: &Path) -> Result<ClusteringInformation> {
    ClusteringInformation::from_file(path)
        .with_context(|| format!("Failed to read cluster file {}", path.display()))
}
