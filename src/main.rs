//! Invok Cluster CLI
//!
//! Clusters program invocations from memory-access traces or per-invocation
//! performance counters, and inspects persisted clustering results.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use invok_cluster::cluster::{AdaptiveParams, GridParams};
use invok_cluster::commands::{
    execute_density, execute_instr, execute_invocation, execute_representative, execute_summary,
    execute_trace, validate_trace_args, DensityArgs, InstrArgs, InvocationArgs,
    RepresentativeArgs, SummaryArgs, TraceArgs,
};

/// Invok Cluster - invocation clustering for sampling-based analysis
#[derive(Parser, Debug)]
#[command(name = "invok-cluster")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster memory-access traces
    Trace {
        /// Input traces
        #[arg(required = true)]
        trace_files: Vec<PathBuf>,

        /// Number of threads to use during the clustering
        #[arg(short, long, default_value = "1")]
        num_threads: usize,

        /// Don't use more than this amount of memory (MiB) during clustering
        #[arg(long)]
        max_memory: Option<usize>,

        /// Epsilon parameter to pass to the density clusterer
        #[arg(short, long)]
        epsilon: Option<f64>,

        /// Clustering coverage, used to estimate epsilon if not provided
        #[arg(long, default_value = "0.9")]
        coverage: f64,

        /// Output file
        #[arg(short, long, default_value = "clusters.json")]
        output: PathBuf,
    },

    /// Cluster using retired instructions per invocation
    Instr {
        /// Captured performance CSV
        perf_invok_csv: PathBuf,

        /// Below this many distinct values, each value defines a cluster
        #[arg(long, default_value = "50")]
        uniq_value_threshold: usize,

        /// Normalized distance (%) under which two points are considered equal
        #[arg(long, default_value = "0.1")]
        minimum_distance_percentage: f64,

        /// Normalized distance (%) above which two points are in different clusters
        #[arg(long, default_value = "5")]
        maximum_distance_percentage: f64,

        /// Minimum points per cluster as % of the entire set of points
        #[arg(long, default_value = "1")]
        minimum_cluster_size_percentage: f64,

        /// Minimum number of clusters to define (goal, not always possible)
        #[arg(long, default_value = "10")]
        minimum_cluster_count: usize,

        /// Maximum number of clusters to define (goal, not always possible)
        #[arg(long, default_value = "50")]
        maximum_cluster_count: usize,

        /// Output file
        #[arg(short, long, default_value = "clusters.json")]
        output: PathBuf,
    },

    /// Cluster using retired instructions and IPC per invocation on a 2D density grid
    InstrIpcDensity {
        /// Captured performance CSV
        perf_invok_csv: PathBuf,

        /// Maximum number of clusters to define
        #[arg(long, default_value = "20")]
        max_clusters: usize,

        /// Minimum weight in % of total instructions to consider a cluster
        #[arg(long, default_value = "1")]
        min_clusters_weight_percentage: f64,

        /// Minimum target % of total instructions
        #[arg(long, default_value = "90")]
        target_coverage_percentage: f64,

        /// Top/bottom % of data points removed before clustering
        #[arg(long, default_value = "1")]
        outlier_percent: f64,

        /// Only apply outlier trimming above this many samples
        #[arg(long, default_value = "1000")]
        outlier_minsize_threshold: usize,

        /// Initial granularity (%) of the 2D grid
        #[arg(long, default_value = "1")]
        minimum_granularity_percentage: f64,

        /// Granularity increase (%) per round while converging
        #[arg(long, default_value = "1")]
        granularity_step_percentage: f64,

        /// Output file
        #[arg(short, long, default_value = "clusters.json")]
        output: PathBuf,
    },

    /// Inspect persisted clustering results
    Info {
        #[command(subcommand)]
        command: InfoCommands,
    },
}

/// Inspection subcommands
#[derive(Subcommand, Debug)]
enum InfoCommands {
    /// Give a summary of the clustering results
    Summary {
        /// Persisted clustering result
        cluster_file: PathBuf,

        /// Only provide information of the specified cluster
        #[arg(short, long)]
        cluster: Option<usize>,
    },

    /// Provide one or more representatives of each cluster and noise points
    Representative {
        /// Persisted clustering result
        cluster_file: PathBuf,

        /// Only provide representatives of noise points
        #[arg(short, long, conflicts_with = "cluster")]
        noise: bool,

        /// Only provide representatives of the specified cluster
        #[arg(short, long)]
        cluster: Option<usize>,

        /// Ignore the provided invocations in the selection process
        #[arg(short, long, num_args = 0..)]
        ignore: Vec<usize>,

        /// Seed for random selection (deterministic selection when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Provide more information of a particular invocation
    Invocation {
        /// Persisted clustering result
        cluster_file: PathBuf,

        /// Invocation id to look up
        invocation_id: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Trace {
            trace_files,
            num_threads,
            max_memory,
            epsilon,
            coverage,
            output,
        } => {
            let args = TraceArgs {
                trace_files,
                num_threads,
                max_memory,
                epsilon,
                coverage,
                output,
            };

            validate_trace_args(&args)?;
            execute_trace(args)?;
        }

        Commands::Instr {
            perf_invok_csv,
            uniq_value_threshold,
            minimum_distance_percentage,
            maximum_distance_percentage,
            minimum_cluster_size_percentage,
            minimum_cluster_count,
            maximum_cluster_count,
            output,
        } => {
            let args = InstrArgs {
                perf_invok_csv,
                params: AdaptiveParams {
                    uniq_value_threshold,
                    min_distance_pct: minimum_distance_percentage,
                    max_distance_pct: maximum_distance_percentage,
                    min_cluster_size_pct: minimum_cluster_size_percentage,
                    min_cluster_count: minimum_cluster_count,
                    max_cluster_count: maximum_cluster_count,
                },
                output,
            };

            execute_instr(args)?;
        }

        Commands::InstrIpcDensity {
            perf_invok_csv,
            max_clusters,
            min_clusters_weight_percentage,
            target_coverage_percentage,
            outlier_percent,
            outlier_minsize_threshold,
            minimum_granularity_percentage,
            granularity_step_percentage,
            output,
        } => {
            let args = DensityArgs {
                perf_invok_csv,
                params: GridParams {
                    max_clusters,
                    min_weight_pct: min_clusters_weight_percentage,
                    target_coverage_pct: target_coverage_percentage,
                    outlier_pct: outlier_percent,
                    outlier_minsize_threshold,
                    min_granularity_pct: minimum_granularity_percentage,
                    granularity_step_pct: granularity_step_percentage,
                },
                output,
            };

            execute_density(args)?;
        }

        Commands::Info { command } => match command {
            InfoCommands::Summary {
                cluster_file,
                cluster,
            } => {
                execute_summary(SummaryArgs {
                    cluster_file,
                    cluster,
                })?;
            }

            InfoCommands::Representative {
                cluster_file,
                noise,
                cluster,
                ignore,
                seed,
            } => {
                execute_representative(RepresentativeArgs {
                    cluster_file,
                    noise,
                    cluster,
                    ignore,
                    seed,
                })?;
            }

            InfoCommands::Invocation {
                cluster_file,
                invocation_id,
            } => {
                execute_invocation(InvocationArgs {
                    cluster_file,
                    invocation_id,
                })?;
            }
        },
    }

    Ok(())
}
