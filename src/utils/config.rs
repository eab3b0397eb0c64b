//! Configuration and constants for the clustering pipeline.

/// Sentinel word opening a new subtrace in the binary trace stream
pub const OPEN_SUBTRACE: i64 = -1;

/// Sentinel word closing the current subtrace
pub const CLOSE_SUBTRACE: i64 = -2;

/// Sentinel word closing the current invocation and opening the next
pub const CLOSE_INVOCATION: i64 = -3;

/// Bytes per element of the dense distance matrix (double precision)
pub const MATRIX_ELEMENT_BYTES: usize = 8;

/// Default DBSCAN core-point threshold (counts the point itself)
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Default coverage fraction used to estimate epsilon for trace clustering
pub const DEFAULT_COVERAGE: f64 = 0.9;

/// Hard depth bound for the adaptive scalar clusterer
pub const MAX_ADAPTIVE_DEPTH: usize = 10;

/// Divisor applied to epsilon and min_samples on a single-cluster retry
pub const EPSILON_SHRINK_DIVISOR: f64 = 10.0;

/// Noise fraction below which a single-cluster pass is considered collapsed
/// and worth retrying with tighter parameters
pub const SINGLE_CLUSTER_NOISE_FRACTION: f64 = 0.1;

/// Maximum number of points fed to knee detection; longer curves are
/// subsampled uniformly to keep the search cheap
pub const KNEE_CURVE_POINT_LIMIT: usize = 100_000;

// Column names of the perf-invok CSV format. The leading spaces are part of
// the on-disk header and must match verbatim.
pub const COL_TIME_ELAPSED: &str = " Time Elapsed (us)";
pub const COL_INSTRUCTIONS: &str = " Retired Instructions";
pub const COL_CYCLES: &str = "Cycles";
pub const COL_MEM_INSTRUCTIONS: &str = " Retired Memory Instructions";
pub const COL_CACHE_MISSES: &str = " Data Cache Misses";

/// JSON map key holding noise coverage in evaluation metadata
pub const NOISE_COVERAGE_KEY: &str = "-1";
