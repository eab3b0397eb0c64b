//! Per-invocation performance counters.

mod loader;

pub use loader::load_invocations_from_file;

/// Raw hardware counters for one invocation.
///
/// The five counters are never mutated after construction; the two derived
/// ratios are computed on demand. Aggregation sums raw counters and
/// recomputes ratios from the sums, never averaging ratios directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerformanceMetrics {
    /// Elapsed wall time in microseconds
    pub time_us: u64,

    /// Retired instructions
    pub instructions: u64,

    /// CPU cycles
    pub cycles: u64,

    /// Retired memory instructions
    pub mem_instructions: u64,

    /// Data-cache misses
    pub cache_misses: u64,
}

impl PerformanceMetrics {
    /// Instructions per cycle; 0.0 when no cycles were recorded
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.instructions as f64 / self.cycles as f64
    }

    /// Data-cache miss rate; 0.0 when no memory instructions were recorded
    pub fn miss_rate(&self) -> f64 {
        if self.mem_instructions == 0 {
            return 0.0;
        }
        self.cache_misses as f64 / self.mem_instructions as f64
    }

    /// Sum raw counters over a group of invocations
    ///
    /// **Public** - used for per-cluster averages; derived ratios of the
    /// result reflect the summed counters.
    pub fn aggregate<'a, I>(metrics: I) -> PerformanceMetrics
    where
        I: IntoIterator<Item = &'a PerformanceMetrics>,
    {
        let mut total = PerformanceMetrics::default();

        for m in metrics {
            total.time_us += m.time_us;
            total.instructions += m.instructions;
            total.cycles += m.cycles;
            total.mem_instructions += m.mem_instructions;
            total.cache_misses += m.cache_misses;
        }

        total
    }
}

/// One invocation of the measured region, with its counters.
#[derive(Debug, Clone, Copy)]
pub struct MeasuredInvocation {
    /// Row order in the performance CSV, starting at 0
    pub index: usize,

    /// Counters captured for this invocation
    pub metrics: PerformanceMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc() {
        let m = PerformanceMetrics {
            instructions: 3000,
            cycles: 1500,
            ..Default::default()
        };
        assert_eq!(m.ipc(), 2.0);
    }

    #[test]
    fn test_ipc_zero_cycles() {
        let m = PerformanceMetrics {
            instructions: 100,
            ..Default::default()
        };
        assert_eq!(m.ipc(), 0.0);
    }

    #[test]
    fn test_miss_rate() {
        let m = PerformanceMetrics {
            mem_instructions: 200,
            cache_misses: 50,
            ..Default::default()
        };
        assert_eq!(m.miss_rate(), 0.25);
    }

    #[test]
    fn test_aggregate_sums_raw_counters() {
        let a = PerformanceMetrics {
            time_us: 10,
            instructions: 1000,
            cycles: 500,
            mem_instructions: 100,
            cache_misses: 10,
        };
        let b = PerformanceMetrics {
            time_us: 20,
            instructions: 3000,
            cycles: 1500,
            mem_instructions: 300,
            cache_misses: 30,
        };

        let total = PerformanceMetrics::aggregate([&a, &b]);

        assert_eq!(total.time_us, 30);
        assert_eq!(total.instructions, 4000);
        assert_eq!(total.cycles, 2000);
        // IPC is recomputed from the sums, not averaged
        assert_eq!(total.ipc(), 2.0);
        assert_eq!(total.miss_rate(), 0.1);
    }
}
