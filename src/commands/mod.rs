//! Command implementations for the CLI binary.

mod cluster;
mod info;

pub use cluster::{
    execute_density, execute_instr, execute_trace, validate_trace_args, DensityArgs, InstrArgs,
    TraceArgs,
};
pub use info::{
    execute_invocation, execute_representative, execute_summary, InvocationArgs,
    RepresentativeArgs, SummaryArgs,
};
