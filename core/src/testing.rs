pub mod compare;
pub mod process;
pub mod result;
pub mod runner;
pub mod sample;

pub use compare::{compare, ComparisonOutcome};
pub use process::{ExecError, ExecutionResult, ProcessRegistry, ProcessRunner};
pub use result::*;
pub use runner::*;
pub use sample::{save_samples, Sample, SampleData};
