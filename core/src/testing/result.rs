use std::path::PathBuf;

use super::{compare::ComparisonOutcome, process::ExecutionResult, sample::Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum JudgeCode {
    AC,
    WA,
    RE,
    IE,
}

impl JudgeCode {
    pub const fn label(&self) -> &'static str {
        use JudgeCode::*;
        match self {
            AC => "Accepted",
            WA => "Wrong Answer",
            RE => "Runtime Error",
            IE => "Internal Error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum OutcomeDetail {
    None,
    /// Why the program is considered to have failed (exit status or spawn error).
    Failure(String),
    /// Where the diagnostic trace of an internal error was saved.
    TraceFile(PathBuf),
    /// The trace could not be saved either; this is the error itself.
    Unsaved(String),
}

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub sample: Sample,
    pub judge: JudgeCode,
    pub execution: Option<ExecutionResult>,
    pub comparison: Option<ComparisonOutcome>,
    pub input: Option<String>,
    pub detail: OutcomeDetail,
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        self.judge == JudgeCode::AC
    }
}
