use std::str::FromStr as _;

use serde::Deserialize;

/// State of one judge test case as shown on the submission page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMarker {
    Accepted,
    Rejected,
    #[serde(alias = "empty")]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SubmissionSnapshot {
    /// `None` until the judge has published any test case.
    #[serde(default)]
    pub test_case_markers: Option<Vec<CaseMarker>>,
    #[serde(default)]
    pub overall_status: String,
    #[serde(default)]
    pub run_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Pending,
    Rejected,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, strum::EnumString, strum::IntoStaticStr)]
pub enum JudgeStatus {
    New,
    Compiling,
    Running,
    #[strum(serialize = "Waiting for compile")]
    WaitingForCompile,
    #[strum(serialize = "Waiting for run")]
    WaitingForRun,

    #[strum(serialize = "Compile Error")]
    CompileError,
    #[strum(serialize = "Wrong Answer")]
    WrongAnswer,
    #[strum(serialize = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[strum(serialize = "Judge Error")]
    JudgeError,
    #[strum(serialize = "Memory Limit Exceeded")]
    MemoryLimitExceeded,
    #[strum(serialize = "Output Limit Exceeded")]
    OutputLimitExceeded,
    #[strum(serialize = "Illegal Function")]
    IllegalFunction,
    #[strum(serialize = "Run-Time Error")]
    RunTimeError,

    Accepted,

    #[strum(default)]
    Unknown(String),
}

impl JudgeStatus {
    /// Never fails: text that is not a known status becomes [`JudgeStatus::Unknown`].
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match Self::from_str(text) {
            Ok(status) => status,
            Err(_) => Self::Unknown(text.to_owned()),
        }
    }

    pub fn kind(&self) -> StatusKind {
        use JudgeStatus::*;
        match self {
            New | Compiling | Running | WaitingForCompile | WaitingForRun | Unknown(_) => {
                StatusKind::Pending
            }
            CompileError | WrongAnswer | TimeLimitExceeded | JudgeError | MemoryLimitExceeded
            | OutputLimitExceeded | IllegalFunction | RunTimeError => StatusKind::Rejected,
            Accepted => StatusKind::Accepted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind() != StatusKind::Pending
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Unknown(text) => text,
            known => <&'static str>::from(known),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseProgress {
    Passed,
    Failed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: JudgeStatus,
    pub status_label: String,
    pub total_cases: usize,
    pub accepted_cases: usize,
    pub is_done: bool,
    pub is_rejected: bool,
    pub run_time: String,
    pub progress: Vec<CaseProgress>,
}

/// Summarizes a snapshot. `None` means the judge has nothing to show yet.
pub fn classify(snapshot: &SubmissionSnapshot) -> Option<Verdict> {
    let markers = snapshot.test_case_markers.as_ref()?;

    let mut accepted_cases = 0;
    let mut is_rejected = false;
    for marker in markers {
        match marker {
            CaseMarker::Accepted => accepted_cases += 1,
            CaseMarker::Pending => continue,
            CaseMarker::Rejected => {
                is_rejected = true;
                break;
            }
        }
    }

    let total_cases = markers.len();
    let mut progress = vec![CaseProgress::Passed; accepted_cases];
    if is_rejected {
        progress.push(CaseProgress::Failed);
    }
    if progress.len() < total_cases {
        progress.resize(total_cases, CaseProgress::Pending);
    }

    let status = JudgeStatus::parse(&snapshot.overall_status);
    Some(Verdict {
        status_label: status.label().to_owned(),
        is_done: status.is_terminal(),
        status,
        total_cases,
        accepted_cases,
        is_rejected,
        run_time: snapshot.run_time.trim().to_owned(),
        progress,
    })
}
