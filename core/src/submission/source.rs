use std::collections::HashMap;

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use tokio::process::Command;

use super::poller::{Submission, SnapshotSource};
use super::verdict::SubmissionSnapshot;
use crate::str_interp::interp;
use crate::testing::process::split_command;

/// Fetches snapshots by running a user-configured command that prints one
/// JSON snapshot on stdout, e.g.
/// `{"test_case_markers": ["accepted", "pending"], "overall_status": "Running", "run_time": "0.01 s"}`.
#[derive(Debug, Clone)]
pub struct CommandSnapshotSource {
    command_template: String,
}

impl CommandSnapshotSource {
    pub fn new(command_template: impl Into<String>) -> Self {
        Self {
            command_template: command_template.into(),
        }
    }

    /// Resolves `$%id%$` and `$%problem%$` for `submission`.
    pub fn command_for(&self, submission: &Submission) -> anyhow::Result<String> {
        let vars = HashMap::from([
            ("id", submission.id.as_str()),
            ("problem", submission.problem_id.as_str()),
        ]);
        interp(&self.command_template, &vars)
            .with_context(|| format!("Invalid status command '{}'", self.command_template))
    }
}

#[async_trait]
impl SnapshotSource for CommandSnapshotSource {
    async fn fetch(&self, submission: &Submission) -> anyhow::Result<SubmissionSnapshot> {
        let command_line = self.command_for(submission)?;
        let (program, args) = split_command(&command_line)?;

        let output = Command::new(&program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to spawn '{}'", command_line))?;

        if !output.status.success() {
            bail!(
                "'{}' failed ({}): {}",
                command_line,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("'{}' printed a malformed snapshot", command_line))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::submission::CaseMarker;

    fn submission() -> Submission {
        Submission {
            id: "42".to_owned(),
            problem_id: "hello".to_owned(),
            language: "C++".to_owned(),
        }
    }

    #[test]
    fn command_for_resolves_placeholders() {
        let src = CommandSnapshotSource::new("kattis-status $%id%$ --problem $%problem%$");
        assert_eq!(
            src.command_for(&submission()).unwrap(),
            "kattis-status 42 --problem hello"
        );

        let src = CommandSnapshotSource::new("kattis-status $%lang%$");
        assert!(src.command_for(&submission()).is_err());
    }

    #[tokio::test]
    async fn fetch_parses_stdout() {
        let src = CommandSnapshotSource::new(
            r#"printf '{"test_case_markers":["accepted","pending"],"overall_status":"Running","run_time":"$%id%$ ms"}'"#,
        );
        let snapshot = src.fetch(&submission()).await.unwrap();
        assert_eq!(
            snapshot.test_case_markers,
            Some(vec![CaseMarker::Accepted, CaseMarker::Pending])
        );
        assert_eq!(snapshot.overall_status, "Running");
        assert_eq!(snapshot.run_time, "42 ms");
    }

    #[tokio::test]
    async fn fetch_fails_on_garbage_or_exit_status() {
        let src = CommandSnapshotSource::new("echo '<html>'");
        assert!(src.fetch(&submission()).await.is_err());

        let src = CommandSnapshotSource::new("sh -c 'echo down >&2; exit 1'");
        let err = src.fetch(&submission()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("down"));
    }
}
