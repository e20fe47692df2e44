use std::{
    collections::HashMap,
    ffi::{OsStr, OsString},
    io::Write,
    os::unix::process::ExitStatusExt as _,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use anyhow::{bail, Context as _};
use colored::Colorize as _;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{distributions::Alphanumeric, Rng as _};
use tokio::process::Command;

use super::{
    compare,
    process::{split_command, ExecError, ProcessRegistry, ProcessRunner},
    result::*,
    sample::Sample,
};
use crate::config::TestCommandConfig;
use crate::interactive::SpinnerExt;
use crate::str_interp::{interp, InterpError};
use crate::style;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub lang: String,
    pub pre_script: Option<String>,
    pub script: String,
    pub post_script: Option<String>,
}

impl TestCommand {
    /// Resolves the placeholders of a configured command for `program_file`.
    pub fn from_config(
        entry: &TestCommandConfig,
        program_file: impl AsRef<Path>,
    ) -> std::result::Result<Self, InterpError> {
        let vars = Self::make_cmd_interp_vars(program_file.as_ref());
        let resolve_hook = |hook: &Option<String>| {
            hook.as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| interp(s, &vars))
                .transpose()
        };
        Ok(Self {
            lang: entry.lang.clone(),
            pre_script: resolve_hook(&entry.pre_script)?,
            script: interp(&entry.script, &vars)?,
            post_script: resolve_hook(&entry.post_script)?,
        })
    }

    fn make_cmd_interp_vars(filepath: &Path) -> HashMap<&'static str, OsString> {
        let mut dir = filepath
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .as_os_str()
            .to_owned();
        dir.push(std::path::MAIN_SEPARATOR_STR);

        let random: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .map(|b| (b as char).to_ascii_lowercase())
            .take(8)
            .collect();

        let mut m = HashMap::new();
        m.insert("path", dir);
        m.insert(
            "full",
            filepath.file_name().unwrap_or(OsStr::new("")).to_owned(),
        );
        m.insert(
            "file",
            filepath.file_stem().unwrap_or(OsStr::new("")).to_owned(),
        );
        m.insert("rand", random.into());
        m
    }
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    cmd: TestCommand,
    process: ProcessRunner,
    work_dir: Option<PathBuf>,
    show_spinner: bool,
}

impl TestRunner {
    const TRACE_FILE_PREFIX: &str = "kt-internal-error-";

    pub fn new(cmd: TestCommand, registry: ProcessRegistry) -> Result<Self, ExecError> {
        let process = ProcessRunner::new(&cmd.script, registry)?;
        Ok(Self {
            cmd,
            process,
            work_dir: None,
            show_spinner: false,
        })
    }

    /// Directory the hooks and the program run in. Defaults to the current dir.
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.process = self.process.work_dir(&dir);
        self.work_dir = Some(dir);
        self
    }

    pub fn show_spinner(mut self, enabled: bool) -> Self {
        self.show_spinner = enabled;
        self
    }

    pub fn get_command(&self) -> &TestCommand {
        &self.cmd
    }

    pub fn registry(&self) -> &ProcessRegistry {
        self.process.registry()
    }

    /// Runs a pre/post script to completion. Any failure is fatal for the run.
    pub async fn run_hook(&self, script: &str) -> anyhow::Result<()> {
        let (program, args) = split_command(script)?;
        let mut cmd = Command::new(&program);
        cmd.args(&args);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        let status = cmd
            .status()
            .await
            .with_context(|| format!("Failed to spawn '{}'", script))?;

        if !status.success() {
            bail!("'{}' failed: {}", script, describe_exit_status(status));
        }
        Ok(())
    }

    /// Runs one sample. Failures of the program or of the runner itself are
    /// turned into RE / IE outcomes instead of errors.
    pub async fn run_sample(&self, sample: &Sample) -> SampleOutcome {
        match self.try_run_sample(sample).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let detail = save_trace(sample, &err);
                SampleOutcome {
                    sample: sample.clone(),
                    judge: JudgeCode::IE,
                    execution: None,
                    comparison: None,
                    input: None,
                    detail,
                }
            }
        }
    }

    async fn try_run_sample(&self, sample: &Sample) -> anyhow::Result<SampleOutcome> {
        let input = fsutil::read(&sample.input_path)?;
        let expected = fsutil::read_to_string(&sample.expected_output_path)?;
        let input_text = String::from_utf8_lossy(&input).into_owned();

        let outcome = |judge, execution, comparison, detail| SampleOutcome {
            sample: sample.clone(),
            judge,
            execution,
            comparison,
            input: Some(input_text.clone()),
            detail,
        };

        let exec = match self.process.run(&input).await {
            Ok(exec) => exec,
            Err(e @ ExecError::Spawn(..)) => {
                return Ok(outcome(
                    JudgeCode::RE,
                    None,
                    None,
                    OutcomeDetail::Failure(e.to_string()),
                ))
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to run sample #{}", sample.index))
            }
        };

        if !exec.exit_status.success() {
            let detail = OutcomeDetail::Failure(describe_exit_status(exec.exit_status));
            return Ok(outcome(JudgeCode::RE, Some(exec), None, detail));
        }

        let comparison = compare::compare(sample.index, &expected, &exec.stdout_lossy());
        let judge = if comparison.accepted {
            JudgeCode::AC
        } else {
            JudgeCode::WA
        };
        Ok(outcome(
            judge,
            Some(exec),
            Some(comparison),
            OutcomeDetail::None,
        ))
    }

    /// Runs the pre-script, every sample in ascending index order, then the
    /// post-script, writing the report to `out`.
    pub async fn run_all<W: Write>(
        &self,
        samples: &[Sample],
        out: &mut W,
    ) -> anyhow::Result<Vec<SampleOutcome>> {
        let mut samples = samples.to_vec();
        samples.sort_by_key(|s| s.index);

        if let Some(script) = &self.cmd.pre_script {
            writeln!(out, "{}", format!("running {}", script).cyan())?;
            self.run_hook(script).await.context("pre-script failed")?;
        }

        log::info!("Running: {}", self.process.get_command_line());

        let mut results = Vec::with_capacity(samples.len());
        for sample in &samples {
            let spinner = self.spinner(sample).map(SpinnerExt::with_ticking);
            let res = self.run_sample(sample).await;
            if let Some(spinner) = spinner {
                spinner.lock().await.finish_and_clear();
            }
            style::write_sample_report(out, &res)?;
            results.push(res);
        }

        if let Some(script) = &self.cmd.post_script {
            writeln!(out, "{}", format!("running {}", script).cyan())?;
            self.run_hook(script).await.context("post-script failed")?;
        }

        style::write_summary(out, &results)?;
        Ok(results)
    }

    fn spinner(&self, sample: &Sample) -> Option<ProgressBar> {
        if !self.show_spinner {
            return None;
        }
        let style = ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .ok()?;
        let bar = ProgressBar::new_spinner()
            .with_style(style)
            .with_message(format!("Test Case #{} ...", sample.index));
        Some(bar)
    }
}

fn describe_exit_status(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit code {}", code),
        (None, Some(sig)) => format!("terminated by signal {}", sig),
        (None, None) => status.to_string(),
    }
}

fn save_trace(sample: &Sample, err: &anyhow::Error) -> OutcomeDetail {
    let trace = format!(
        "Internal error on sample #{}\ninput:  {:?}\nanswer: {:?}\n\n{:?}\n",
        sample.index, sample.input_path, sample.expected_output_path, err
    );
    match fsutil::write_kept_tempfile(TestRunner::TRACE_FILE_PREFIX, trace) {
        Ok(path) => {
            log::error!("Internal error on sample #{}: {:#}", sample.index, err);
            OutcomeDetail::TraceFile(path)
        }
        Err(e) => {
            log::error!("Cannot save trace of sample #{}: {}", sample.index, e);
            OutcomeDetail::Unsaved(format!("{:#}", err))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::sample::{save_samples, SampleData};

    fn sh(script: &str) -> String {
        // terminate '  ->  enclose ' with "  ->  restart '
        format!("sh -c '{}'", script.replace('\'', r#"'"'"'"#))
    }

    fn cmd(script: &str) -> TestCommand {
        TestCommand {
            lang: "sh".to_owned(),
            pre_script: None,
            script: sh(script),
            post_script: None,
        }
    }

    async fn one_sample(input: &str, expected: &str) -> (tempfile::TempDir, Sample) {
        let dir = tempfile::tempdir().unwrap();
        let data = [SampleData {
            index: 1,
            input: input.to_owned(),
            expected: expected.to_owned(),
        }];
        save_samples(dir.path(), &data).await.unwrap();
        let sample = Sample::gather(dir.path()).unwrap().remove(0);
        (dir, sample)
    }

    async fn run_one(script: &str, input: &str, expected: &str) -> SampleOutcome {
        let (_dir, sample) = one_sample(input, expected).await;
        let r = TestRunner::new(cmd(script), ProcessRegistry::new()).unwrap();
        r.run_sample(&sample).await
    }

    #[test]
    fn command_placeholders_are_resolved() {
        let entry = TestCommandConfig {
            pattern: serdable::GlobPattern::parse("*.cpp").unwrap(),
            lang: "C++".to_owned(),
            pre_script: Some("g++ $%full%$ -o $%path%$$%file%$.out".to_owned()),
            script: "./$%file%$.out".to_owned(),
            post_script: Some("  ".to_owned()),
        };
        let cmd = TestCommand::from_config(&entry, "/work/oddmanout.cpp").unwrap();
        assert_eq!(
            cmd.pre_script.as_deref(),
            Some("g++ oddmanout.cpp -o /work/oddmanout.out")
        );
        assert_eq!(cmd.script, "./oddmanout.out");
        assert_eq!(cmd.post_script, None);

        let cmd = TestCommand::from_config(&entry, "oddmanout.cpp").unwrap();
        assert_eq!(
            cmd.pre_script.as_deref(),
            Some("g++ oddmanout.cpp -o ./oddmanout.out")
        );
    }

    #[test]
    fn rand_placeholder_is_lowercase_alnum() {
        let vars = TestCommand::make_cmd_interp_vars(Path::new("a.py"));
        let rand = vars["rand"].to_string_lossy().into_owned();
        assert_eq!(rand.len(), 8);
        assert!(rand
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn should_be_ac() {
        let res = run_one(r#"read x; echo "hello_$x""#, "123\n", "hello_123\n").await;
        assert_eq!(res.judge, JudgeCode::AC);
        assert!(res.comparison.unwrap().accepted);
    }

    #[tokio::test]
    async fn should_be_ac_even_if_just_missing_newline() {
        let res = run_one(r#"printf "hello_123""#, "123\n", "hello_123\n").await;
        assert_eq!(res.judge, JudgeCode::AC);
    }

    #[tokio::test]
    async fn should_be_wa() {
        let res = run_one("echo hello_123 >&2", "123\n", "hello_123\n").await;
        assert_eq!(res.judge, JudgeCode::WA);
        assert_eq!(res.input.as_deref(), Some("123\n"));
        let exec = res.execution.unwrap();
        assert_eq!(exec.stderr_lossy(), "hello_123\n");
    }

    #[tokio::test]
    async fn should_be_re_even_if_stdout_is_correct() {
        let res = run_one("echo hello_123; exit 42", "123\n", "hello_123\n").await;
        assert_eq!(res.judge, JudgeCode::RE);
        assert!(matches!(res.detail, OutcomeDetail::Failure(ref s) if s == "exit code 42"));
    }

    #[tokio::test]
    async fn should_be_re_if_program_is_missing() {
        let (_dir, sample) = one_sample("1\n", "1\n").await;
        let mut c = cmd("true");
        c.script = "./no-such-solution.out".to_owned();
        let r = TestRunner::new(c, ProcessRegistry::new()).unwrap();
        let res = r.run_sample(&sample).await;
        assert_eq!(res.judge, JudgeCode::RE);
    }

    #[tokio::test]
    async fn should_be_ie_if_fixture_vanished() {
        let (_dir, sample) = one_sample("1\n", "1\n").await;
        std::fs::remove_file(&sample.expected_output_path).unwrap();

        let r = TestRunner::new(cmd("cat"), ProcessRegistry::new()).unwrap();
        let res = r.run_sample(&sample).await;
        assert_eq!(res.judge, JudgeCode::IE);
        let OutcomeDetail::TraceFile(path) = &res.detail else {
            panic!("trace should be saved: {:?}", res.detail)
        };
        let trace = fsutil::read_to_string(&path).unwrap();
        assert!(trace.contains("sample #1"));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn run_all_continues_after_failing_sample() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<_> = [("1\n", "1\n"), ("2\n", "2\n"), ("3\n", "4\n")]
            .iter()
            .enumerate()
            .map(|(i, (input, expected))| SampleData {
                index: i as u32 + 1,
                input: input.to_string(),
                expected: expected.to_string(),
            })
            .collect();
        save_samples(dir.path(), &data).await.unwrap();
        let samples = Sample::gather(dir.path()).unwrap();

        // fails hard on sample 2 only
        let r = TestRunner::new(
            cmd(r#"read x; [ "$x" = 2 ] && exit 1; echo "$x""#),
            ProcessRegistry::new(),
        )
        .unwrap();
        let mut out = Vec::new();
        let res = r.run_all(&samples, &mut out).await.unwrap();

        let judges: Vec<_> = res.iter().map(|x| x.judge).collect();
        assert_eq!(judges, vec![JudgeCode::AC, JudgeCode::RE, JudgeCode::WA]);
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("Test Case #1"));
        assert!(report.contains("Test Case #3"));
        assert!(report.contains("--- Diff ---"));
    }

    #[tokio::test]
    async fn hooks_run_around_samples() {
        let (dir, sample) = one_sample("1\n", "1\n").await;
        let log = dir.path().join("hooks.log");
        let log_str = log.to_string_lossy();
        let c = TestCommand {
            lang: "sh".to_owned(),
            pre_script: Some(sh(&format!("echo pre >> {}", log_str))),
            script: sh(&format!("echo run >> {}; cat", log_str)),
            post_script: Some(sh(&format!("echo post >> {}", log_str))),
        };
        let r = TestRunner::new(c, ProcessRegistry::new()).unwrap();
        let res = r.run_all(&[sample], &mut Vec::new()).await.unwrap();
        assert_eq!(res[0].judge, JudgeCode::AC);
        assert_eq!(fsutil::read_to_string(&log).unwrap(), "pre\nrun\npost\n");
    }

    #[tokio::test]
    async fn failing_pre_script_aborts_run() {
        let (dir, sample) = one_sample("1\n", "1\n").await;
        let marker = dir.path().join("ran");
        let c = TestCommand {
            lang: "sh".to_owned(),
            pre_script: Some(sh("exit 3")),
            script: sh(&format!("touch {}; cat", marker.to_string_lossy())),
            post_script: None,
        };
        let r = TestRunner::new(c, ProcessRegistry::new()).unwrap();
        let err = r.run_all(&[sample], &mut Vec::new()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("exit code 3"));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn failing_post_script_is_fatal() {
        let (_dir, sample) = one_sample("1\n", "1\n").await;
        let mut c = cmd("cat");
        c.post_script = Some("./no-such-cleanup".to_owned());
        let r = TestRunner::new(c, ProcessRegistry::new()).unwrap();
        assert!(r.run_all(&[sample], &mut Vec::new()).await.is_err());
    }
}
