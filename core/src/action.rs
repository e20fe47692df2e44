pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::io;
use std::path::{Path, PathBuf};

use colored::Colorize;
use error::*;
use tokio::task::JoinHandle;

use crate::config::{Config, SubmissionConfig, TestConfig};
use crate::interactive;
use crate::submission::{
    CommandSnapshotSource, PollOutcome, StatusBoard, Submission, SubmissionPoller,
};
use crate::testing::{ProcessRegistry, Sample, SampleOutcome, TestCommand, TestRunner};

/// Printed when the user interrupts a run.
pub const FAREWELL: &str = "Great is the art of beginning, but greater is the art of ending.";

/// Exit status after an interrupt (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    Config::init_example_file(dir).context("Failed to init kt.toml")
}

/// Kills every process group still registered in `registry` on Ctrl-C,
/// then exits the whole process.
pub fn install_interrupt_handler(registry: ProcessRegistry) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        let killed = registry.kill_all();
        log::debug!("Killed {} process group(s)", killed);
        println!("\n{}", FAREWELL.cyan());
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
}

/// `target` itself if it is a file. Otherwise the files under it matching a
/// configured pattern; the user chooses when there are several.
pub fn find_program_file(target: impl AsRef<Path>, cfg: &TestConfig) -> Result<PathBuf> {
    let target = target.as_ref();
    if target.is_file() {
        return Ok(target.to_owned());
    }

    let candidates = fsutil::find_files_by_recent_modification(target, &cfg.patterns())
        .context("No program file to test")?;
    match candidates.as_slice() {
        [single] => Ok(single.clone()),
        _ => interactive::ask_program_file(&candidates, target)
            .context("Failed to choose program file"),
    }
}

/// Problem id of a solution: the name of the directory holding it.
pub fn problem_id_of(program_file: impl AsRef<Path>) -> Option<String> {
    let dir = program_file.as_ref().canonicalize().ok()?;
    let name = dir.parent()?.file_name()?;
    Some(name.to_string_lossy().into_owned())
}

pub async fn do_test(
    program_file: impl AsRef<Path>,
    sample_dir: impl AsRef<Path>,
    cfg: &TestConfig,
    registry: ProcessRegistry,
) -> Result<Vec<SampleOutcome>> {
    let program_file = program_file.as_ref();
    let sample_dir = sample_dir.as_ref();

    let samples = Sample::gather(sample_dir).context("Failed to find samples")?;
    if samples.is_empty() {
        bail!("No samples are saved in {}", sample_dir.to_string_lossy());
    }

    let filename = program_file
        .file_name()
        .with_context(|| format!("Not a file: {:?}", program_file))?
        .to_string_lossy();
    let entry = cfg.find_test_cmd_for_filename(&filename).with_context(|| {
        format!(
            "Unconfigured test command for filename '{}' (No entry matched glob in `test.command[]`)",
            filename
        )
    })?;
    let cmd = TestCommand::from_config(entry, program_file)
        .with_context(|| format!("Invalid test command for '{}'", filename))?;

    let problem_id = problem_id_of(program_file).unwrap_or_default();
    println!("Problem ID : {}", problem_id.cyan());
    println!("Language   : {}", cmd.lang.cyan());

    let runner = TestRunner::new(cmd, registry)?.show_spinner(true);
    runner.run_all(&samples, &mut io::stdout()).await
}

pub async fn watch_submission(
    submission: &Submission,
    cfg: &SubmissionConfig,
) -> Result<PollOutcome> {
    let template = cfg
        .status_command
        .as_deref()
        .context("`submit.status_command` is not configured")?;

    let poller = SubmissionPoller::new(CommandSnapshotSource::new(template))
        .timeout(cfg.poll_timeout())
        .interval(cfg.poll_interval());

    let mut board = StatusBoard::new(io::stdout());
    let outcome = poller.poll(submission, &mut board).await?;
    if let PollOutcome::TimedOut(_) = outcome {
        log::warn!(
            "Gave up waiting for submission {} after {}s",
            submission.id,
            cfg.poll_timeout().as_secs()
        );
    }
    Ok(outcome)
}
