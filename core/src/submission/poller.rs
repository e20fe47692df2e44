use std::io::{self, Write};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    queue,
    terminal::{Clear, ClearType},
};
use tokio::time::Instant;

use super::verdict::{classify, SubmissionSnapshot, Verdict};
use crate::style;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub problem_id: String,
    pub language: String,
}

/// Where the current state of a submission comes from.
#[async_trait]
pub trait SnapshotSource {
    async fn fetch(&self, submission: &Submission) -> anyhow::Result<SubmissionSnapshot>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Finished(Verdict),
    /// The deadline passed first. Holds the last verdict seen, if any.
    TimedOut(Option<Verdict>),
}

/// Redraws the verdict block in place on every update.
pub struct StatusBoard<W: Write> {
    out: W,
    drawn_lines: u16,
}

impl<W: Write> StatusBoard<W> {
    const KEY_WIDTH: usize = 20;

    pub fn new(out: W) -> Self {
        Self {
            out,
            drawn_lines: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, submission: &Submission, verdict: &Verdict) -> io::Result<()> {
        if self.drawn_lines > 0 {
            queue!(
                self.out,
                MoveUp(self.drawn_lines),
                MoveToColumn(0),
                Clear(ClearType::FromCursorDown)
            )?;
        }

        let now = chrono::Local::now().format("%l:%M%p %Z on %b %d, %Y");
        let fields = [
            ("current time", now.to_string()),
            ("language", submission.language.clone()),
            ("problem id", submission.problem_id.clone()),
            ("running time", verdict.run_time.clone()),
            ("submission id", submission.id.clone()),
            ("submission result", style::verdict_label(verdict).to_string()),
            ("test cases", style::progress_glyphs(&verdict.progress)),
        ];
        for (key, value) in &fields {
            writeln!(self.out, "{:<width$}{}", key, value, width = Self::KEY_WIDTH)?;
        }
        self.drawn_lines = fields.len() as u16;
        self.out.flush()
    }
}

pub struct SubmissionPoller<S> {
    source: S,
    timeout: Duration,
    interval: Duration,
}

impl<S: SnapshotSource> SubmissionPoller<S> {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(400);

    pub fn new(source: S) -> Self {
        Self {
            source,
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Polls until the judge reaches a final status or the timeout elapses.
    /// The deadline is only checked between ticks.
    pub async fn poll<W: Write>(
        &self,
        submission: &Submission,
        board: &mut StatusBoard<W>,
    ) -> io::Result<PollOutcome> {
        let deadline = Instant::now() + self.timeout;
        let mut last = None;

        loop {
            match self.source.fetch(submission).await {
                Err(e) => log::info!("Waiting for result... ({:#})", e),
                Ok(snapshot) => match classify(&snapshot) {
                    None => log::debug!("No test case is published for {} yet", submission.id),
                    Some(verdict) => {
                        board.render(submission, &verdict)?;
                        if verdict.is_done {
                            return Ok(PollOutcome::Finished(verdict));
                        }
                        last = Some(verdict);
                    }
                },
            }

            if Instant::now() >= deadline {
                return Ok(PollOutcome::TimedOut(last));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
