use std::collections::BTreeMap;
use std::io::{self, Write};

use colored::{Color, ColoredString, Colorize};

use crate::submission::{CaseProgress, StatusKind, Verdict};
use crate::testing::{JudgeCode, OutcomeDetail, SampleOutcome};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for JudgeCode {
    fn color(&self) -> Color {
        use JudgeCode::*;
        if !self::is_truecolor_supported() {
            return match self {
                AC => Color::Green,
                WA => Color::Yellow,
                RE => Color::Magenta,
                IE => Color::Red,
            };
        }

        match self {
            AC => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            RE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            IE => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
        }
    }
}

impl ColorTheme for StatusKind {
    fn color(&self) -> Color {
        match self {
            StatusKind::Pending => Color::Cyan,
            StatusKind::Rejected => Color::Red,
            StatusKind::Accepted => Color::Green,
        }
    }
}

pub fn judge_icon(judge: JudgeCode) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", judge)
        .on_color(judge.color())
        .bold()
        .color(fg)
}

pub fn verdict_label(verdict: &Verdict) -> ColoredString {
    verdict
        .status_label
        .as_str()
        .color(verdict.status.kind().color())
}

pub fn progress_glyph(p: CaseProgress) -> ColoredString {
    match p {
        CaseProgress::Passed => "✔".green(),
        CaseProgress::Failed => "✖".red(),
        CaseProgress::Pending => "◻".dimmed(),
    }
}

pub fn progress_glyphs(progress: &[CaseProgress]) -> String {
    progress
        .iter()
        .map(|&p| progress_glyph(p).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Test Case #N: <label> ... <secs> s   <mem> M`, followed by details for failures.
pub fn write_sample_report<W: Write>(out: &mut W, res: &SampleOutcome) -> io::Result<()> {
    let mut line = format!(
        "Test Case #{}: {:<13} ...",
        res.sample.index,
        res.judge.label()
    );
    if let Some(exec) = &res.execution {
        line += &format!(
            " {:.3} s   {:.2} M",
            exec.elapsed.as_secs_f64(),
            exec.resident_memory_mb
        );
    }
    if let OutcomeDetail::TraceFile(path) = &res.detail {
        line += &format!(" trace saved to {}", path.display());
    }
    let line = if res.is_accepted() {
        line.green()
    } else {
        line.red()
    };
    writeln!(out, "{}", line)?;

    match res.judge {
        JudgeCode::AC => {}
        JudgeCode::WA => {
            writeln!(out, "{}", "--- Input ---".cyan())?;
            let input = res.input.as_deref().unwrap_or_default();
            write!(out, "{}", input)?;
            if !input.is_empty() && !input.ends_with('\n') {
                writeln!(out)?;
            }
            writeln!(out, "{}", "--- Diff ---".cyan())?;
            if let Some(cmp) = &res.comparison {
                for line in cmp.diff_lines() {
                    writeln!(out, "{}", line)?;
                }
            }
        }
        JudgeCode::RE => {
            if let OutcomeDetail::Failure(reason) = &res.detail {
                writeln!(out, "{}", reason.bright_red())?;
            }
            if let Some(exec) = &res.execution {
                let stderr = exec.stderr_lossy();
                if !stderr.is_empty() {
                    writeln!(out, "{}", "--- Stderr ---".cyan())?;
                    write!(out, "{}", stderr)?;
                }
            }
        }
        JudgeCode::IE => {
            if let OutcomeDetail::Unsaved(err) = &res.detail {
                writeln!(out, "{}", err.bright_red())?;
            }
        }
    }
    Ok(())
}

pub fn write_summary<W: Write>(out: &mut W, results: &[SampleOutcome]) -> io::Result<()> {
    let bar = "-".repeat(5);
    write!(out, "{} ", bar)?;

    let count: BTreeMap<JudgeCode, usize> =
        results.iter().fold(BTreeMap::new(), |mut count, r| {
            *count.entry(r.judge).or_default() += 1;
            count
        });

    let num_total_test = results.len();
    let num_passed = *count.get(&JudgeCode::AC).unwrap_or(&0);
    let num_failed = num_total_test - num_passed;

    if num_passed == num_total_test {
        let msg = format!("All {} tests passed ✨", num_total_test);
        write!(out, "{}", msg.green())?;
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} tests failed 💣", num_failed, num_total_test)
        } else {
            format!("All {} tests failed 💀", num_total_test)
        };

        let detail_msg = count
            .iter()
            .filter(|(&judge, _)| judge != JudgeCode::AC)
            .map(|(&judge, &cnt)| {
                format!(
                    "{}{}{}",
                    self::judge_icon(judge),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        write!(out, "{} ({})", summary_msg.bright_red(), detail_msg)?;
    }

    writeln!(out, " {}", bar)
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::testing::Sample;

    fn outcome(index: u32, judge: JudgeCode) -> SampleOutcome {
        SampleOutcome {
            sample: Sample {
                index,
                input_path: PathBuf::from(format!("in{}.txt", index)),
                expected_output_path: PathBuf::from(format!("ans{}.txt", index)),
            },
            judge,
            execution: None,
            comparison: None,
            input: None,
            detail: OutcomeDetail::None,
        }
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn summary_when_all_passed() {
        let results = [outcome(1, JudgeCode::AC), outcome(2, JudgeCode::AC)];
        let s = render(|out| write_summary(out, &results));
        assert_eq!(s, "----- All 2 tests passed ✨ -----\n");
    }

    #[test]
    fn summary_counts_failures() {
        let results = [
            outcome(1, JudgeCode::AC),
            outcome(2, JudgeCode::WA),
            outcome(3, JudgeCode::WA),
            outcome(4, JudgeCode::RE),
        ];
        let s = render(|out| write_summary(out, &results));
        assert!(s.contains("3/4 tests failed 💣"), "{}", s);
        assert!(s.contains(" WA x2"), "{}", s);
        assert!(s.contains(" RE x1"), "{}", s);

        let results = [outcome(1, JudgeCode::IE)];
        let s = render(|out| write_summary(out, &results));
        assert!(s.contains("All 1 tests failed 💀"), "{}", s);
    }

    #[test]
    fn report_line_pads_label() {
        let s = render(|out| write_sample_report(out, &outcome(7, JudgeCode::AC)));
        assert_eq!(s, "Test Case #7: Accepted      ...\n");
    }

    #[test]
    fn report_names_trace_file() {
        let mut res = outcome(3, JudgeCode::IE);
        res.detail = OutcomeDetail::TraceFile(PathBuf::from("/tmp/kt-internal-error-x.log"));
        let s = render(|out| write_sample_report(out, &res));
        assert!(s.starts_with("Test Case #3: Internal Error"), "{}", s);
        assert!(s.contains("/tmp/kt-internal-error-x.log"), "{}", s);
    }
}
