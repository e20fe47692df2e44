//! Tolerant line/token comparison between expected and actual program output.
//!
//! Lines and tokens are aligned by position. The shorter side is padded with
//! empty strings, so a missing trailing line only fails when the other side has
//! a non-empty token there.

use colored::Colorize as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDiff {
    pub matched: bool,
    pub fragment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    pub tokens: Vec<TokenDiff>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonOutcome {
    pub sample_index: u32,
    pub accepted: bool,
    pub lines: Vec<LineDiff>,
}

impl LineDiff {
    pub fn is_match(&self) -> bool {
        self.tokens.iter().all(|t| t.matched)
    }

    pub fn render(&self) -> String {
        self.tokens.iter().map(|t| t.fragment.as_str()).collect()
    }
}

impl ComparisonOutcome {
    pub fn diff_lines(&self) -> Vec<String> {
        self.lines.iter().map(LineDiff::render).collect()
    }
}

/// Pads the shorter of `lhs` / `rhs` with `pad` until both have the same length.
pub fn make_equal_len<T: Clone>(lhs: &mut Vec<T>, rhs: &mut Vec<T>, pad: T) {
    let len = lhs.len().max(rhs.len());
    lhs.resize(len, pad.clone());
    rhs.resize(len, pad);
}

pub fn compare_token(expected: &str, actual: &str) -> TokenDiff {
    if expected == actual {
        return TokenDiff {
            matched: true,
            fragment: format!("{} ", expected),
        };
    }
    TokenDiff {
        matched: false,
        fragment: format!(
            "{}{} ",
            expected.red().strikethrough(),
            actual.green()
        ),
    }
}

pub fn compare_line(expected: &str, actual: &str) -> LineDiff {
    let mut expected: Vec<&str> = expected.split(' ').collect();
    let mut actual: Vec<&str> = actual.split(' ').collect();
    make_equal_len(&mut expected, &mut actual, "");

    let tokens = expected
        .iter()
        .zip(&actual)
        .map(|(e, a)| compare_token(e, a))
        .collect();
    LineDiff { tokens }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').map(str::trim_end).collect()
}

pub fn compare(sample_index: u32, expected: &str, actual: &str) -> ComparisonOutcome {
    let mut expected = split_lines(expected);
    let mut actual = split_lines(actual);
    make_equal_len(&mut expected, &mut actual, "");

    let lines: Vec<_> = expected
        .iter()
        .zip(&actual)
        .map(|(e, a)| compare_line(e, a))
        .collect();
    let accepted = lines.iter().all(LineDiff::is_match);

    ComparisonOutcome {
        sample_index,
        accepted,
        lines,
    }
}
