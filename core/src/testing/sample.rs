use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use futures::{StreamExt as _, TryStreamExt as _};
use lazy_regex::regex_captures;

/// Number of fixture files written concurrently by [`save_samples`].
pub const SAMPLE_WRITE_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub index: u32,
    pub input_path: PathBuf,
    pub expected_output_path: PathBuf,
}

/// Sample contents handed over by whoever fetched them, before they hit the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleData {
    pub index: u32,
    pub input: String,
    pub expected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixtureKind {
    Input,
    Answer,
}

/// `in3.txt` => `(Input, 3)`, `ans12.out` => `(Answer, 12)`.
fn parse_fixture_name(filename: &str) -> Option<(FixtureKind, u32)> {
    let (_, prefix, index) = regex_captures!(r"^(in|ans)([0-9]+)\..*$", filename)?;
    let index: u32 = index.parse().ok()?;
    if index == 0 {
        return None;
    }
    let kind = match prefix {
        "in" => FixtureKind::Input,
        _ => FixtureKind::Answer,
    };
    Some((kind, index))
}

impl Sample {
    pub fn input_filename(index: u32) -> String {
        format!("in{}.txt", index)
    }

    pub fn answer_filename(index: u32) -> String {
        format!("ans{}.txt", index)
    }

    /// Pairs `in<N>.*` with `ans<N>.*` found directly under `dir`.
    /// Files without a partner are skipped. Sorted by ascending index.
    pub fn gather(dir: impl AsRef<Path>) -> fsutil::Result<Vec<Self>> {
        let mut inputs = BTreeMap::new();
        let mut answers = BTreeMap::new();

        let mut entries: Vec<_> = fsutil::read_dir(&dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        // same index with two extensions: the first name in lexical order wins
        entries.sort();

        for path in entries {
            let Some(filename) = path.file_name().map(|s| s.to_string_lossy().into_owned()) else {
                continue
            };
            let Some((kind, index)) = parse_fixture_name(&filename) else {
                continue
            };
            let table = match kind {
                FixtureKind::Input => &mut inputs,
                FixtureKind::Answer => &mut answers,
            };
            table.entry(index).or_insert(path);
        }

        let samples = inputs
            .into_iter()
            .filter_map(|(index, input_path)| match answers.remove(&index) {
                Some(expected_output_path) => Some(Sample {
                    index,
                    input_path,
                    expected_output_path,
                }),
                None => {
                    log::debug!(
                        "Skip sample #{}: no answer file for {:?}",
                        index,
                        input_path
                    );
                    None
                }
            })
            .collect();

        for (index, path) in answers {
            log::debug!("Skip sample #{}: no input file for {:?}", index, path);
        }
        Ok(samples)
    }
}

/// Writes every sample as `in<N>.txt` / `ans<N>.txt` under `dir`,
/// keeping at most [`SAMPLE_WRITE_WORKERS`] writes in flight.
pub async fn save_samples(dir: impl AsRef<Path>, samples: &[SampleData]) -> fsutil::Result<usize> {
    let dir = dir.as_ref();
    fsutil::mkdir_all(dir)?;

    let jobs = samples.iter().flat_map(|s| {
        [
            (dir.join(Sample::input_filename(s.index)), s.input.as_str()),
            (dir.join(Sample::answer_filename(s.index)), s.expected.as_str()),
        ]
    });

    futures::stream::iter(jobs)
        .map(|(path, contents)| async move {
            tokio::fs::write(&path, contents)
                .await
                .map_err(|e| fsutil::Error::SingleIO("Cannot write file", path, e))
        })
        .buffer_unordered(SAMPLE_WRITE_WORKERS)
        .try_collect::<Vec<()>>()
        .await?;

    Ok(samples.len())
}

#[cfg(test)]
mod test {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fsutil::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn parse_fixture_name_ok() {
        use FixtureKind::*;
        assert_eq!(parse_fixture_name("in1.txt"), Some((Input, 1)));
        assert_eq!(parse_fixture_name("ans12.out"), Some((Answer, 12)));
        assert_eq!(parse_fixture_name("in3.sample.txt"), Some((Input, 3)));
        assert_eq!(parse_fixture_name("in0.txt"), None);
        assert_eq!(parse_fixture_name("in1"), None);
        assert_eq!(parse_fixture_name("input1.txt"), None);
        assert_eq!(parse_fixture_name("main.cpp"), None);
    }

    #[test]
    fn gather_skips_unpaired_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "in2.txt");
        touch(dir.path(), "ans2.txt");
        touch(dir.path(), "in1.txt");

        let samples = Sample::gather(dir.path()).unwrap();
        assert_eq!(
            samples,
            vec![Sample {
                index: 2,
                input_path: dir.path().join("in2.txt"),
                expected_output_path: dir.path().join("ans2.txt"),
            }]
        );
    }

    #[test]
    fn gather_sorts_by_numeric_index() {
        let dir = tempfile::tempdir().unwrap();
        for i in [10, 2, 1] {
            touch(dir.path(), &format!("in{}.txt", i));
            touch(dir.path(), &format!("ans{}.txt", i));
        }
        touch(dir.path(), "oddmanout.py");

        let indices: Vec<_> = Sample::gather(dir.path())
            .unwrap()
            .into_iter()
            .map(|s| s.index)
            .collect();
        assert_eq!(indices, vec![1, 2, 10]);
    }

    #[test]
    fn gather_fails_on_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Sample::gather(dir.path().join("nope")).is_err());
    }

    #[tokio::test]
    async fn save_samples_then_gather() {
        let dir = tempfile::tempdir().unwrap();
        let problem_dir = dir.path().join("oddmanout");
        let data: Vec<_> = (1..=6)
            .map(|i| SampleData {
                index: i,
                input: format!("{}\n", i),
                expected: format!("Case #1: {}\n", i),
            })
            .collect();

        let n = save_samples(&problem_dir, &data).await.unwrap();
        assert_eq!(n, 6);

        let samples = Sample::gather(&problem_dir).unwrap();
        assert_eq!(samples.len(), 6);
        assert_eq!(
            fsutil::read_to_string(&samples[2].input_path).unwrap(),
            "3\n"
        );
        assert_eq!(
            fsutil::read_to_string(&samples[5].expected_output_path).unwrap(),
            "Case #1: 6\n"
        );
    }
}
