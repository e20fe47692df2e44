use std::{
    fs::{self, ReadDir},
    io::Write as _,
    path::{Path, PathBuf},
    time::SystemTime,
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Cannot create temporary file (prefix='{0}'): {1}")]
        TempFile(String, #[source] io::Error),

        #[error("No entry matched any of [{0}] in '{1}'")]
        NoEntryMatchedGlob(String, PathBuf),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read(filepath: impl AsRef<Path>) -> Result<Vec<u8>> {
    fs::read(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

/// Writes `contents` into a fresh file under the system temp dir and keeps it
/// after the process exits. Returns the path of the kept file.
pub fn write_kept_tempfile(prefix: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".log")
        .tempfile()
        .map_err(|e| Error::TempFile(prefix.to_owned(), e))?;
    file.write_all(contents.as_ref())
        .map_err(|e| Error::SingleIO("Cannot write file", file.path().to_owned(), e))?;
    let (_, path) = file
        .keep()
        .map_err(|e| Error::TempFile(prefix.to_owned(), e.error))?;
    log::debug!("Kept temp file {:?}", path);
    Ok(path)
}

/// Regular files in `dir` whose name matches any of `patterns`,
/// most recently modified first.
pub fn find_files_by_recent_modification(
    dir: impl AsRef<Path>,
    patterns: &[&::glob::Pattern],
) -> Result<Vec<PathBuf>> {
    let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in self::read_dir(&dir)?.filter_map(std::result::Result::ok) {
        let file_type = entry.file_type();
        let modified = entry.metadata().and_then(|info| info.modified());
        let (Ok(file_type), Ok(modified)) = (file_type, modified) else {
            continue
        };
        if !file_type.is_file() {
            continue;
        }
        let filename = entry.file_name();
        let filename = filename.to_string_lossy();
        if patterns.iter().any(|pat| pat.matches(&filename)) {
            found.push((modified, entry.path()));
        }
    }

    if found.is_empty() {
        let joined = patterns
            .iter()
            .map(|p| format!("'{}'", p.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::NoEntryMatchedGlob(joined, dir.as_ref().to_owned()));
    }
    found.sort_by(|(t1, p1), (t2, p2)| t2.cmp(t1).then_with(|| p1.cmp(p2)));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
