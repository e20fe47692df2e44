use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

use serdable::GlobPattern;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub test: TestConfig,
    #[serde(default)]
    pub submit: SubmissionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestConfig {
    pub command: Vec<TestCommandConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCommandConfig {
    pub pattern: GlobPattern,
    pub lang: String,
    #[serde(default)]
    pub pre_script: Option<String>,
    pub script: String,
    #[serde(default)]
    pub post_script: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub status_command: Option<String>,
    #[serde(default = "SubmissionConfig::default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "SubmissionConfig::default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            status_command: None,
            poll_timeout_secs: Self::default_poll_timeout_secs(),
            poll_interval_millis: Self::default_poll_interval_millis(),
        }
    }
}

impl SubmissionConfig {
    fn default_poll_timeout_secs() -> u64 {
        60
    }

    fn default_poll_interval_millis() -> u64 {
        400
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "kt.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).expect("example kt.toml must be embedded");
        String::from_utf8_lossy(file.data.as_ref()).into_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Writes the example config as `<dir>/kt.toml`, refusing to overwrite.
    pub fn init_example_file(dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let filepath = dir.as_ref().join(Self::FILENAME);
        anyhow::ensure!(
            !filepath.exists(),
            "Config file already exists: {}",
            filepath.to_string_lossy()
        );
        fsutil::write_with_mkdir(&filepath, Self::example_toml())?;
        Ok(filepath)
    }
}

impl TestConfig {
    pub fn find_test_cmd_for_filename(&self, filename: impl AsRef<str>) -> Option<&TestCommandConfig> {
        self.command
            .iter()
            .find(|entry| entry.pattern.matches(filename.as_ref()))
    }

    pub fn patterns(&self) -> Vec<&::glob::Pattern> {
        self.command.iter().map(|entry| &*entry.pattern).collect()
    }
}
