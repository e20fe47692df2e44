use std::path::{Path, PathBuf};

use anyhow::Context as _;
use kt_core::Config;

use crate::{cmd::GlobalArgs, util};

pub const APP_NAME: &str = "kt";

/// `<user config dir>/kt/kt.toml`, if the platform has a config dir.
pub fn user_config_filepath() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(Config::FILENAME))
}

/// Where the config is read from: `--config`, else the nearest `kt.toml` in
/// `cur_dir` or its ancestors, else the user config file.
pub fn resolve_filepath(cur_dir: impl AsRef<Path>, args: &GlobalArgs) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    Config::find_file_in_ancestors(cur_dir)
        .or_else(|| user_config_filepath().filter(|path| path.is_file()))
}

pub fn load(cur_dir: impl AsRef<Path>, args: &GlobalArgs) -> anyhow::Result<Config> {
    let filepath = resolve_filepath(&cur_dir, args).with_context(|| {
        format!(
            "No {} found in {:?} nor its ancestors (run `kt init` to create one)",
            Config::FILENAME,
            util::replace_homedir_to_tilde(cur_dir.as_ref()),
        )
    })?;
    log::debug!("Using config {:?}", filepath);
    Config::from_toml_file(filepath)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cmd::Subcommand;
    use clap::Parser as _;

    fn args(extra: &[&str]) -> GlobalArgs {
        let mut argv = vec!["kt", "init"];
        argv.extend_from_slice(extra);
        GlobalArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn finds_config_in_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let problem_dir = dir.path().join("oddmanout");
        fsutil::mkdir_all(&problem_dir).unwrap();
        Config::init_example_file(dir.path()).unwrap();

        let cfg = load(&problem_dir, &args(&[])).unwrap();
        assert_eq!(
            cfg.source_config_file,
            Some(dir.path().join(Config::FILENAME))
        );
        assert!(cfg.test.find_test_cmd_for_filename("oddmanout.py").is_some());
    }

    #[test]
    fn explicit_config_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("other.toml");
        fsutil::write(&explicit, "[test]\ncommand = []\n").unwrap();
        Config::init_example_file(dir.path()).unwrap();

        let a = args(&["--config", explicit.to_str().unwrap()]);
        assert!(matches!(a.subcmd, Subcommand::Init(_)));
        let cfg = load(dir.path(), &a).unwrap();
        assert!(cfg.test.command.is_empty());
    }
}
