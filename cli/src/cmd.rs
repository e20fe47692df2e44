pub mod init;
pub mod watch;

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Use this kt.toml instead of searching for one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),

    #[command(alias("t"))]
    Test(test::Args),

    #[command(alias("w"))]
    Watch(watch::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Init(args) => init::exec(args, self),
            Test(args) => test::exec(args, self).await,
            Watch(args) => watch::exec(args, self).await,
        }
    }
}
