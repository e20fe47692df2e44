use kt_core::{action, submission::Submission};

use crate::{config, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub submission_id: String,

    /// [default: name of the current dir]
    #[arg(long)]
    pub problem_id: Option<String>,

    /// Language shown next to the verdict
    #[arg(long)]
    pub lang: Option<String>,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cur_dir = util::current_dir();
    let cfg = config::load(&cur_dir, global_args)?;

    let problem_id = args.problem_id.clone().unwrap_or_else(|| {
        cur_dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let submission = Submission {
        id: args.submission_id.clone(),
        problem_id,
        language: args.lang.clone().unwrap_or_else(|| "-".to_owned()),
    };

    let _ = action::watch_submission(&submission, &cfg.submit).await?;
    Ok(())
}
