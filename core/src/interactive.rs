use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::Mutex;

use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::ProgressBar;

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

/// Lets the user pick one of `candidates`; the first one is preselected.
pub fn ask_program_file(candidates: &[PathBuf], base_dir: &Path) -> io::Result<PathBuf> {
    let items: Vec<_> = candidates
        .iter()
        .map(|p| {
            p.strip_prefix(base_dir)
                .unwrap_or(p)
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    let i = Select::with_theme(&theme())
        .with_prompt("Which program do you want to test?")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(candidates[i].clone())
}

pub trait SpinnerExt {
    fn with_ticking(self) -> Arc<Mutex<Self>>;
}

impl SpinnerExt for ProgressBar {
    fn with_ticking(self) -> Arc<Mutex<Self>> {
        let mutex_spinner = Arc::new(Mutex::new(self));
        let spinner = mutex_spinner.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(80)).await;
                let spinner = spinner.lock().await;
                if spinner.is_finished() {
                    break;
                }
                spinner.tick();
            }
        });
        mutex_spinner
    }
}
