//! Contains the logic for the default `run` command.
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::{LpadError, Result};
use lpad_common::state::LauncherState;
use tracing::debug;

use crate::cli::launch::start;
use crate::cli::update::download_prompt;
use crate::cli::{download_with_progress, open_session};
use crate::ui;

#[derive(clap::Args, Debug, Default)]
pub struct Run {
    /// Answer yes to every prompt and never retry
    #[arg(short, long)]
    pub yes: bool,
}

impl Run {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let mut session = open_session(config).await?;

        loop {
            let check = session.check().await;
            ui::print_status(&session.snapshot());
            if let Err(e) = check {
                if self.retry(&e)? {
                    continue;
                }
                return Err(e);
            }

            if session.state() == Some(LauncherState::Waiting) {
                if !self.yes && !ui::confirm(&download_prompt(&session), true)? {
                    println!("Nothing installed or updated.");
                    return Ok(());
                }
                let download = download_with_progress(&mut session).await;
                ui::print_status(&session.snapshot());
                if let Err(e) = download {
                    if self.retry(&e)? {
                        continue;
                    }
                    return Err(e);
                }
            }
            break;
        }

        if self.yes || ui::confirm("Launch now?", true)? {
            start(&session)?;
        }
        Ok(())
    }

    fn retry(&self, e: &LpadError) -> Result<bool> {
        if self.yes {
            return Ok(false);
        }
        debug!("Offering retry after: {}", e);
        eprintln!("{}: {}", "Error".red().bold(), e);
        ui::confirm("Retry?", true)
    }
}
