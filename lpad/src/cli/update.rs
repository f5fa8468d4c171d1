//! Contains the logic for the `update` command.
use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_common::state::{LauncherState, UpdateIntent};
use lpad_core::Session;

use crate::cli::{download_with_progress, open_session};
use crate::ui;

#[derive(clap::Args, Debug, Default)]
pub struct Update {
    /// Do not ask before downloading
    #[arg(short, long)]
    pub yes: bool,
}

impl Update {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let mut session = open_session(config).await?;
        let check = session.check().await;
        ui::print_status(&session.snapshot());
        check?;

        if session.state() != Some(LauncherState::Waiting) {
            return Ok(());
        }
        if !self.yes && !ui::confirm(&download_prompt(&session), true)? {
            println!("Skipped.");
            return Ok(());
        }
        let result = download_with_progress(&mut session).await;
        ui::print_status(&session.snapshot());
        result.map(|_| ())
    }
}

pub(crate) fn download_prompt(session: &Session) -> String {
    let snapshot = session.snapshot();
    match (snapshot.intent, snapshot.remote_version) {
        (Some(UpdateIntent::Update), Some(remote)) => format!("Update to version {remote}?"),
        (Some(UpdateIntent::Update), None) => "Download the update now?".to_string(),
        _ => format!(
            "Download and install into {}?",
            session.location().root.display()
        ),
    }
}
