//! Contains the logic for the `launch` command.
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_core::Session;
use tracing::debug;

use crate::cli::open_session;
use crate::ui;

#[derive(clap::Args, Debug)]
pub struct Launch;

impl Launch {
    /// Launching is only allowed once a check has confirmed the installed
    /// version is current.
    pub async fn run(&self, config: &Config) -> Result<()> {
        let mut session = open_session(config).await?;
        let check = session.check().await;
        ui::print_status(&session.snapshot());
        check?;
        start(&session)
    }
}

pub(crate) fn start(session: &Session) -> Result<()> {
    let child = session.launch()?;
    debug!("Launched child process {}", child.id());
    println!(
        "{}{} {}",
        "==> ".bold().blue(),
        "Launched".green().bold(),
        session.payload().executable.display()
    );
    Ok(())
}
