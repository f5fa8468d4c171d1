//! Contains the logic for the `check` command.
use lpad_common::config::Config;
use lpad_common::error::Result;

use crate::cli::open_session;
use crate::ui;

#[derive(clap::Args, Debug)]
pub struct Check;

impl Check {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let mut session = open_session(config).await?;
        let result = session.check().await;
        ui::print_status(&session.snapshot());
        result.map(|_| ())
    }
}
