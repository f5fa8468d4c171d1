// lpad/src/cli.rs
//! Command-line surface of the launcher.
use clap::{ArgAction, Parser, Subcommand};
use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_common::version::Version;
use lpad_core::{InstallLocationResolver, Session};
use tracing::warn;

pub mod check;
pub mod launch;
pub mod location;
pub mod run;
pub mod update;

use crate::cli::check::Check;
use crate::cli::launch::Launch;
use crate::cli::location::LocationCommand;
use crate::cli::run::Run;
use crate::cli::update::Update;
use crate::ui;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "lpad", bin_name = "lpad")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check for updates, install them and launch (default)
    Run(Run),
    /// Compare the installed version with the published one
    Check(Check),
    /// Download and install the published version if it is newer
    Update(Update),
    /// Start the installed application
    Launch(Launch),
    /// Show or change the install location
    #[command(subcommand)]
    Location(LocationCommand),
}

impl Default for Command {
    fn default() -> Self {
        Self::Run(Run::default())
    }
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Run(command) => command.run(config).await,
            Self::Check(command) => command.run(config).await,
            Self::Update(command) => command.run(config).await,
            Self::Launch(command) => command.run(config).await,
            Self::Location(command) => command.run(config).await,
        }
    }
}

/// Resolves the install location (prompting on first run) and builds a
/// session for it.
pub(crate) async fn open_session(config: &Config) -> Result<Session> {
    let mut resolver = InstallLocationResolver::new(config);
    let mut picker = ui::TerminalPicker::new(config.launcher_dir.clone());
    let location = resolver.resolve(&mut picker).await?;
    Session::from_config(config.clone(), location)
}

/// Runs Waiting → Downloading → Installing with a progress bar. Ctrl-C
/// cancels the transfer.
pub(crate) async fn download_with_progress(session: &mut Session) -> Result<Version> {
    let handle = session.begin_download().await?;
    let cancel = handle.cancel_handle();

    let bar = ui::create_progress_bar();
    let mut status = session.subscribe();
    let watcher = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let snapshot = status.borrow_and_update().clone();
                if let Some(percent) = snapshot.progress {
                    bar.set_position(u64::from(percent));
                }
                bar.set_message(snapshot.message);
                if snapshot.state.is_some_and(|s| s.is_terminal()) {
                    break;
                }
            }
        })
    };
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling download");
            cancel.cancel();
        }
    });

    let result = session.finish_download(handle).await;

    interrupt.abort();
    watcher.abort();
    bar.finish_and_clear();
    result
}
