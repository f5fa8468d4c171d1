// lpad/src/ui.rs
//! Terminal prompts, progress bar and status lines.
use std::path::PathBuf;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use lpad_common::error::{LpadError, Result};
use lpad_common::state::{LauncherState, StatusSnapshot};
use lpad_core::{DirectoryPicker, LocationRejection};
use tracing::debug;

/// Percentage bar for archive downloads; length is fixed at 100.
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| LpadError::Generic(format!("Prompt failed: {e}")))
}

pub fn print_status(snapshot: &StatusSnapshot) {
    let label = match snapshot.state {
        Some(LauncherState::Ready) => "Ready".green().bold(),
        Some(LauncherState::Failed) => "Failed".red().bold(),
        Some(LauncherState::Waiting) => "Waiting".yellow().bold(),
        Some(LauncherState::Downloading) => "Downloading".blue().bold(),
        Some(LauncherState::Installing) => "Installing".blue().bold(),
        None => "Idle".normal(),
    };
    println!("{}{}: {}", "==> ".bold().blue(), label, snapshot.message);
    if let Some(local) = snapshot.local_version {
        println!("    installed: {local}");
    }
    if let Some(remote) = snapshot.remote_version {
        println!("    available: {remote}");
    }
}

/// Asks for a directory on stdin. An empty answer or a closed terminal
/// counts as cancelling.
pub struct TerminalPicker {
    suggestion: PathBuf,
}

impl TerminalPicker {
    pub fn new(suggestion: PathBuf) -> Self {
        Self { suggestion }
    }
}

impl DirectoryPicker for TerminalPicker {
    fn pick(&mut self, rejection: Option<&LocationRejection>) -> Option<PathBuf> {
        match rejection {
            Some(reason) => eprintln!("{} {}", "Warning:".yellow(), reason),
            None => println!(
                "{}{}",
                "==> ".bold().blue(),
                "Choose where the application should be installed.".bold()
            ),
        }
        let answer = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Install location")
            .default(self.suggestion.display().to_string())
            .allow_empty(true)
            .interact_text();
        match answer {
            Ok(text) if !text.trim().is_empty() => Some(PathBuf::from(text.trim())),
            Ok(_) => None,
            Err(e) => {
                debug!("Directory prompt aborted: {}", e);
                None
            }
        }
    }
}
