//! Contains the logic for the `location` commands.
use std::env;
use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::Result;
use lpad_core::{InstallLocationResolver, Session};

#[derive(Subcommand, Debug)]
pub enum LocationCommand {
    /// Print the current install location
    Show,
    /// Move the installed application to another directory
    Set {
        /// Existing directory to install into
        dir: PathBuf,
    },
}

impl LocationCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Show => show(config),
            Self::Set { dir } => set(config, dir.clone()).await,
        }
    }
}

fn show(config: &Config) -> Result<()> {
    let mut resolver = InstallLocationResolver::new(config);
    match resolver.current()? {
        Some(location) => {
            let payload = location.payload(config);
            println!("{}", location.root.display());
            if !payload.is_present() {
                println!("    (nothing installed there yet)");
            }
        }
        None => println!(
            "No install location chosen yet. Run `lpad` or `lpad location set <dir>`."
        ),
    }
    Ok(())
}

async fn set(config: &Config, dir: PathBuf) -> Result<()> {
    let dir = if dir.is_absolute() {
        dir
    } else {
        env::current_dir()?.join(dir)
    };

    let mut resolver = InstallLocationResolver::new(config);
    match resolver.current()? {
        Some(current) => {
            let mut session = Session::from_config(config.clone(), current)?;
            session.change_location(&mut resolver, &dir).await?;
        }
        None => {
            resolver.change_location(&dir).await?;
        }
    }
    println!(
        "{}Install location set to {}",
        "==> ".bold().blue(),
        dir.display().to_string().bold()
    );
    Ok(())
}
