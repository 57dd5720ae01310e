use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "pipbot", about = "Telegram bot for Python package management and script runs", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the Telegram bot (default).
    Serve,
    /// List installed packages.
    Packages,
    /// Install one or more packages.
    Install {
        #[arg(value_name = "PACKAGE", required = true)]
        packages: Vec<String>,
    },
    /// Uninstall a package.
    Uninstall {
        #[arg(value_name = "PACKAGE")]
        package: String,
    },
    /// Upgrade a package to its latest release.
    Update {
        #[arg(value_name = "PACKAGE")]
        package: String,
    },
    /// Report manifest requirements that are missing and packages that are outdated.
    Check,
    /// Show environment status.
    Status,
    /// Install a script's imports, then run it with the execution timeout.
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
