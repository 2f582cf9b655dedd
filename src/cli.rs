use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config_file::ProvisionConfig;
use crate::types::SymlinkMode;

/// hostprep - provision a node host running nginx
#[derive(Parser, Debug)]
#[command(name = "hostprep")]
#[command(about = "Bootstrap the node data directory and install nginx site configs")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be done without changing anything.
    ///
    /// Existence checks and directory listings still run so the preview is
    /// realistic; copies, removals and external commands are skipped.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// JSON configuration file (defaults are used for missing keys)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory if it is missing
    Bootstrap {
        /// Data directory to create
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Install site configs, restart the web server and install cron scripts
    InstallSites {
        /// Directory holding the site configs to install
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// How copied configs are enabled (per-file, single, none)
        #[arg(long)]
        symlink_mode: Option<SymlinkMode>,
    },
    /// Run bootstrap, then install-sites
    Provision,
    /// Verify required programs and privileges
    Check {
        /// Do not require root
        #[arg(long)]
        skip_root_check: bool,
    },
    /// Inspect or create configuration files
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as JSON
    Show,
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        file: PathBuf,
    },
    /// Write the default configuration to a file
    Init {
        /// Destination file
        file: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply per-command flag overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut ProvisionConfig) {
        match &self.command {
            Commands::Bootstrap { data_dir } => {
                if let Some(dir) = data_dir {
                    config.data_dir = dir.clone();
                }
            }
            Commands::InstallSites {
                source,
                symlink_mode,
            } => {
                if let Some(dir) = source {
                    config.sites_source = dir.clone();
                }
                if let Some(mode) = symlink_mode {
                    config.symlink_mode = *mode;
                }
            }
            Commands::Provision | Commands::Check { .. } | Commands::Config { .. } => {}
        }
    }
}
