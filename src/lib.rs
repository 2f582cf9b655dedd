//! hostprep library
//!
//! Provisioning steps for a node host: bootstrap the data directory and
//! install nginx site configs together with their cron scripts.

pub mod bootstrap;
pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod config_file;
pub mod error;
pub mod install_state;
pub mod installer;
pub mod process_guard;
pub mod sanity;
pub mod types;

// Re-export main types for convenience
pub use bootstrap::{ensure_data_dir, BootstrapOutcome};
pub use command_runner::{enable_dry_run, is_dry_run, CommandOutput, CommandRunner};
pub use commands::{ExternalCommand, RestartArgs, SymlinkArgs};
pub use config_file::ProvisionConfig;
pub use error::ProvisionError;
pub use install_state::{InstallStage, InstallTransitionError, InstallerContext};
pub use installer::{InstallReport, InstalledSite, SiteInstaller};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use types::SymlinkMode;

/// Outcome of running both provisioning steps
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub bootstrap: BootstrapOutcome,
    pub install: InstallReport,
}

/// Bootstrap the data directory, then run the site installer.
///
/// A bootstrap failure is reported but does not stop the installer.
pub fn provision(config: &ProvisionConfig, dry_run: bool) -> error::Result<ProvisionReport> {
    let bootstrap = ensure_data_dir(&config.data_dir, dry_run);
    let install = SiteInstaller::new(config.clone())
        .with_dry_run(dry_run)
        .run()?;
    Ok(ProvisionReport { bootstrap, install })
}
