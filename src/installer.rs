//! Site-config installer
//!
//! Runs the four installer steps in order against the paths in
//! [`ProvisionConfig`]:
//!
//! 1. remove the stock `default` site configs
//! 2. copy every regular file from the source directory into
//!    `sites-available` and enable it with a symlink in `sites-enabled`
//! 3. restart the web server
//! 4. copy the cron scripts into `cron.daily`
//!
//! The first failure stops the run. Nothing is rolled back; whatever the
//! earlier steps changed stays changed.

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::command_runner::{CommandOutput, CommandRunner};
use crate::commands::{ExternalCommand, RestartArgs, SymlinkArgs};
use crate::config_file::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use crate::install_state::{InstallStage, InstallerContext};
use crate::types::SymlinkMode;

/// Mode given to scripts copied into cron.daily (run-parts skips non-executables)
const CRON_SCRIPT_MODE: u32 = 0o755;

/// A site config copied into `sites-available`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledSite {
    pub name: OsString,
    pub available: PathBuf,
}

/// Everything a successful installer run did
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub removed_defaults: Vec<PathBuf>,
    pub sites: Vec<InstalledSite>,
    /// Links created (or already in place) in `sites-enabled`
    pub links: Vec<PathBuf>,
    pub restart: CommandOutput,
    pub cron_scripts: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Installer instance
pub struct SiteInstaller {
    config: ProvisionConfig,
    runner: CommandRunner,
}

impl SiteInstaller {
    /// Create an installer that follows the global dry-run switch
    pub fn new(config: ProvisionConfig) -> Self {
        let runner = CommandRunner::new(config.privilege_command.clone());
        Self { config, runner }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.runner = self.runner.with_dry_run(dry_run);
        self
    }

    fn dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// Run every step in order. The error of a failed step carries its stage.
    pub fn run(&self) -> Result<InstallReport> {
        let mut ctx = InstallerContext::new();

        ctx.transition_to(InstallStage::RemovingDefaults)?;
        let removed_defaults = self.remove_defaults().or_else(|e| fail(&mut ctx, e))?;

        ctx.transition_to(InstallStage::CopyingSites)?;
        let (sites, links) = self.install_sites().or_else(|e| fail(&mut ctx, e))?;

        ctx.transition_to(InstallStage::RestartingServer)?;
        let restart = self.restart_server().or_else(|e| fail(&mut ctx, e))?;

        ctx.transition_to(InstallStage::InstallingCronScripts)?;
        let cron_scripts = self.install_cron_scripts().or_else(|e| fail(&mut ctx, e))?;

        ctx.transition_to(InstallStage::Completed)?;
        info!(
            "Site installation complete: {} site(s), {} link(s), {} cron script(s)",
            sites.len(),
            links.len(),
            cron_scripts.len()
        );

        Ok(InstallReport {
            removed_defaults,
            sites,
            links,
            restart,
            cron_scripts,
            dry_run: self.dry_run(),
        })
    }

    /// Step 1: delete the stock site configs that exist and are readable.
    pub fn remove_defaults(&self) -> Result<Vec<PathBuf>> {
        let defaults = [
            ("sites-available", &self.config.default_available),
            ("sites-enabled", &self.config.default_enabled),
        ];

        let mut removed = Vec::new();
        for (label, path) in defaults {
            if !is_removable(path) {
                debug!("No default {} config at {}", label, path.display());
                continue;
            }

            println!("Removing default {}...", label);
            if self.dry_run() {
                info!("[DRY RUN] Would remove {}", path.display());
            } else {
                fs::remove_file(path)
                    .map_err(|e| ProvisionError::io("Failed to remove", path, e))?;
                info!("Removed {}", path.display());
            }
            removed.push(path.clone());
        }
        Ok(removed)
    }

    /// Step 2: copy regular files from the source directory and enable them.
    pub fn install_sites(&self) -> Result<(Vec<InstalledSite>, Vec<PathBuf>)> {
        let source = &self.config.sites_source;
        let mut entries = fs::read_dir(source)
            .map_err(|e| ProvisionError::io("Failed to list", source, e))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| ProvisionError::io("Failed to list", source, e))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut sites = Vec::new();
        let mut links = Vec::new();

        for entry in entries {
            let path = entry.path();
            if !path.is_file() {
                debug!("Skipping non-file entry {}", path.display());
                continue;
            }
            let name = entry.file_name();
            let available = self.config.sites_available.join(&name);

            if self.dry_run() {
                println!("[DRY RUN] Would copy {} to {}", path.display(), available.display());
            } else {
                fs::copy(&path, &available)
                    .map_err(|e| ProvisionError::io("Failed to copy", &path, e))?;
                info!("Copied {} to {}", path.display(), available.display());
            }

            if self.config.symlink_mode == SymlinkMode::PerFile {
                links.push(self.enable_site(&name)?);
            }
            sites.push(InstalledSite { name, available });
        }

        if self.config.symlink_mode == SymlinkMode::Single {
            println!("Adding symlinks...");
            links.push(self.enable_site(&self.config.single_site)?);
        }

        Ok((sites, links))
    }

    /// Link `sites-enabled/<name>` to `sites-available/<name>`.
    ///
    /// The link is attempted on every run. If `ln` fails because the same link
    /// is already in place the run continues; any other failure is returned.
    pub fn enable_site(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let name = name.as_ref();
        let args = SymlinkArgs {
            target: self.config.sites_available.join(name),
            link: self.config.sites_enabled.join(name),
        };

        let output = self.runner.run_command_safe(&args)?;
        if !output.success {
            if link_points_to(&args.link, &args.target) {
                warn!(
                    "{} already links to {}; keeping it",
                    args.link.display(),
                    args.target.display()
                );
            } else {
                output.ensure_success()?;
            }
        } else if !output.dry_run {
            debug!("Enabled {}", args.display());
        }
        Ok(args.link)
    }

    /// Step 3: restart the web server, whether or not anything was copied.
    pub fn restart_server(&self) -> Result<CommandOutput> {
        println!("Restarting {}...", self.config.service_name());
        let args = RestartArgs {
            argv: self.config.restart_command.clone(),
        };
        let output = self.runner.run_command_safe(&args)?;
        output.ensure_success()?;
        Ok(output)
    }

    /// Step 4: copy the cron scripts into cron.daily, overwriting.
    pub fn install_cron_scripts(&self) -> Result<Vec<PathBuf>> {
        let cron_daily = &self.config.cron_daily;
        println!("Copying cron scripts to {}...", cron_daily.display());

        let mut installed = Vec::new();
        for script in &self.config.cron_scripts {
            let source = self.config.scripts_dir().join(script);
            let dest = cron_daily.join(script);

            if self.dry_run() {
                if !source.is_file() {
                    return Err(ProvisionError::io(
                        "Failed to copy",
                        &source,
                        std::io::Error::from(std::io::ErrorKind::NotFound),
                    ));
                }
                println!("[DRY RUN] Would copy {} to {}", source.display(), dest.display());
            } else {
                fs::copy(&source, &dest)
                    .map_err(|e| ProvisionError::io("Failed to copy", &source, e))?;
                fs::set_permissions(&dest, fs::Permissions::from_mode(CRON_SCRIPT_MODE))
                    .map_err(|e| ProvisionError::io("Failed to set permissions on", &dest, e))?;
                info!("Installed cron script {}", dest.display());
            }
            installed.push(dest);
        }
        Ok(installed)
    }
}

/// Record the failure on the stage machine and tag the error with the stage.
fn fail<T>(ctx: &mut InstallerContext, err: ProvisionError) -> Result<T> {
    let stage = ctx.current_stage();
    ctx.fail()?;
    Err(err.in_stage(stage))
}

/// A default config is removed only when it is an existing, readable file.
fn is_removable(path: &Path) -> bool {
    path.is_file() && fs::File::open(path).is_ok()
}

fn link_points_to(link: &Path, target: &Path) -> bool {
    match (fs::canonicalize(link), fs::canonicalize(target)) {
        (Ok(resolved), Ok(expected)) => resolved == expected,
        _ => fs::read_link(link).is_ok_and(|dest| dest == target),
    }
}
