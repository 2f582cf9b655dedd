//! Configuration file handling for provisioning settings.
//!
//! Every path the provisioning steps touch lives here. The defaults are the
//! paths of a stock Debian/Ubuntu nginx host running a qtum node.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::SymlinkMode;

/// Provisioning configuration that can be saved/loaded as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    // Bootstrapper
    pub data_dir: PathBuf,

    // Stock configs removed before installing
    pub default_available: PathBuf,
    pub default_enabled: PathBuf,

    // Site configs
    pub sites_source: PathBuf,
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub symlink_mode: SymlinkMode,
    pub single_site: String, // Only used with SymlinkMode::Single

    // Cron
    pub cron_daily: PathBuf,
    pub scripts_dir: Option<PathBuf>, // Where cron_scripts are looked up, cwd if unset
    pub cron_scripts: Vec<String>,

    // External commands
    pub privilege_command: Option<String>, // None runs commands directly
    pub restart_command: Vec<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/root/.qtum"),
            default_available: PathBuf::from("/etc/nginx/sites-available/default"),
            default_enabled: PathBuf::from("/etc/nginx/sites-enabled/default"),
            sites_source: PathBuf::from("./nginx-sites"),
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            symlink_mode: SymlinkMode::PerFile,
            single_site: "node".to_string(),
            cron_daily: PathBuf::from("/etc/cron.daily"),
            scripts_dir: None,
            cron_scripts: vec!["renew-cert.sh".to_string(), "backup-qtum.sh".to_string()],
            privilege_command: Some("sudo".to_string()),
            restart_command: vec![
                "service".to_string(),
                "nginx".to_string(),
                "restart".to_string(),
            ],
        }
    }
}

impl ProvisionConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file. Missing keys take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("data_dir", &self.data_dir),
            ("default_available", &self.default_available),
            ("default_enabled", &self.default_enabled),
            ("sites_source", &self.sites_source),
            ("sites_available", &self.sites_available),
            ("sites_enabled", &self.sites_enabled),
            ("cron_daily", &self.cron_daily),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
        }

        for script in &self.cron_scripts {
            if script.trim().is_empty() {
                anyhow::bail!("Cron script names must not be empty");
            }
            if script.contains('/') {
                anyhow::bail!("Cron script '{}' must be a bare file name", script);
            }
        }

        match self.restart_command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => anyhow::bail!("Restart command must name a program"),
        }

        if let Some(ref privilege) = self.privilege_command {
            if privilege.trim().is_empty() {
                anyhow::bail!("Privilege command must not be blank (omit it to run directly)");
            }
        }

        if self.symlink_mode == SymlinkMode::Single {
            let site = self.single_site.trim();
            if site.is_empty() {
                anyhow::bail!("single_site must be set when symlink_mode is 'single'");
            }
            if site.contains('/') {
                anyhow::bail!("single_site '{}' must be a bare file name", site);
            }
        }

        Ok(())
    }

    /// Directory the cron scripts are read from
    pub fn scripts_dir(&self) -> &Path {
        self.scripts_dir.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Short name of the web server, taken from the restart command
    ///
    /// `service nginx restart` and `systemctl restart nginx` both yield `nginx`.
    pub fn service_name(&self) -> &str {
        match self.restart_command.as_slice() {
            [program, service, ..] if program == "service" => service.as_str(),
            [program, verb, service, ..] if program == "systemctl" && verb == "restart" => {
                service.as_str()
            }
            [program, ..] => program.as_str(),
            [] => "web server",
        }
    }
}
