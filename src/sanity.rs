//! Pre-flight sanity checks for the runtime environment
//!
//! Verifies before anything is touched that:
//! - the programs the installer invokes are on `PATH`
//! - we run with root privileges (EUID 0), unless told not to care
//!
//! The `check` subcommand prints the result; a failed check exits 1.

use crate::config_file::ProvisionConfig;
use std::path::Path;
use tracing::{debug, warn};

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
    pub root_required: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && (self.is_root || !self.root_required)
    }
}

/// Programs the configured run will invoke
pub fn required_binaries(config: &ProvisionConfig) -> Vec<String> {
    let mut binaries = vec!["ln".to_string()];
    if let Some(program) = config.restart_command.first() {
        binaries.push(program.clone());
    }
    if let Some(ref privilege) = config.privilege_command {
        binaries.push(privilege.clone());
    }
    binaries.dedup();
    binaries
}

/// Check if a program is available, either as a path or on `PATH`
pub fn binary_exists(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
        .unwrap_or(false)
}

fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Set HOSTPREP_SKIP_ROOT_CHECK=1 to skip the root check
pub fn should_skip_root_check() -> bool {
    std::env::var("HOSTPREP_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Perform all checks and return the result
pub fn verify_environment(config: &ProvisionConfig, skip_root: bool) -> SanityCheckResult {
    debug!("Running pre-flight checks (skip_root={})", skip_root);

    let missing_binaries: Vec<String> = required_binaries(config)
        .into_iter()
        .filter(|binary| !binary_exists(binary))
        .collect();

    let root_required = !(skip_root || should_skip_root_check());
    if !root_required {
        warn!("Root check skipped");
    }

    SanityCheckResult {
        missing_binaries,
        is_root: is_running_as_root(),
        root_required,
    }
}

/// Print the check result for the `check` subcommand
pub fn print_report(result: &SanityCheckResult) {
    if result.is_ok() {
        println!("✓ Pre-flight checks passed");
        return;
    }

    eprintln!("✗ Pre-flight checks failed");
    if result.root_required && !result.is_root {
        eprintln!("  • Root privileges required (run with sudo or as root)");
    }
    for binary in &result.missing_binaries {
        eprintln!("  • Missing program: {}", binary);
    }
}
