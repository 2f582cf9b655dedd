//! Data directory bootstrapper
//!
//! Creates the node's data directory if it is missing. Creation failures are
//! reported and swallowed: a host without the directory is still worth
//! configuring, so the caller always continues.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// What `ensure_data_dir` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The directory was already there; nothing was reported
    AlreadyPresent,
    /// The directory was created (or would have been, in dry-run)
    Created { path: PathBuf, dry_run: bool },
    /// Creation failed; the reason was logged and printed
    Failed { path: PathBuf, reason: String },
}

impl BootstrapOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Create `path` (non-recursively) unless it already is a directory.
pub fn ensure_data_dir(path: &Path, dry_run: bool) -> BootstrapOutcome {
    if path.is_dir() {
        debug!("Data directory {} already exists", path.display());
        return BootstrapOutcome::AlreadyPresent;
    }

    if dry_run {
        info!("[DRY RUN] Would create directory {}", path.display());
        println!("[DRY RUN] Would create directory: {}", path.display());
        return BootstrapOutcome::Created {
            path: path.to_path_buf(),
            dry_run: true,
        };
    }

    match fs::create_dir(path) {
        Ok(()) => {
            info!("Created data directory {}", path.display());
            println!("Directory created: {}", path.display());
            BootstrapOutcome::Created {
                path: path.to_path_buf(),
                dry_run: false,
            }
        }
        Err(e) => {
            error!("Failed to create directory {}: {}", path.display(), e);
            eprintln!("Error creating directory: {}", path.display());
            BootstrapOutcome::Failed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}
