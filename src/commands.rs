//! Type-safe external command contracts.
//!
//! Each external program hostprep invokes gets a struct implementing
//! [`ExternalCommand`]. The struct definition is the contract: the argument
//! vector is built in one place instead of being assembled from strings at
//! every call site.

use std::ffi::OsString;
use std::path::PathBuf;

/// Trait for typed external command arguments.
///
/// - `program()`: executable name, resolved through `PATH`.
/// - `to_cli_args()`: arguments exactly as the program expects them. Paths stay
///   `OsString` so file names that are not valid UTF-8 reach the child intact.
/// - `get_env_vars()`: extra environment for the child.
///
/// The privilege prefix (`sudo`) is not part of the contract; the runner adds it.
pub trait ExternalCommand {
    fn program(&self) -> &str;

    fn to_cli_args(&self) -> Vec<OsString>;

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    /// Human-readable command line, used for logs and dry-run output
    fn display(&self) -> String {
        let mut parts = vec![self.program().to_string()];
        parts.extend(self.to_cli_args().iter().map(|arg| arg.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

// ============================================================================
// Symlink
// ============================================================================

/// `ln -s <target> <link>`: enable a site by linking it into `sites-enabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkArgs {
    /// Existing file the link points at.
    pub target: PathBuf,
    /// Path of the link to create.
    pub link: PathBuf,
}

impl ExternalCommand for SymlinkArgs {
    fn program(&self) -> &str {
        "ln"
    }

    fn to_cli_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-s"),
            self.target.clone().into_os_string(),
            self.link.clone().into_os_string(),
        ]
    }
}

// ============================================================================
// Service restart
// ============================================================================

/// Restart the web server, e.g. `service nginx restart`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartArgs {
    /// Full argv; the first element is the program.
    pub argv: Vec<String>,
}

impl ExternalCommand for RestartArgs {
    fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    fn to_cli_args(&self) -> Vec<OsString> {
        self.argv.iter().skip(1).map(OsString::from).collect()
    }
}
