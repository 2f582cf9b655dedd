//! Type-safe configuration types for hostprep

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How copied site configs are enabled in `sites-enabled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum SymlinkMode {
    /// One link per copied file, created right after the copy
    #[default]
    #[strum(serialize = "per-file")]
    PerFile,
    /// A single link for the configured site, created after all copies
    #[strum(serialize = "single")]
    Single,
    /// No links are created
    #[strum(serialize = "none")]
    None,
}
