//! Site installer state machine
//!
//! Tracks which step of the site-config installer is running so that a
//! failure can be attributed to the stage it happened in. Stages only move
//! forward one step at a time; any non-terminal stage may move to `Failed`.
//!
//! ```text
//! NotStarted
//!     ↓
//! RemovingDefaults
//!     ↓
//! CopyingSites
//!     ↓
//! RestartingServer
//!     ↓
//! InstallingCronScripts
//!     ↓
//! Completed
//!
//! (Any non-terminal stage can transition to Failed)
//! ```

use std::fmt;

use thiserror::Error;
use tracing::debug;

/// Installer stages in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum InstallStage {
    /// Nothing has run yet
    #[default]
    NotStarted = 0,

    /// Step 1: deleting the stock `default` site configs
    RemovingDefaults = 1,

    /// Step 2: copying site configs and enabling them
    CopyingSites = 2,

    /// Step 3: restarting the web server
    RestartingServer = 3,

    /// Step 4: copying scripts into cron.daily
    InstallingCronScripts = 4,

    /// All steps finished (terminal)
    Completed = 5,

    /// A step failed (terminal)
    Failed = 255,
}

impl InstallStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true for `Completed` and `Failed`
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the next stage in the sequence, or None at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::RemovingDefaults),
            Self::RemovingDefaults => Some(Self::CopyingSites),
            Self::CopyingSites => Some(Self::RestartingServer),
            Self::RestartingServer => Some(Self::InstallingCronScripts),
            Self::InstallingCronScripts => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::RemovingDefaults => "Removing default site configs",
            Self::CopyingSites => "Installing site configs",
            Self::RestartingServer => "Restarting web server",
            Self::InstallingCronScripts => "Installing cron scripts",
            Self::Completed => "Site installation complete",
            Self::Failed => "Site installation failed",
        }
    }

    /// Returns all stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::RemovingDefaults,
            Self::CopyingSites,
            Self::RestartingServer,
            Self::InstallingCronScripts,
            Self::Completed,
        ]
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during stage transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage { from: InstallStage, to: InstallStage },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: InstallStage, to: InstallStage },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

impl From<InstallTransitionError> for crate::error::ProvisionError {
    fn from(err: InstallTransitionError) -> Self {
        Self::InstallTransition(err.to_string())
    }
}

/// Owns the current installer stage and validates every transition.
///
/// ```
/// use hostprep::install_state::{InstallStage, InstallerContext};
///
/// let mut ctx = InstallerContext::new();
/// ctx.transition_to(InstallStage::RemovingDefaults).unwrap();
/// assert!(ctx.transition_to(InstallStage::RestartingServer).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstallerContext {
    current: InstallStage,
    failed_at: Option<InstallStage>,
    history: Vec<InstallStage>,
}

impl InstallerContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    /// Stage that was running when `fail()` was called
    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Completed
    }

    /// Every stage entered so far, in order
    pub fn history(&self) -> &[InstallStage] {
        &self.history
    }

    /// Move to `target`, which must be the immediate successor of the current stage.
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }
        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }
        if target != InstallStage::Failed && target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }
        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        debug!("Installer stage: {} -> {}", self.current, target);
        self.history.push(target);
        self.current = target;
        Ok(target)
    }

    /// Mark the run as failed, remembering which stage was active.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }
        debug!("Installer stage: {} -> {}", self.current, InstallStage::Failed);
        self.failed_at = Some(self.current);
        self.history.push(InstallStage::Failed);
        self.current = InstallStage::Failed;
        Ok(())
    }
}
