//! Type-safe external command execution
//!
//! [`CommandRunner::run_command_safe`] is the only place hostprep spawns
//! external programs. It adds the privilege prefix, isolates the child in
//! its own process group and keeps the child registered for signal cleanup
//! while it runs. In dry-run mode nothing is spawned.

use crate::commands::ExternalCommand;
use crate::error::{ProvisionError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use std::ffi::OsString;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Skip every mutating operation from now on (logged instead)
pub fn enable_dry_run() {
    DRY_RUN.store(true, Ordering::SeqCst);
}

pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Output from an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Command line as executed, including the privilege prefix.
    pub command_line: String,
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
    /// True if the command was skipped because dry-run is enabled.
    pub dry_run: bool,
}

impl CommandOutput {
    /// Turn a non-zero exit into [`ProvisionError::Command`].
    pub fn ensure_success(&self) -> Result<()> {
        if self.success {
            return Ok(());
        }
        Err(ProvisionError::Command {
            program: self.command_line.clone(),
            code: self.exit_code.unwrap_or(-1),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Build the argv for `args`, prefixed with `privilege` when given.
pub fn command_line<T: ExternalCommand>(privilege: Option<&str>, args: &T) -> Vec<OsString> {
    let mut argv = Vec::new();
    if let Some(prefix) = privilege {
        argv.push(OsString::from(prefix));
    }
    argv.push(OsString::from(args.program()));
    argv.extend(args.to_cli_args());
    argv
}

/// Runs external commands with a fixed privilege prefix and dry-run setting.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    privilege: Option<String>,
    dry_run: bool,
}

impl CommandRunner {
    /// Runner that follows the global dry-run switch
    pub fn new(privilege: Option<String>) -> Self {
        Self {
            privilege,
            dry_run: is_dry_run(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute an external command and wait for it.
    ///
    /// A non-zero exit is reported in the returned [`CommandOutput`], not as an
    /// error; callers decide whether it is fatal. Spawn failures are errors.
    pub fn run_command_safe<T: ExternalCommand>(&self, args: &T) -> Result<CommandOutput> {
        if args.program().trim().is_empty() {
            return Err(ProvisionError::validation("command has no program"));
        }

        let argv = command_line(self.privilege.as_deref(), args);
        let rendered = argv
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        let env_vars = args.get_env_vars();

        if self.dry_run {
            info!("[DRY RUN] Skipped: {}", rendered);
            return Ok(CommandOutput {
                command_line: rendered.clone(),
                stdout: format!("[DRY RUN] Skipped: {}\n", rendered),
                stderr: String::new(),
                exit_code: Some(0),
                success: true,
                dry_run: true,
            });
        }

        info!("run_command_safe: {} env={:?}", rendered, env_vars);

        let program = argv[0].to_string_lossy().into_owned();
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group();
        for (key, value) in &env_vars {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|source| ProvisionError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = waited.map_err(|source| ProvisionError::Spawn {
            program: program.clone(),
            source,
        })?;

        let exit_code = output.status.code();
        debug!("{} exited with {:?}", rendered, exit_code);

        Ok(CommandOutput {
            command_line: rendered,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
            success: output.status.success(),
            dry_run: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RestartArgs;

    fn restart(argv: &[&str]) -> RestartArgs {
        RestartArgs {
            argv: argv.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_command_line_with_privilege() {
        let args = restart(&["service", "nginx", "restart"]);
        assert_eq!(
            command_line(Some("sudo"), &args),
            vec!["sudo", "service", "nginx", "restart"]
        );
        assert_eq!(command_line(None, &args), vec!["service", "nginx", "restart"]);
    }

    #[test]
    fn test_run_captures_stdout() {
        let output = CommandRunner::default()
            .run_command_safe(&restart(&["echo", "reloaded"]))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "reloaded");
        assert!(output.ensure_success().is_ok());
    }

    #[test]
    fn test_nonzero_exit_is_reported() {
        let output = CommandRunner::default()
            .run_command_safe(&restart(&["false"]))
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(1));

        let err = output.ensure_success().unwrap_err();
        assert!(matches!(err, ProvisionError::Command { code: 1, .. }));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = CommandRunner::default()
            .run_command_safe(&restart(&["hostprep-no-such-program"]))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Spawn { .. }));
    }

    #[test]
    fn test_dry_run_does_not_spawn() {
        let runner = CommandRunner::new(Some("sudo".to_string())).with_dry_run(true);
        let output = runner
            .run_command_safe(&restart(&["hostprep-no-such-program"]))
            .unwrap();
        assert!(output.dry_run);
        assert!(output.success);
        assert_eq!(output.command_line, "sudo hostprep-no-such-program");
        assert!(output.stdout.contains("[DRY RUN]"));
    }

    #[test]
    fn test_empty_argv_is_rejected() {
        let err = CommandRunner::default()
            .run_command_safe(&restart(&[]))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Validation(_)));
    }
}
