//! Tests for the site installer
//!
//! These run the full installer against a sandbox directory tree with no
//! privilege prefix and `true`/`false` standing in for the service restart.

use hostprep::{
    provision, BootstrapOutcome, InstallStage, ProvisionConfig, ProvisionError, SiteInstaller,
    SymlinkMode,
};
use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    _root: TempDir,
    config: ProvisionConfig,
}

impl Sandbox {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let base = root.path();
        for dir in ["sites-available", "sites-enabled", "nginx-sites", "cron.daily", "scripts"] {
            fs::create_dir(base.join(dir)).unwrap();
        }
        fs::write(base.join("scripts/renew-cert.sh"), "#!/bin/sh\ncertbot renew\n").unwrap();
        fs::write(base.join("scripts/backup-qtum.sh"), "#!/bin/sh\ntar czf q.tgz .qtum\n").unwrap();

        let config = ProvisionConfig {
            data_dir: base.join(".qtum"),
            default_available: base.join("sites-available/default"),
            default_enabled: base.join("sites-enabled/default"),
            sites_source: base.join("nginx-sites"),
            sites_available: base.join("sites-available"),
            sites_enabled: base.join("sites-enabled"),
            symlink_mode: SymlinkMode::PerFile,
            cron_daily: base.join("cron.daily"),
            scripts_dir: Some(base.join("scripts")),
            privilege_command: None,
            restart_command: vec!["true".to_string()],
            ..ProvisionConfig::default()
        };
        Self {
            _root: root,
            config,
        }
    }

    fn add_site(&self, name: &str, body: &str) {
        fs::write(self.config.sites_source.join(name), body).unwrap();
    }

    fn installer(&self) -> SiteInstaller {
        SiteInstaller::new(self.config.clone()).with_dry_run(false)
    }
}

/// Sorted (relative path, kind, content-or-link-target) for every entry under `dir`
fn snapshot(dir: &Path) -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(dir).unwrap().to_path_buf();
            let meta = fs::symlink_metadata(&path).unwrap();
            if meta.file_type().is_symlink() {
                out.push((rel, format!("link:{}", fs::read_link(&path).unwrap().display())));
            } else if meta.is_dir() {
                out.push((rel, "dir".to_string()));
                stack.push(path);
            } else {
                out.push((rel, format!("file:{}", fs::read_to_string(&path).unwrap())));
            }
        }
    }
    out.sort();
    out
}

// =============================================================================
// Default config removal
// =============================================================================

#[test]
fn test_removes_readable_defaults() {
    let sandbox = Sandbox::new();
    fs::write(&sandbox.config.default_available, "server { listen 80 default_server; }").unwrap();
    fs::write(&sandbox.config.default_enabled, "server { listen 80 default_server; }").unwrap();

    let removed = sandbox.installer().remove_defaults().unwrap();

    assert_eq!(removed.len(), 2);
    assert!(!sandbox.config.default_available.exists());
    assert!(!sandbox.config.default_enabled.exists());
}

#[test]
fn test_absent_defaults_leave_filesystem_unchanged() {
    let sandbox = Sandbox::new();
    let before = snapshot(sandbox._root.path());

    let removed = sandbox.installer().remove_defaults().unwrap();

    assert!(removed.is_empty());
    assert_eq!(snapshot(sandbox._root.path()), before);
}

// =============================================================================
// Site copy and enable
// =============================================================================

#[test]
fn test_every_regular_file_is_copied_and_linked() {
    let sandbox = Sandbox::new();
    sandbox.add_site("node", "server { listen 443 ssl; }");
    sandbox.add_site("explorer", "server { listen 8080; }");
    fs::create_dir(sandbox.config.sites_source.join("snippets")).unwrap();

    let report = sandbox.installer().run().unwrap();

    let names: Vec<&OsStr> = report.sites.iter().map(|s| s.name.as_os_str()).collect();
    assert_eq!(names, vec!["explorer", "node"]);

    for name in ["node", "explorer"] {
        let source = fs::read(sandbox.config.sites_source.join(name)).unwrap();
        let available = sandbox.config.sites_available.join(name);
        assert_eq!(fs::read(&available).unwrap(), source);

        let link = sandbox.config.sites_enabled.join(name);
        assert_eq!(fs::read_link(&link).unwrap(), available);
    }

    assert!(!sandbox.config.sites_available.join("snippets").exists());
    assert!(!sandbox.config.sites_enabled.join("snippets").exists());
}

#[test]
fn test_non_utf8_site_name_is_kept() {
    let sandbox = Sandbox::new();
    let name = OsStr::from_bytes(b"caf\xff");
    fs::write(sandbox.config.sites_source.join(name), "server { listen 8443; }").unwrap();

    let report = sandbox.installer().run().unwrap();

    assert_eq!(report.sites.len(), 1);
    assert_eq!(report.sites[0].name.as_bytes(), b"caf\xff");

    let available = sandbox.config.sites_available.join(name);
    assert_eq!(fs::read_to_string(&available).unwrap(), "server { listen 8443; }");
    let link = sandbox.config.sites_enabled.join(name);
    assert_eq!(fs::read_link(&link).unwrap(), available);

    let copied: Vec<_> = fs::read_dir(&sandbox.config.sites_available)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(copied, vec![name.to_os_string()]);
}

#[test]
fn test_copy_overwrites_existing_config() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.config.sites_available.join("node"), "stale").unwrap();
    sandbox.add_site("node", "fresh");

    sandbox.installer().run().unwrap();

    let content = fs::read_to_string(sandbox.config.sites_available.join("node")).unwrap();
    assert_eq!(content, "fresh");
}

#[test]
fn test_running_twice_matches_running_once() {
    let sandbox = Sandbox::new();
    sandbox.add_site("node", "server { listen 443 ssl; }");
    sandbox.add_site("explorer", "server { listen 8080; }");
    fs::write(&sandbox.config.default_available, "default").unwrap();

    sandbox.installer().run().unwrap();
    let once = snapshot(sandbox._root.path());

    let second = sandbox.installer().run().unwrap();
    assert_eq!(second.links.len(), 2);
    assert_eq!(snapshot(sandbox._root.path()), once);
}

#[test]
fn test_restart_runs_with_empty_source() {
    let sandbox = Sandbox::new();

    let report = sandbox.installer().run().unwrap();

    assert!(report.sites.is_empty());
    assert!(report.restart.success);
    assert!(!report.restart.dry_run);
    assert_eq!(report.cron_scripts.len(), 2);
}

// =============================================================================
// Failure ordering
// =============================================================================

#[test]
fn test_missing_source_fails_before_cron_step() {
    let sandbox = Sandbox::new();
    fs::remove_dir(&sandbox.config.sites_source).unwrap();

    let err = sandbox.installer().run().unwrap_err();

    assert_eq!(err.stage(), Some(InstallStage::CopyingSites));
    let cause = std::error::Error::source(&err).unwrap();
    assert!(cause.to_string().contains("nginx-sites"));
    assert_eq!(fs::read_dir(&sandbox.config.cron_daily).unwrap().count(), 0);
}

#[test]
fn test_failed_restart_stops_before_cron_step() {
    let mut sandbox = Sandbox::new();
    sandbox.config.restart_command = vec!["false".to_string()];
    sandbox.add_site("node", "server {}");

    let err = sandbox.installer().run().unwrap_err();

    assert_eq!(err.stage(), Some(InstallStage::RestartingServer));
    match err {
        ProvisionError::Stage { source, .. } => {
            assert!(matches!(*source, ProvisionError::Command { code: 1, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // No rollback: the copy from step 2 stays
    assert!(sandbox.config.sites_available.join("node").exists());
    assert_eq!(fs::read_dir(&sandbox.config.cron_daily).unwrap().count(), 0);
}

#[test]
fn test_missing_cron_script_fails_in_cron_stage() {
    let mut sandbox = Sandbox::new();
    sandbox.config.cron_scripts.push("missing.sh".to_string());

    let err = sandbox.installer().run().unwrap_err();

    assert_eq!(err.stage(), Some(InstallStage::InstallingCronScripts));
    // Scripts before the missing one were already copied
    assert!(sandbox.config.cron_daily.join("renew-cert.sh").exists());
}

// =============================================================================
// Dry run
// =============================================================================

#[test]
fn test_dry_run_changes_nothing() {
    let sandbox = Sandbox::new();
    sandbox.add_site("node", "server {}");
    fs::write(&sandbox.config.default_enabled, "default").unwrap();
    let before = snapshot(sandbox._root.path());

    let mut config = sandbox.config.clone();
    config.restart_command = vec!["hostprep-no-such-program".to_string()];
    let report = SiteInstaller::new(config).with_dry_run(true).run().unwrap();

    assert!(report.dry_run);
    assert!(report.restart.dry_run);
    assert_eq!(report.removed_defaults.len(), 1);
    assert_eq!(report.sites.len(), 1);
    assert_eq!(snapshot(sandbox._root.path()), before);
}

#[test]
fn test_dry_run_still_reports_missing_source() {
    let sandbox = Sandbox::new();
    fs::remove_dir(&sandbox.config.sites_source).unwrap();

    let err = sandbox.installer().with_dry_run(true).run().unwrap_err();
    assert_eq!(err.stage(), Some(InstallStage::CopyingSites));
}

// =============================================================================
// Provision (bootstrap + install)
// =============================================================================

#[test]
fn test_provision_creates_data_dir_and_installs() {
    let sandbox = Sandbox::new();
    sandbox.add_site("node", "server {}");

    let report = provision(&sandbox.config, false).unwrap();

    assert!(matches!(report.bootstrap, BootstrapOutcome::Created { dry_run: false, .. }));
    assert!(sandbox.config.data_dir.is_dir());
    assert_eq!(report.install.sites.len(), 1);
}

#[test]
fn test_provision_continues_after_bootstrap_failure() {
    let mut sandbox = Sandbox::new();
    sandbox.config.data_dir = sandbox._root.path().join("no-parent").join(".qtum");

    let report = provision(&sandbox.config, false).unwrap();

    assert!(report.bootstrap.is_failed());
    assert_eq!(report.install.cron_scripts.len(), 2);
}
