//! hostprep - main entry point

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use hostprep::cli::{Cli, Commands, ConfigCommands};
use hostprep::{
    ensure_data_dir, process_guard, sanity, BootstrapOutcome, InstallReport, ProvisionConfig,
    SiteInstaller,
};

/// Initialize logging: info by default, -v/-vv raise it, RUST_LOG overrides both
fn init_logger(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Child commands get SIGTERM if we are interrupted mid-run
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    if cli.dry_run {
        hostprep::enable_dry_run();
        info!("Dry-run mode enabled");
    }

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ProvisionConfig::load_from_file(path)?
        }
        None => ProvisionConfig::default(),
    };
    cli.apply_overrides(&mut config);
    debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Bootstrap { .. } => {
            config.validate().context("Invalid configuration")?;
            ensure_data_dir(&config.data_dir, cli.dry_run);
        }
        Commands::InstallSites { .. } => {
            config.validate().context("Invalid configuration")?;
            let report = SiteInstaller::new(config).run()?;
            print_install_summary(&report);
        }
        Commands::Provision => {
            config.validate().context("Invalid configuration")?;
            let report = hostprep::provision(&config, cli.dry_run)?;
            if let BootstrapOutcome::Failed { path, reason } = &report.bootstrap {
                warn!("Continued without data directory {}: {}", path.display(), reason);
            }
            print_install_summary(&report.install);
        }
        Commands::Check { skip_root_check } => {
            let result = sanity::verify_environment(&config, skip_root_check);
            sanity::print_report(&result);
            if !result.is_ok() {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => run_config_command(action, &config)?,
    }

    Ok(())
}

fn run_config_command(action: ConfigCommands, config: &ProvisionConfig) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration")?;
            println!("{}", json);
        }
        ConfigCommands::Validate { file } => {
            let loaded = ProvisionConfig::load_from_file(&file)?;
            loaded.validate()?;
            println!("✓ Configuration file is valid: {}", file.display());
        }
        ConfigCommands::Init { file, force } => {
            if file.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", file.display());
            }
            ProvisionConfig::default().save_to_file(&file)?;
            println!("✓ Wrote default configuration to {}", file.display());
        }
    }
    Ok(())
}

fn print_install_summary(report: &InstallReport) {
    let prefix = if report.dry_run { "[DRY RUN] " } else { "" };
    println!(
        "{}✓ Installed {} site config(s), {} link(s), {} cron script(s)",
        prefix,
        report.sites.len(),
        report.links.len(),
        report.cron_scripts.len()
    );
}
