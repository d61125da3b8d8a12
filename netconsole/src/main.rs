use anyhow::{Context, Result};
use clap::Parser;
use netconsole::config::{load_or_default, ConsoleConfig};

mod cli;
mod config_cmd;
mod edit_cmd;
mod show_cmd;

use cli::{Cli, Command, GlobalArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let mut config = load_or_default(cli.global.config.as_deref())
        .context("failed to load console config")?;
    apply_overrides(&mut config, &cli.global);

    match cli.command {
        Command::List(args) => show_cmd::run_list(args, &config),
        Command::Show(args) => show_cmd::run_show(args, &config),
        Command::Nameservers(args) => show_cmd::run_nameservers(args, &config),
        Command::Static(args) => edit_cmd::run_static(args, &config),
        Command::Dhcp(args) => edit_cmd::run_dhcp(args, &config),
        Command::Manual(args) => edit_cmd::run_manual(args, &config),
        Command::Default(args) => {
            config_cmd::run_default(args, cli.global.config.as_deref(), &config)
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(config: &mut ConsoleConfig, global: &GlobalArgs) {
    if let Some(path) = &global.interfaces {
        config.paths.interfaces = Some(path.clone());
    }
    if let Some(path) = &global.resolv_conf {
        config.paths.resolv_conf = Some(path.clone());
    }
    if let Some(path) = &global.dhcp_state_dir {
        config.paths.dhcp_state_dir = Some(path.clone());
    }
}
