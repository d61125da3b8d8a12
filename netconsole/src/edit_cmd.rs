use std::env;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ifupdown_core::document::{nameserver_errors, static_errors};
use ifupdown_core::{load, serialize, write_file, ConfigError, InterfaceDocument};
use netconsole::config::ConsoleConfig;
use tracing::info;

use crate::cli::{EditArgs, StaticArgs};

pub fn run_static(args: StaticArgs, config: &ConsoleConfig) -> Result<()> {
    let nameservers: Vec<&str> = args.nameservers.iter().map(String::as_str).collect();
    let gateway = args.gateway.as_deref().filter(|g| !g.is_empty());

    let mut errors = static_errors(&args.address, &args.netmask, None);
    errors.extend(nameserver_errors(&nameservers));
    if errors.is_empty() {
        errors = static_errors(&args.address, &args.netmask, gateway);
    }
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!(
            "invalid static configuration for {}:\n  {}",
            args.edit.iface,
            messages.join("\n  ")
        );
    }

    apply(&args.edit, config, |doc| {
        doc.set_static(&args.edit.iface, &args.address, &args.netmask, gateway)?;
        if !nameservers.is_empty() || args.clear_nameservers {
            doc.set_nameservers(&args.edit.iface, &nameservers)?;
        }
        Ok(())
    })
}

pub fn run_dhcp(args: EditArgs, config: &ConsoleConfig) -> Result<()> {
    apply(&args, config, |doc| doc.set_dhcp(&args.iface))
}

pub fn run_manual(args: EditArgs, config: &ConsoleConfig) -> Result<()> {
    apply(&args, config, |doc| doc.set_manual(&args.iface))
}

/// Load, edit and rewrite the interfaces file, or print it on `--dry-run`.
fn apply<F>(args: &EditArgs, config: &ConsoleConfig, edit: F) -> Result<()>
where
    F: FnOnce(&mut InterfaceDocument) -> Result<(), ConfigError>,
{
    ensure_not_remote(args)?;

    let path = config.resolver_paths().interfaces;
    let mut doc = load(&path).with_context(|| format!("failed to load {}", path.display()))?;
    edit(&mut doc).with_context(|| format!("failed to configure {}", args.iface))?;

    if args.dry_run {
        print!("{}", serialize(&doc));
        return Ok(());
    }

    write_file(&doc, &path).with_context(|| format!("failed to write {}", path.display()))?;
    let method = doc
        .get(&args.iface)
        .map(|stanza| stanza.mode.to_string())
        .unwrap_or_default();
    info!(iface = %args.iface, %method, "interface reconfigured");

    println!(
        "{}",
        format!("{} configured ({method})", args.iface).green()
    );
    println!(
        "Run `ifdown {0} && ifup {0}` to apply the new configuration.",
        args.iface
    );
    Ok(())
}

/// Reconfiguring the adapter carrying an SSH session can cut it off.
fn ensure_not_remote(args: &EditArgs) -> Result<()> {
    if args.yes || args.dry_run {
        return Ok(());
    }
    let remote = env::var("SSH_CONNECTION").is_ok_and(|value| !value.is_empty());
    if remote {
        bail!(
            "refusing to reconfigure {} from an SSH session: the connection may be lost. \
             Re-run with --yes to proceed",
            args.iface
        );
    }
    Ok(())
}
