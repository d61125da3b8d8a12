use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ifupdown_core::load;
use netconsole::config::{load_stored, save_config, ConsoleConfig, DEFAULT_CONFIG_PATH};

use crate::cli::DefaultArgs;

/// Store `iface` as `default_nic` in the config file.
///
/// Only the stored file is rewritten; path overrides given on the command
/// line are not persisted.
pub fn run_default(
    args: DefaultArgs,
    config_path: Option<&Path>,
    config: &ConsoleConfig,
) -> Result<()> {
    let interfaces = config.resolver_paths().interfaces;
    let doc = load(&interfaces)
        .with_context(|| format!("failed to load {}", interfaces.display()))?;
    if doc.get(&args.iface).is_none() {
        bail!("interface {} is not configured", args.iface);
    }

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut stored =
        load_stored(&path).with_context(|| format!("failed to load {}", path.display()))?;
    stored.default_nic = Some(args.iface.clone());
    save_config(&stored, &path)
        .with_context(|| format!("failed to save {}", path.display()))?;

    println!(
        "{}",
        format!("{} is now the default adapter", args.iface).green()
    );
    Ok(())
}
