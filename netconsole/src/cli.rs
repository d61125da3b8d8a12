use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "netconsole")]
#[command(about = "Configure appliance network interfaces through /etc/network/interfaces")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Console config file (TOML). Defaults to /etc/netconsole/netconsole.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Interfaces file to read and rewrite.
    #[arg(long, global = true)]
    pub interfaces: Option<PathBuf>,
    /// System resolver file consulted as the last nameserver fallback.
    #[arg(long, global = true)]
    pub resolv_conf: Option<PathBuf>,
    /// Directory with per-interface DHCP resolver state.
    #[arg(long, global = true)]
    pub dhcp_state_dir: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List configured network adapters.
    List(ListArgs),
    /// Show addressing, nameservers and method for one adapter.
    Show(ShowArgs),
    /// Show the effective nameservers for one adapter and where they came from.
    Nameservers(ShowArgs),
    /// Configure a static IPv4 address.
    Static(StaticArgs),
    /// Configure an adapter for DHCP.
    Dhcp(EditArgs),
    /// Leave an adapter declared but unconfigured.
    Manual(EditArgs),
    /// Make an adapter the default one and save it to the console config.
    Default(DefaultArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Include loopback, bridge, tunnel and other virtual adapters.
    #[arg(long)]
    pub all: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Adapter name (for example eth0).
    pub iface: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Adapter name (for example eth0).
    pub iface: String,
    /// Print the resulting interfaces file instead of writing it.
    #[arg(long)]
    pub dry_run: bool,
    /// Proceed even when running inside an SSH session.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct StaticArgs {
    #[command(flatten)]
    pub edit: EditArgs,
    /// IPv4 address.
    #[arg(long, default_value = "")]
    pub address: String,
    /// Dotted IPv4 netmask.
    #[arg(long, default_value = "")]
    pub netmask: String,
    /// Default gateway; must lie inside the address/netmask network.
    #[arg(long)]
    pub gateway: Option<String>,
    /// Static nameserver (repeatable). Replaces any dns-nameservers option;
    /// without it the existing list is kept.
    #[arg(long = "nameserver")]
    pub nameservers: Vec<String>,
    /// Remove every statically configured nameserver.
    #[arg(long, conflicts_with = "nameservers")]
    pub clear_nameservers: bool,
}

#[derive(Parser, Debug)]
pub struct DefaultArgs {
    /// Adapter name (for example eth0).
    pub iface: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
