use anyhow::{Context, Result};
use ifupdown_core::{load, InterfaceDocument, InterfaceStanza, Resolver};
use netconsole::adapters::{default_nic, visible};
use netconsole::config::ConsoleConfig;
use netconsole::report::{
    render_adapter_detail, render_adapter_list, render_nameserver_line, AdapterReport,
};

use crate::cli::{ListArgs, OutputFormat, ShowArgs};

pub fn run_list(args: ListArgs, config: &ConsoleConfig) -> Result<()> {
    let doc = load_document(config)?;
    let configured = config.default_nic.as_deref();
    let default = default_nic(&doc, configured);

    let stanzas: Vec<&InterfaceStanza> = if args.all {
        doc.stanzas().iter().collect()
    } else {
        visible(&doc, configured)
    };
    let rows: Vec<AdapterReport> = stanzas
        .into_iter()
        .map(|s| AdapterReport::new(s, default.as_deref() == Some(s.name.as_str())))
        .collect();

    match args.format {
        OutputFormat::Text => println!("{}", render_adapter_list(&rows)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

pub fn run_show(args: ShowArgs, config: &ConsoleConfig) -> Result<()> {
    let doc = load_document(config)?;
    let stanza = doc
        .get(&args.iface)
        .with_context(|| format!("interface {} is not configured", args.iface))?;

    let resolver = Resolver::new(config.resolver_paths());
    let nameservers = resolver
        .resolve_in(Some(&doc), &args.iface)
        .with_context(|| format!("failed to resolve nameservers for {}", args.iface))?;
    let is_default =
        default_nic(&doc, config.default_nic.as_deref()).as_deref() == Some(args.iface.as_str());
    let report = AdapterReport::new(stanza, is_default).with_nameservers(nameservers);

    match args.format {
        OutputFormat::Text => println!("{}", render_adapter_detail(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

pub fn run_nameservers(args: ShowArgs, config: &ConsoleConfig) -> Result<()> {
    let resolver = Resolver::new(config.resolver_paths());
    let set = resolver
        .resolve(&args.iface)
        .with_context(|| format!("failed to resolve nameservers for {}", args.iface))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_nameserver_line(&set)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&set)?),
    }
    Ok(())
}

fn load_document(config: &ConsoleConfig) -> Result<InterfaceDocument> {
    let path = config.resolver_paths().interfaces;
    load(&path).with_context(|| format!("failed to load {}", path.display()))
}
