use colored::Colorize;
use ifupdown_core::{InterfaceStanza, Mode, NameserverSet, NameserverSource};
use serde::Serialize;

/// One adapter as shown by `list` and `show`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterReport {
    pub name: String,
    pub family: String,
    pub method: String,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    pub auto: bool,
    pub default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<NameserverSet>,
}

impl AdapterReport {
    pub fn new(stanza: &InterfaceStanza, default: bool) -> Self {
        Self {
            name: stanza.name.clone(),
            family: stanza.family.clone(),
            method: stanza.mode.to_string(),
            address: stanza.address.clone(),
            netmask: stanza.netmask.clone(),
            gateway: stanza.gateway.clone(),
            auto: stanza.auto,
            default,
            nameservers: None,
        }
    }

    pub fn with_nameservers(mut self, set: NameserverSet) -> Self {
        self.nameservers = Some(set);
        self
    }

    fn is_static(&self) -> bool {
        self.method == Mode::Static.as_str()
    }
}

/// Render the adapter menu: one line per adapter with its method and address.
pub fn render_adapter_list(rows: &[AdapterReport]) -> String {
    if rows.is_empty() {
        return "No network adapters configured".yellow().to_string();
    }

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut out = Vec::new();
    for row in rows {
        let desc = match (&row.address, row.is_static()) {
            (Some(addr), true) => format!("{addr} ({})", row.method),
            _ if row.method == Mode::Manual.as_str() => "not configured".to_string(),
            _ => format!("({})", row.method),
        };
        let mut line = format!("{:<width$}  {desc}", row.name);
        if row.default {
            line.push_str(" [*]");
        }
        out.push(if row.is_static() {
            line.green().to_string()
        } else {
            line
        });
    }
    out.join("\n")
}

/// Render the adapter detail screen.
pub fn render_adapter_detail(report: &AdapterReport) -> String {
    let mut out = Vec::new();
    if report.is_static() {
        out.push(format!("IP Address:      {}", field(&report.address)));
        out.push(format!("Netmask:         {}", field(&report.netmask)));
        out.push(format!("Default Gateway: {}", field(&report.gateway)));
    } else {
        out.push("Network adapter has no static address".yellow().to_string());
    }
    if let Some(set) = &report.nameservers {
        out.push(format!("Name Server(s):  {}", render_nameserver_line(set)));
    }
    out.push(String::new());
    out.push(format!(
        "Networking configuration method: {}",
        report.method.cyan()
    ));
    out.push(format!(
        "Is this adapter's IP address displayed in Usage: {}",
        if report.default { "yes" } else { "no" }
    ));
    out.join("\n")
}

/// Render resolver output as `servers (source)`.
pub fn render_nameserver_line(set: &NameserverSet) -> String {
    if set.source == NameserverSource::None {
        return "none".dimmed().to_string();
    }
    format!("{} ({})", set.nameservers.join(" "), set.source)
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}
