use ifupdown_core::{InterfaceDocument, InterfaceStanza, Mode};

/// Name prefixes of loopback and virtual adapters hidden from the adapter list.
const HIDDEN_PREFIXES: [&str; 8] = [
    "lo", "tap", "br", "natbr", "tun", "vmnet", "veth", "wmaster",
];

pub fn is_hidden(name: &str) -> bool {
    HIDDEN_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Adapters worth offering for configuration, sorted by name.
///
/// When the default adapter is a bridge (bridged containers use `br0` as the
/// outward-facing adapter) it is listed and its `bridge_ports` members are
/// not.
pub fn visible<'a>(
    doc: &'a InterfaceDocument,
    default_nic: Option<&str>,
) -> Vec<&'a InterfaceStanza> {
    let bridge = default_nic
        .filter(|name| name.starts_with("br"))
        .and_then(|name| doc.get(name));
    let bridged_ports: Vec<&str> = bridge
        .map(|br| {
            br.options
                .get("bridge_ports")
                .into_iter()
                .flat_map(str::split_whitespace)
                .collect()
        })
        .unwrap_or_default();

    let mut out: Vec<&InterfaceStanza> = doc
        .stanzas()
        .iter()
        .filter(|s| !is_hidden(&s.name) && !bridged_ports.contains(&s.name.as_str()))
        .collect();
    if let Some(br) = bridge {
        out.push(br);
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// The adapter treated as the appliance address.
///
/// The configured default wins when it names a stanza; otherwise the first
/// visible adapter that is on DHCP or has a routable static address.
pub fn default_nic(doc: &InterfaceDocument, configured: Option<&str>) -> Option<String> {
    if let Some(name) = configured.filter(|name| doc.get(name).is_some()) {
        return Some(name.to_string());
    }
    visible(doc, configured)
        .into_iter()
        .find(|s| match s.mode {
            Mode::Dhcp => true,
            Mode::Static => s
                .address
                .as_deref()
                .is_some_and(|addr| !addr.starts_with("169.254.")),
            _ => false,
        })
        .map(|s| s.name.clone())
}
