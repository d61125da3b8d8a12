use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::address::{in_subnet, network_cidr, validate_ipv4};
use crate::stanza::{InterfaceStanza, Mode, NAMESERVER_DIRECTIVES};

/// Validation failures raised by the `set_*` operations.
///
/// None of these leave the document modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required address field was empty.
    #[error("no {0} provided")]
    Missing(&'static str),
    /// A field is not a dotted-quad IPv4 address.
    #[error("invalid {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },
    /// The gateway is well-formed but outside the interface's network.
    #[error("gateway ({gateway}) not in IP range ({network})")]
    InvalidGateway { gateway: String, network: String },
    #[error("duplicate nameserver specified: {0}")]
    DuplicateNameserver(String),
    #[error("interface {0} is not configured")]
    UnknownInterface(String),
}

/// Activation-line entry naming an interface that has no `iface` stanza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphan {
    /// Activation keyword (`auto`, `allow-hotplug`, ...).
    pub class: String,
    pub name: String,
}

/// In-memory interfaces file: stanzas in file order plus a name index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceDocument {
    /// Top-level lines that are not stanzas (`source`, `mapping` blocks, ...),
    /// verbatim.
    pub preamble: Vec<String>,
    stanzas: Vec<InterfaceStanza>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    orphans: Vec<Orphan>,
}

impl InterfaceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stanzas(&self) -> &[InterfaceStanza] {
        &self.stanzas
    }

    pub fn get(&self, name: &str) -> Option<&InterfaceStanza> {
        self.index.get(name).map(|&idx| &self.stanzas[idx])
    }

    pub fn orphans(&self) -> &[Orphan] {
        &self.orphans
    }

    /// Append a stanza. Returns the stanza back if its name is already taken.
    pub fn insert(&mut self, stanza: InterfaceStanza) -> Result<(), InterfaceStanza> {
        if self.index.contains_key(&stanza.name) {
            return Err(stanza);
        }
        self.index.insert(stanza.name.clone(), self.stanzas.len());
        self.stanzas.push(stanza);
        Ok(())
    }

    /// Record that `class` names `name`. Attaches to the stanza when it
    /// exists, otherwise keeps it as an orphan.
    pub fn declare(&mut self, class: &str, name: &str) {
        if let Some(&idx) = self.index.get(name) {
            apply_class(&mut self.stanzas[idx], class);
            return;
        }
        let orphan = Orphan {
            class: class.to_string(),
            name: name.to_string(),
        };
        if !self.orphans.contains(&orphan) {
            self.orphans.push(orphan);
        }
    }

    /// Configure `name` with a static IPv4 address.
    ///
    /// Address and netmask must be valid; a gateway, when given, must be
    /// valid and inside the address/netmask network. Leftover `address`,
    /// `netmask` and `gateway` options are dropped; other options are left
    /// alone. A missing interface is appended as a new `auto` stanza.
    pub fn set_static(
        &mut self,
        name: &str,
        address: &str,
        netmask: &str,
        gateway: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(err) = static_errors(address, netmask, gateway).into_iter().next() {
            return Err(err);
        }

        let stanza = self.entry(name);
        stanza.reset_addressing();
        stanza.family = "inet".to_string();
        stanza.mode = Mode::Static;
        stanza.address = Some(address.to_string());
        stanza.netmask = Some(netmask.to_string());
        stanza.gateway = gateway.filter(|g| !g.is_empty()).map(str::to_string);
        debug!(iface = name, address, netmask, ?gateway, "set static");
        Ok(())
    }

    /// Switch `name` to DHCP, dropping the static addressing fields. The
    /// address family is kept, so `inet6` stanzas stay `inet6 dhcp`.
    pub fn set_dhcp(&mut self, name: &str) -> Result<(), ConfigError> {
        let stanza = self.entry(name);
        stanza.mode = Mode::Dhcp;
        stanza.reset_addressing();
        debug!(iface = name, "set dhcp");
        Ok(())
    }

    /// Declare `name` without letting this tool configure an address.
    pub fn set_manual(&mut self, name: &str) -> Result<(), ConfigError> {
        let stanza = self.entry(name);
        stanza.mode = Mode::Manual;
        stanza.reset_addressing();
        debug!(iface = name, "set manual");
        Ok(())
    }

    /// Replace the statically configured nameservers of an existing stanza.
    ///
    /// Every nameserver directive collapses into one `dns-nameservers` line at
    /// the position of the first; an empty list removes them all.
    pub fn set_nameservers(&mut self, name: &str, servers: &[&str]) -> Result<(), ConfigError> {
        if let Some(err) = nameserver_errors(servers).into_iter().next() {
            return Err(err);
        }
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| ConfigError::UnknownInterface(name.to_string()))?;
        let options = &mut self.stanzas[idx].options;

        options.remove_all(NAMESERVER_DIRECTIVES[1]);
        if servers.is_empty() {
            options.remove_all(NAMESERVER_DIRECTIVES[0]);
        } else {
            options.replace(NAMESERVER_DIRECTIVES[0], servers.join(" "));
        }
        debug!(iface = name, ?servers, "set nameservers");
        Ok(())
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut InterfaceStanza> {
        self.stanzas.last_mut()
    }

    /// Existing stanza for `name`, or a new `auto` stanza appended at the end.
    fn entry(&mut self, name: &str) -> &mut InterfaceStanza {
        let idx = match self.index.get(name).copied() {
            Some(idx) => idx,
            None => {
                let mut stanza = InterfaceStanza::new(name, Mode::Manual);
                stanza.auto = true;
                let mut kept = Vec::with_capacity(self.orphans.len());
                for orphan in self.orphans.drain(..) {
                    if orphan.name == name {
                        apply_class(&mut stanza, &orphan.class);
                    } else {
                        kept.push(orphan);
                    }
                }
                self.orphans = kept;
                debug!(iface = name, "creating stanza");
                self.index.insert(name.to_string(), self.stanzas.len());
                self.stanzas.push(stanza);
                self.stanzas.len() - 1
            }
        };
        &mut self.stanzas[idx]
    }
}

/// Every problem with a static address request, in display order.
///
/// The gateway is only checked once address and netmask are valid, since the
/// range check needs both.
pub fn static_errors(address: &str, netmask: &str, gateway: Option<&str>) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    check_field(&mut errors, "IP address", address);
    check_field(&mut errors, "netmask", netmask);
    if !errors.is_empty() {
        return errors;
    }

    if let Some(gateway) = gateway.filter(|g| !g.is_empty()) {
        if !validate_ipv4(gateway) {
            errors.push(ConfigError::InvalidAddress {
                field: "gateway",
                value: gateway.to_string(),
            });
        } else if !in_subnet(address, netmask, gateway) {
            errors.push(ConfigError::InvalidGateway {
                gateway: gateway.to_string(),
                network: network_cidr(address, netmask).unwrap_or_default(),
            });
        }
    }
    errors
}

/// Every problem with a nameserver list: malformed entries, then repeats.
pub fn nameserver_errors(servers: &[&str]) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    for server in servers {
        if !validate_ipv4(server) {
            errors.push(ConfigError::InvalidAddress {
                field: "nameserver",
                value: server.to_string(),
            });
        }
    }
    for (idx, server) in servers.iter().enumerate() {
        // Report on the second occurrence only.
        if servers[..idx].iter().filter(|s| *s == server).count() == 1 {
            errors.push(ConfigError::DuplicateNameserver(server.to_string()));
        }
    }
    errors
}

fn check_field(errors: &mut Vec<ConfigError>, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(ConfigError::Missing(field));
    } else if !validate_ipv4(value) {
        errors.push(ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn apply_class(stanza: &mut InterfaceStanza, class: &str) {
    if class == "auto" || class == "allow-auto" {
        stanza.auto = true;
    } else if !stanza.classes.iter().any(|c| c == class) {
        stanza.classes.push(class.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_hooks() -> InterfaceDocument {
        let mut doc = InterfaceDocument::new();
        let mut eth0 = InterfaceStanza::new("eth0", Mode::Dhcp);
        eth0.auto = true;
        eth0.options.push("pre-up", "iptables-restore < /etc/iptables.up.rules");
        eth0.options.push("post-down", "iptables-save > /etc/iptables.up.rules");
        doc.insert(eth0).expect("insert eth0");
        doc
    }

    #[test]
    fn static_with_gateway_inside_subnet_keeps_options() {
        let mut doc = doc_with_hooks();
        let before = doc.get("eth0").expect("eth0").options.clone();

        doc.set_static("eth0", "192.168.1.10", "255.255.255.0", Some("192.168.1.1"))
            .expect("set_static");

        let eth0 = doc.get("eth0").expect("eth0");
        assert_eq!(eth0.mode, Mode::Static);
        assert_eq!(eth0.gateway.as_deref(), Some("192.168.1.1"));
        assert_eq!(eth0.options, before);
    }

    #[test]
    fn static_with_gateway_outside_subnet_fails_without_mutation() {
        let mut doc = doc_with_hooks();
        let before = doc.clone();

        let err = doc
            .set_static("eth0", "192.168.1.10", "255.255.255.0", Some("192.168.2.1"))
            .expect_err("gateway outside subnet");

        assert_eq!(
            err,
            ConfigError::InvalidGateway {
                gateway: "192.168.2.1".to_string(),
                network: "192.168.1.0/24".to_string(),
            }
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn invalid_address_is_reported_before_gateway() {
        let mut doc = doc_with_hooks();
        let err = doc
            .set_static("eth0", "192.168.1.300", "255.255.255.0", Some("10.0.0.1"))
            .expect_err("bad address");
        assert!(matches!(
            err,
            ConfigError::InvalidAddress {
                field: "IP address",
                ..
            }
        ));
    }

    #[test]
    fn mode_switching_preserves_options_exactly() {
        let mut doc = doc_with_hooks();
        let before = doc.get("eth0").expect("eth0").options.clone();

        doc.set_static("eth0", "10.0.0.5", "255.255.255.0", None)
            .expect("static");
        doc.set_dhcp("eth0").expect("dhcp");
        assert_eq!(doc.get("eth0").expect("eth0").address, None);
        doc.set_static("eth0", "10.0.0.6", "255.255.255.0", Some("10.0.0.1"))
            .expect("static again");

        assert_eq!(doc.get("eth0").expect("eth0").options, before);
    }

    #[test]
    fn missing_interface_is_appended_as_auto_stanza() {
        let mut doc = doc_with_hooks();
        doc.declare("allow-hotplug", "eth1");

        doc.set_static("eth1", "10.1.1.2", "255.255.255.0", None)
            .expect("static");

        let names: Vec<&str> = doc.stanzas().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "eth1"]);
        let eth1 = doc.get("eth1").expect("eth1");
        assert!(eth1.auto);
        assert_eq!(eth1.classes, vec!["allow-hotplug".to_string()]);
        assert!(doc.orphans().is_empty());
    }

    #[test]
    fn static_drops_leftover_addressing_options() {
        let mut doc = crate::parser::parse(
            "iface eth0 inet dhcp\n    gateway 192.168.9.1\n    hostname appliance\n",
        )
        .expect("parse");

        doc.set_static("eth0", "10.0.0.2", "255.255.255.0", None)
            .expect("static");

        let reparsed = crate::parser::parse(&crate::writer::serialize(&doc)).expect("reparse");
        let eth0 = reparsed.get("eth0").expect("eth0");
        assert_eq!(eth0.gateway, None);
        assert!(!eth0.options.contains("gateway"));
        assert_eq!(eth0.options.get("hostname"), vec!["appliance"]);
    }

    #[test]
    fn dhcp_keeps_inet6_family() {
        let mut doc = InterfaceDocument::new();
        let mut stanza = InterfaceStanza::new("eth1", Mode::Static);
        stanza.family = "inet6".to_string();
        stanza.address = Some("2001:db8::10/64".to_string());
        doc.insert(stanza).expect("insert");

        doc.set_dhcp("eth1").expect("dhcp");
        doc.set_dhcp("eth2").expect("new stanza");

        let eth1 = doc.get("eth1").expect("eth1");
        assert_eq!(eth1.family, "inet6");
        assert_eq!(eth1.mode, Mode::Dhcp);
        assert_eq!(eth1.address, None);
        assert_eq!(doc.get("eth2").expect("eth2").family, "inet");
    }

    #[test]
    fn manual_clears_addressing_but_keeps_family() {
        let mut doc = InterfaceDocument::new();
        let mut stanza = InterfaceStanza::new("eth2", Mode::Static);
        stanza.family = "inet6".to_string();
        stanza.address = Some("fd00::1".to_string());
        doc.insert(stanza).expect("insert");

        doc.set_manual("eth2").expect("manual");

        let eth2 = doc.get("eth2").expect("eth2");
        assert_eq!(eth2.mode, Mode::Manual);
        assert_eq!(eth2.family, "inet6");
        assert_eq!(eth2.address, None);
    }

    #[test]
    fn nameservers_replace_all_directives() {
        let mut doc = doc_with_hooks();
        doc.set_nameservers("eth0", &["8.8.8.8", "8.8.4.4"])
            .expect("set");
        doc.set_nameservers("eth0", &["1.1.1.1"]).expect("replace");

        let eth0 = doc.get("eth0").expect("eth0");
        assert_eq!(eth0.options.get("dns-nameservers"), vec!["1.1.1.1"]);
        assert_eq!(eth0.options.len(), 3);

        doc.set_nameservers("eth0", &[]).expect("clear");
        assert!(!doc.get("eth0").expect("eth0").options.contains("dns-nameservers"));
    }

    #[test]
    fn nameserver_errors_report_invalid_and_duplicate_once() {
        let errors = nameserver_errors(&["8.8.8.8", "bogus", "8.8.8.8", "8.8.8.8"]);
        assert_eq!(
            errors,
            vec![
                ConfigError::InvalidAddress {
                    field: "nameserver",
                    value: "bogus".to_string(),
                },
                ConfigError::DuplicateNameserver("8.8.8.8".to_string()),
            ]
        );
    }

    #[test]
    fn nameservers_on_unknown_interface_fail() {
        let mut doc = InterfaceDocument::new();
        assert_eq!(
            doc.set_nameservers("eth9", &["8.8.8.8"]),
            Err(ConfigError::UnknownInterface("eth9".to_string()))
        );
    }

    #[test]
    fn static_errors_collect_missing_fields() {
        assert_eq!(
            static_errors("", "", Some("10.0.0.1")),
            vec![
                ConfigError::Missing("IP address"),
                ConfigError::Missing("netmask")
            ]
        );
    }
}
