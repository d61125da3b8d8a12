use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Serializer};

/// Directives the engine owns on a `static` stanza.
pub const OWNED_DIRECTIVES: [&str; 3] = ["address", "netmask", "gateway"];

/// Option directives carrying statically configured nameservers.
pub const NAMESERVER_DIRECTIVES: [&str; 2] = ["dns-nameservers", "dns-nameserver"];

/// Addressing method from an `iface <name> <family> <method>` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Static,
    Dhcp,
    Manual,
    Loopback,
    /// A method this engine does not manage (`ppp`, `tunnel`, `auto`, ...).
    /// Kept verbatim so the header round-trips.
    Other(String),
}

impl Mode {
    pub fn from_method(method: &str) -> Self {
        match method {
            "static" => Mode::Static,
            "dhcp" => Mode::Dhcp,
            "manual" => Mode::Manual,
            "loopback" => Mode::Loopback,
            other => Mode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Mode::Static => "static",
            Mode::Dhcp => "dhcp",
            Mode::Manual => "manual",
            Mode::Loopback => "loopback",
            Mode::Other(method) => method,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Ordered multimap of option directives.
///
/// Entries keep their original relative order across every edit, including
/// interleaved repeats such as `pre-up a`, `post-down b`, `pre-up c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionMap {
    entries: Vec<(String, String)>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directive after every existing entry.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// All values recorded for `name`, in file order.
    pub fn get(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Replace every entry named `name` with a single `value`.
    ///
    /// The new entry takes the position of the first removed one, or goes to
    /// the end when `name` was absent.
    pub fn replace(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut idx = 0;
                self.entries.retain(|(n, _)| {
                    let keep = idx <= first || n != name;
                    idx += 1;
                    keep
                });
            }
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Drop every entry named `name`. Returns how many were removed.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `iface` block of the interfaces file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceStanza {
    /// Interface name, unique within a document.
    pub name: String,
    /// Address family from the header (`inet`, `inet6`, ...).
    pub family: String,
    pub mode: Mode,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    /// Every directive the engine does not own, preserved verbatim.
    pub options: OptionMap,
    /// Listed on an `auto` (or `allow-auto`) line.
    pub auto: bool,
    /// Other activation lines naming this interface (`allow-hotplug`,
    /// `no-auto-down`, ...), in first-seen order.
    pub classes: Vec<String>,
}

impl InterfaceStanza {
    /// Create an `inet` stanza with no addressing and no options.
    pub fn new(name: impl Into<String>, mode: Mode) -> Self {
        Self {
            name: name.into(),
            family: "inet".to_string(),
            mode,
            address: None,
            netmask: None,
            gateway: None,
            options: OptionMap::new(),
            auto: false,
            classes: Vec::new(),
        }
    }

    pub fn is_loopback(&self) -> bool {
        self.mode == Mode::Loopback
    }

    /// Nameserver tokens from `dns-nameservers`/`dns-nameserver` options,
    /// in file order.
    pub fn static_nameservers(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|(name, _)| NAMESERVER_DIRECTIVES.contains(name))
            .flat_map(|(_, value)| value.split_whitespace())
            .collect()
    }

    /// Drop the owned addressing fields along with any owned directives
    /// that were kept as plain options (extra `address` lines, or addressing
    /// on a method the engine does not manage).
    pub(crate) fn reset_addressing(&mut self) {
        self.address = None;
        self.netmask = None;
        self.gateway = None;
        for directive in OWNED_DIRECTIVES {
            self.options.remove_all(directive);
        }
    }
}
