use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::address::validate_ipv4;
use crate::document::InterfaceDocument;
use crate::parser::{load, ParseError};

/// Which tier produced a [`NameserverSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameserverSource {
    /// `dns-nameservers` options in the interfaces file.
    Static,
    /// Per-interface state written by the DHCP client.
    DhcpResolver,
    /// The system-wide resolver configuration.
    SystemResolver,
    None,
}

impl Display for NameserverSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameserverSource::Static => "static",
            NameserverSource::DhcpResolver => "dhcp-resolver",
            NameserverSource::SystemResolver => "system-resolver",
            NameserverSource::None => "none",
        })
    }
}

/// Effective nameservers for one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameserverSet {
    pub nameservers: Vec<String>,
    pub source: NameserverSource,
}

impl NameserverSet {
    fn empty() -> Self {
        Self {
            nameservers: Vec::new(),
            source: NameserverSource::None,
        }
    }
}

/// Errors that can occur while resolving nameservers.
///
/// A source that does not exist is an empty tier, not an error.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to load interfaces file {path}: {source}")]
    Interfaces { path: String, source: ParseError },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Locations the resolver reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPaths {
    pub interfaces: PathBuf,
    /// Directory holding per-interface DHCP resolver state, one file per
    /// interface and client (`eth0.dhclient`). Use the canonical `/run` path,
    /// not the `/var/run` compatibility link.
    pub dhcp_state_dir: PathBuf,
    pub resolv_conf: PathBuf,
}

impl Default for ResolverPaths {
    fn default() -> Self {
        Self {
            interfaces: PathBuf::from("/etc/network/interfaces"),
            dhcp_state_dir: PathBuf::from("/run/resolvconf/interface"),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
        }
    }
}

/// Ordered fallback over static, DHCP and system nameservers.
///
/// Nothing is cached; every call re-reads its sources.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    paths: ResolverPaths,
}

impl Resolver {
    pub fn new(paths: ResolverPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ResolverPaths {
        &self.paths
    }

    /// Resolve nameservers for `name`, loading the interfaces file fresh.
    pub fn resolve(&self, name: &str) -> Result<NameserverSet, ResolveError> {
        let doc = match load(&self.paths.interfaces) {
            Ok(doc) => Some(doc),
            Err(ParseError::Io(err)) if err.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ResolveError::Interfaces {
                    path: self.paths.interfaces.display().to_string(),
                    source,
                })
            }
        };
        self.resolve_in(doc.as_ref(), name)
    }

    /// Resolve nameservers for `name` using an already loaded document for
    /// the static tier.
    pub fn resolve_in(
        &self,
        doc: Option<&InterfaceDocument>,
        name: &str,
    ) -> Result<NameserverSet, ResolveError> {
        let static_servers = doc
            .and_then(|doc| doc.get(name))
            .map(|stanza| ipv4_only(stanza.static_nameservers()))
            .unwrap_or_default();
        if !static_servers.is_empty() {
            return Ok(found(static_servers, NameserverSource::Static));
        }

        let dhcp_servers = self.dhcp_nameservers(name)?;
        if !dhcp_servers.is_empty() {
            return Ok(found(dhcp_servers, NameserverSource::DhcpResolver));
        }

        let system_servers = read_nameserver_file(&self.paths.resolv_conf)?;
        if !system_servers.is_empty() {
            return Ok(found(system_servers, NameserverSource::SystemResolver));
        }

        debug!(iface = name, "no nameservers found");
        Ok(NameserverSet::empty())
    }

    /// Nameservers from every state file belonging to `name`, in file name
    /// order.
    fn dhcp_nameservers(&self, name: &str) -> Result<Vec<String>, ResolveError> {
        let dir = &self.paths.dhcp_state_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(dir, source)),
        };

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(dir, source))?;
            let file_name = entry.file_name();
            if state_file_matches(&file_name.to_string_lossy(), name) {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut servers = Vec::new();
        for file in files {
            for server in read_nameserver_file(&file)? {
                if !servers.contains(&server) {
                    servers.push(server);
                }
            }
        }
        Ok(servers)
    }
}

/// `eth0` owns `eth0` and `eth0.<client>`, but not `eth0.1.<client>`, which
/// belongs to the VLAN interface `eth0.1`.
fn state_file_matches(file_name: &str, iface: &str) -> bool {
    match file_name.strip_prefix(iface) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .is_some_and(|client| !client.is_empty() && !client.contains('.')),
        None => false,
    }
}

/// IPv4 `nameserver` entries of a resolv.conf-format file. A missing file
/// yields no entries.
fn read_nameserver_file(path: &Path) -> Result<Vec<String>, ResolveError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(io_error(path, source)),
    };
    Ok(parse_nameservers(&text))
}

fn parse_nameservers(text: &str) -> Vec<String> {
    let tokens = text.lines().filter_map(|raw| {
        let line = strip_comment(raw);
        let mut parts = line.split_whitespace();
        (parts.next() == Some("nameserver")).then_some(parts)
    });
    ipv4_only(tokens.flatten().collect())
}

fn strip_comment(line: &str) -> &str {
    let idx = line.find(['#', ';']).unwrap_or(line.len());
    &line[..idx]
}

fn ipv4_only(tokens: Vec<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in tokens {
        if !validate_ipv4(token) {
            debug!(token, "skipping non-IPv4 nameserver");
            continue;
        }
        if !out.iter().any(|s| s == token) {
            out.push(token.to_string());
        }
    }
    out
}

fn found(nameservers: Vec<String>, source: NameserverSource) -> NameserverSet {
    debug!(%source, ?nameservers, "resolved nameservers");
    NameserverSet {
        nameservers,
        source,
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ResolveError {
    ResolveError::Io {
        path: path.display().to_string(),
        source,
    }
}
