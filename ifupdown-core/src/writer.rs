use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::document::InterfaceDocument;
use crate::stanza::{InterfaceStanza, Mode};

/// Errors that can occur while writing an interfaces file.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Creating, writing or renaming the temporary file failed.
    #[error("failed to write interfaces file: {0}")]
    Io(#[from] std::io::Error),
}

const INDENT: &str = "    ";

/// Serialize a document into interfaces file text.
///
/// Layout: preamble lines, then stanzas in document order separated by blank
/// lines. Loopback stanzas carry their own `auto` line; every other
/// activation is gathered into one line per keyword placed just before the
/// first non-loopback stanza.
pub fn serialize(doc: &InterfaceDocument) -> String {
    let mut blocks: Vec<String> = Vec::new();
    if !doc.preamble.is_empty() {
        blocks.push(doc.preamble.join("\n"));
    }

    let mut header = Some(activation_header(doc));
    for stanza in doc.stanzas() {
        let mut block = String::new();
        if stanza.is_loopback() {
            if stanza.auto {
                let _ = writeln!(block, "auto {}", stanza.name);
            }
            for class in &stanza.classes {
                let _ = writeln!(block, "{class} {}", stanza.name);
            }
        } else if let Some(lines) = header.take() {
            block.push_str(&lines);
        }
        write_stanza(&mut block, stanza);
        blocks.push(block.trim_end().to_string());
    }
    if let Some(lines) = header.filter(|h| !h.is_empty()) {
        blocks.push(lines.trim_end().to_string());
    }

    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

/// Serialize `doc` and atomically replace `path` with the result.
///
/// The text goes to a temporary file in the same directory, is synced, and is
/// renamed over `path`, so readers see either the old or the new file. An
/// existing file's permissions carry over.
pub fn write_file(doc: &InterfaceDocument, path: &Path) -> Result<(), WriteError> {
    let text = serialize(doc);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    match fs::metadata(path) {
        Ok(meta) => fs::set_permissions(tmp.path(), meta.permissions())?,
        Err(_) => set_default_permissions(tmp.path())?,
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;

    info!(path = %path.display(), bytes = text.len(), "wrote interfaces file");
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_stanza(out: &mut String, stanza: &InterfaceStanza) {
    let _ = writeln!(out, "iface {} {} {}", stanza.name, stanza.family, stanza.mode);
    if stanza.mode == Mode::Static {
        for (directive, value) in [
            ("address", &stanza.address),
            ("netmask", &stanza.netmask),
            ("gateway", &stanza.gateway),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "{INDENT}{directive} {value}");
            }
        }
    }
    for (directive, value) in stanza.options.iter() {
        if value.is_empty() {
            let _ = writeln!(out, "{INDENT}{directive}");
        } else {
            let _ = writeln!(out, "{INDENT}{directive} {value}");
        }
    }
}

/// One `auto` line for every non-loopback auto interface plus orphaned
/// `auto` entries, then one line per other activation keyword in first-seen
/// order.
fn activation_header(doc: &InterfaceDocument) -> String {
    let mut lines: Vec<(String, Vec<&str>)> = vec![("auto".to_string(), Vec::new())];

    for stanza in doc.stanzas().iter().filter(|s| !s.is_loopback()) {
        if stanza.auto {
            add_name(&mut lines, "auto", &stanza.name);
        }
        for class in &stanza.classes {
            add_name(&mut lines, class, &stanza.name);
        }
    }
    for orphan in doc.orphans() {
        let class = if orphan.class == "allow-auto" {
            "auto"
        } else {
            orphan.class.as_str()
        };
        add_name(&mut lines, class, &orphan.name);
    }

    let mut out = String::new();
    for (class, names) in lines.iter().filter(|(_, names)| !names.is_empty()) {
        let _ = writeln!(out, "{class} {}", names.join(" "));
    }
    out
}

fn add_name<'a>(lines: &mut Vec<(String, Vec<&'a str>)>, class: &str, name: &'a str) {
    let idx = match lines.iter().position(|(c, _)| c == class) {
        Some(idx) => idx,
        None => {
            lines.push((class.to_string(), Vec::new()));
            lines.len() - 1
        }
    };
    let names = &mut lines[idx].1;
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn writes_loopback_then_shared_auto_line() {
        let doc = parse(
            "auto lo eth0 eth1\n\
             iface lo inet loopback\n\
             iface eth0 inet static\n\
             address 10.0.0.2\n\
             netmask 255.255.255.0\n\
             post-down /usr/local/bin/teardown\n\
             iface eth1 inet dhcp\n",
        )
        .expect("parse");

        assert_eq!(
            serialize(&doc),
            "auto lo\n\
             iface lo inet loopback\n\
             \n\
             auto eth0 eth1\n\
             iface eth0 inet static\n    address 10.0.0.2\n    netmask 255.255.255.0\n    post-down /usr/local/bin/teardown\n\
             \n\
             iface eth1 inet dhcp\n"
        );
    }

    #[test]
    fn dhcp_stanza_omits_address_lines() {
        let mut doc = parse("iface eth0 inet static\n    address 10.0.0.2\n    netmask 255.0.0.0\n    mtu 9000\n")
            .expect("parse");
        doc.set_dhcp("eth0").expect("dhcp");

        assert_eq!(serialize(&doc), "iface eth0 inet dhcp\n    mtu 9000\n");
    }

    #[test]
    fn orphans_are_written_when_no_stanza_follows() {
        let doc = parse("auto eth9\nallow-hotplug eth8\n").expect("parse");
        assert_eq!(serialize(&doc), "auto eth9\nallow-hotplug eth8\n");
    }

    #[test]
    fn empty_document_serializes_to_nothing() {
        assert_eq!(serialize(&InterfaceDocument::new()), "");
    }

    #[cfg(unix)]
    #[test]
    fn write_file_replaces_target_and_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("interfaces");
        fs::write(&path, "iface eth0 inet dhcp\n").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");

        let mut doc = crate::parser::load(&path).expect("load");
        doc.set_static("eth0", "10.0.0.2", "255.255.255.0", None)
            .expect("static");
        write_file(&doc, &path).expect("write");

        let written = fs::read_to_string(&path).expect("read back");
        assert_eq!(
            written,
            "iface eth0 inet static\n    address 10.0.0.2\n    netmask 255.255.255.0\n"
        );
        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
        assert_eq!(fs::read_dir(dir.path()).expect("read_dir").count(), 1);
    }
}
