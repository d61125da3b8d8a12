use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::address::prefix_to_netmask;
use crate::document::InterfaceDocument;
use crate::stanza::{InterfaceStanza, Mode};

/// Errors that can occur while loading an interfaces file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the input file.
    #[error("failed to read interfaces file: {0}")]
    Io(#[from] std::io::Error),
    /// An option line appeared with no `iface` stanza open.
    #[error("line {line}: option `{directive}` is outside any iface stanza")]
    OutsideStanza { line: usize, directive: String },
    /// Two `iface` headers share a name.
    #[error("line {line}: duplicate interface `{name}`")]
    DuplicateInterface { line: usize, name: String },
    /// A recognized keyword with the wrong shape.
    #[error("line {line}: malformed line: {text}")]
    Malformed { line: usize, text: String },
}

/// Top-level keywords kept verbatim in the document preamble.
const PREAMBLE_KEYWORDS: [&str; 4] = ["source", "source-directory", "source-dir", "rename"];

/// Where option lines currently attach.
enum Context {
    None,
    Stanza,
    Mapping(usize),
}

/// Parse interfaces file text into an [`InterfaceDocument`].
pub fn parse(text: &str) -> Result<InterfaceDocument, ParseError> {
    let mut doc = InterfaceDocument::new();
    let mut activations: Vec<(String, String)> = Vec::new();
    let mut context = Context::None;
    let mut comments = 0usize;

    for (line_no, line) in logical_lines(text) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            comments += 1;
            continue;
        }

        let (keyword, rest) = split_directive(trimmed);
        match keyword {
            "iface" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let [name, family, method] = parts[..] else {
                    return Err(malformed(line_no, trimmed));
                };
                let mut stanza = InterfaceStanza::new(name, Mode::from_method(method));
                stanza.family = family.to_string();
                doc.insert(stanza)
                    .map_err(|stanza| ParseError::DuplicateInterface {
                        line: line_no,
                        name: stanza.name,
                    })?;
                context = Context::Stanza;
            }
            "mapping" => {
                if rest.is_empty() {
                    return Err(malformed(line_no, trimmed));
                }
                doc.preamble.push(trimmed.to_string());
                context = Context::Mapping(doc.preamble.len() - 1);
            }
            kw if is_activation(kw) => {
                if rest.is_empty() {
                    return Err(malformed(line_no, trimmed));
                }
                for name in rest.split_whitespace() {
                    activations.push((kw.to_string(), name.to_string()));
                }
                context = Context::None;
            }
            kw if PREAMBLE_KEYWORDS.contains(&kw) => {
                doc.preamble.push(trimmed.to_string());
                context = Context::None;
            }
            directive => match context {
                Context::Stanza => {
                    let Some(stanza) = doc.last_mut() else {
                        return Err(outside(line_no, directive));
                    };
                    apply_option(stanza, directive, rest, line_no)?;
                }
                Context::Mapping(idx) => {
                    let block = &mut doc.preamble[idx];
                    block.push_str("\n    ");
                    block.push_str(trimmed);
                }
                Context::None => return Err(outside(line_no, directive)),
            },
        }
    }

    for (class, name) in &activations {
        if doc.get(name).is_none() {
            warn!(
                class = class.as_str(),
                iface = name.as_str(),
                "activation line names an interface without a stanza"
            );
        }
        doc.declare(class, name);
    }
    debug!(
        stanzas = doc.stanzas().len(),
        dropped_comments = comments,
        "parsed interfaces file"
    );
    Ok(doc)
}

/// Read and parse the interfaces file at `path`.
pub fn load(path: &Path) -> Result<InterfaceDocument, ParseError> {
    let text = fs::read_to_string(path)?;
    debug!(path = %path.display(), "loading interfaces file");
    parse(&text)
}

/// Route one option line into the stanza.
///
/// `address`/`netmask`/`gateway` become owned fields on `static` stanzas; a
/// repeat, or the same directive under another method, stays a plain option.
/// Only `inet` addresses are split into address and netmask; other families
/// keep the prefix in the address verbatim.
fn apply_option(
    stanza: &mut InterfaceStanza,
    directive: &str,
    value: &str,
    line_no: usize,
) -> Result<(), ParseError> {
    if stanza.mode == Mode::Static {
        match directive {
            "address" if stanza.address.is_none() => {
                match value.split_once('/').filter(|_| stanza.family == "inet") {
                    Some((addr, prefix)) => {
                        let netmask = prefix
                            .parse::<u8>()
                            .ok()
                            .and_then(prefix_to_netmask)
                            .ok_or_else(|| malformed(line_no, &format!("address {value}")))?;
                        stanza.address = Some(addr.to_string());
                        stanza.netmask.get_or_insert(netmask);
                    }
                    None => stanza.address = Some(value.to_string()),
                }
                return Ok(());
            }
            "netmask" if stanza.netmask.is_none() => {
                stanza.netmask = Some(value.to_string());
                return Ok(());
            }
            "gateway" if stanza.gateway.is_none() => {
                stanza.gateway = Some(value.to_string());
                return Ok(());
            }
            _ => {}
        }
    }
    stanza.options.push(directive, value);
    Ok(())
}

/// Join `\`-continued lines, yielding each logical line with the 1-based
/// number of its first physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let (start, mut buf) = pending.take().unwrap_or((idx + 1, String::new()));
        match raw.strip_suffix('\\') {
            Some(head) => {
                buf.push_str(head);
                pending = Some((start, buf));
            }
            None => {
                buf.push_str(raw);
                out.push((start, buf));
            }
        }
    }
    if let Some(last) = pending {
        out.push(last);
    }
    out
}

/// Split `keyword rest...` at the first whitespace run; `rest` is trimmed but
/// otherwise verbatim.
fn split_directive(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

fn is_activation(keyword: &str) -> bool {
    keyword == "auto"
        || keyword.starts_with("allow-")
        || keyword == "no-auto-down"
        || keyword == "no-scripts"
}

fn malformed(line: usize, text: &str) -> ParseError {
    ParseError::Malformed {
        line,
        text: text.to_string(),
    }
}

fn outside(line: usize, directive: &str) -> ParseError {
    ParseError::OutsideStanza {
        line,
        directive: directive.to_string(),
    }
}
