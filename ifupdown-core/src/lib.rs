//! Parsing, editing and atomic rewriting of ifupdown interface files, plus
//! effective nameserver resolution for an interface.

pub mod address;
pub mod document;
pub mod parser;
pub mod resolver;
pub mod stanza;
pub mod writer;

pub use address::{in_subnet, network_cidr, validate_ipv4};
pub use document::{ConfigError, InterfaceDocument};
pub use parser::{load, parse, ParseError};
pub use resolver::{NameserverSet, NameserverSource, ResolveError, Resolver, ResolverPaths};
pub use stanza::{InterfaceStanza, Mode, OptionMap};
pub use writer::{serialize, write_file, WriteError};
