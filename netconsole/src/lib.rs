//! Headless network console for appliances configured through
//! `/etc/network/interfaces`.
//!
//! The console reads and rewrites the interfaces file through
//! `ifupdown-core` and adds the pieces an operator-facing tool needs on top:
//!
//! - [`adapters`]: which adapters to offer and which one is the default
//! - [`config`]: console settings (`default_nic`, file locations) from TOML
//! - [`report`]: colored terminal and JSON views of adapters and nameservers

pub mod adapters;
pub mod config;
pub mod report;
