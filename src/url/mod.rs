//! URL handling module for Mercator
//!
//! Links are plain absolute URL strings and hosts are the string keys that
//! group links for politeness. This module derives the latter from the former.

mod host;

pub use host::{host_of, host_of_url};

/// Network authority that groups links for politeness (`host[:port]`)
pub type Host = String;

/// Absolute URL string
pub type Link = String;
