//! NDN: the type tables describing PDUs, CSAP layers, templates and patterns.
//!
//! [`registry()`] is the process-wide registry built from these tables on first
//! use. Collaborators that need a different protocol set assemble their own with
//! [`crate::registry::Registry::builder`], reusing [`generic`] and the protocol
//! modules.

pub mod eth;
pub mod generic;
pub mod ipstack;

use crate::registry::Registry;
use crate::types::{NamedEntry, SchemaError, Tag, Type, TypeRef};
use once_cell::sync::Lazy;

/// Stable protocol tags (variants of `Generic-PDU` / `Generic-CSAP-Layer`).
pub mod proto {
    pub const ETH: u32 = 1;
    pub const IP4: u32 = 2;
    pub const TCP: u32 = 4;
    pub const UDP: u32 = 5;
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    build_registry().unwrap_or_else(|e| panic!("built-in NDN tables are malformed: {}", e))
});

/// The registry of all built-in NDN types.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Build a fresh registry from the built-in tables.
pub fn build_registry() -> Result<Registry, SchemaError> {
    Registry::builder()
        .add_types(generic::data_units())
        .add_types(generic::standalone()?)
        .add_protocol(eth::protocol()?)
        .add_protocol(ipstack::ip4()?)
        .add_protocol(ipstack::tcp()?)
        .add_protocol(ipstack::udp()?)
        .add_dependent(generic::aggregates)
        .build()
}

/// Named entries tagged `[PRIVATE 1]`, `[PRIVATE 2]`, ... in declaration order.
fn numbered(fields: &[(&str, &TypeRef)]) -> Vec<NamedEntry> {
    fields
        .iter()
        .zip(1u32..)
        .map(|((label, ty), n)| crate::types::entry(label, ty, Tag::private(n)))
        .collect()
}

pub(crate) fn sequence(name: &str, tag: u32, fields: &[(&str, &TypeRef)]) -> Result<TypeRef, SchemaError> {
    Type::sequence(name, Tag::private(tag), numbered(fields))
}

pub(crate) fn choice(name: &str, tag: u32, fields: &[(&str, &TypeRef)]) -> Result<TypeRef, SchemaError> {
    Type::choice(name, Tag::private(tag), numbered(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_the_protocols() {
        let reg = registry();
        let labels: Vec<&str> = reg.protocols().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["eth", "ip4", "tcp", "udp"]);
        for name in ["Raw-Packet", "Traffic-Template", "CSAP-spec", "TCP-CSAP", "DATA-UNIT(INTEGER)"] {
            assert!(reg.get(name).is_some(), "{} missing", name);
        }
    }
}
