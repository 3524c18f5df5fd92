//! Schema registry: the set of named types a process works with.
//!
//! Each protocol contributes a [`Protocol`]: a PDU type and a CSAP-layer type keyed
//! by a stable numeric protocol tag. On [`RegistryBuilder::build`] those become the
//! variants of the two aggregate CHOICE types, `Generic-PDU` and
//! `Generic-CSAP-Layer`, and types that embed the aggregates (templates, patterns,
//! CSAP specs) are built from them by [`Dependent`] constructors.
//!
//! Schema defects (duplicate tags or labels) are reported as [`SchemaError`] at
//! build time.

use crate::types::{entry, NamedEntry, SchemaError, Tag, Type, TypeRef};
use crate::value::Value;
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

pub const GENERIC_PDU: &str = "Generic-PDU";
pub const GENERIC_CSAP_LAYER: &str = "Generic-CSAP-Layer";

/// One protocol's contribution.
#[derive(Debug, Clone)]
pub struct Protocol {
    /// Variant label in the aggregate CHOICE types (`"tcp"`, `"eth"`, ...).
    pub label: String,
    /// Stable protocol tag; variants are tagged `[PRIVATE tag]`.
    pub tag: u32,
    pub pdu: TypeRef,
    pub csap_layer: TypeRef,
    /// Auxiliary named types the protocol wants reachable by name.
    pub extra: Vec<TypeRef>,
}

impl Protocol {
    pub fn new(label: &str, tag: u32, pdu: TypeRef, csap_layer: TypeRef) -> Self {
        Protocol {
            label: label.to_string(),
            tag,
            pdu,
            csap_layer,
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, ty: TypeRef) -> Self {
        self.extra.push(ty);
        self
    }
}

/// Aggregate CHOICE types handed to dependent constructors.
#[derive(Debug, Clone)]
pub struct Generics {
    pub pdu: TypeRef,
    pub csap_layer: TypeRef,
}

/// Builds types that embed the aggregate CHOICE types.
pub type Dependent = Box<dyn FnOnce(&Generics) -> Result<Vec<TypeRef>, SchemaError> + Send>;

#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TypeRef>,
    protocols: Vec<Protocol>,
    dependents: Vec<Dependent>,
}

impl RegistryBuilder {
    pub fn add_type(mut self, ty: TypeRef) -> Self {
        self.types.push(ty);
        self
    }

    pub fn add_types(mut self, types: impl IntoIterator<Item = TypeRef>) -> Self {
        self.types.extend(types);
        self
    }

    pub fn add_protocol(mut self, protocol: Protocol) -> Self {
        self.protocols.push(protocol);
        self
    }

    pub fn add_dependent<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Generics) -> Result<Vec<TypeRef>, SchemaError> + Send + 'static,
    {
        self.dependents.push(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Registry, SchemaError> {
        let variants = |pick: fn(&Protocol) -> &TypeRef| -> Vec<NamedEntry> {
            self.protocols
                .iter()
                .map(|p| entry(&p.label, pick(p), Tag::private(p.tag)))
                .collect()
        };
        let generics = Generics {
            pdu: Type::choice(GENERIC_PDU, Tag::private(0), variants(|p| &p.pdu))?,
            csap_layer: Type::choice(GENERIC_CSAP_LAYER, Tag::private(0), variants(|p| &p.csap_layer))?,
        };

        let mut reg = Registry {
            types: IndexMap::new(),
            protocols: IndexMap::new(),
            generics: generics.clone(),
        };
        reg.insert(generics.pdu.clone());
        reg.insert(generics.csap_layer.clone());
        for ty in self.types {
            reg.insert(ty);
        }
        for p in self.protocols {
            reg.insert(p.pdu.clone());
            reg.insert(p.csap_layer.clone());
            for ty in &p.extra {
                reg.insert(ty.clone());
            }
            reg.protocols.insert(p.tag, p);
        }
        for dep in self.dependents {
            for ty in dep(&generics)? {
                reg.insert(ty);
            }
        }
        debug!(
            "registry built: {} types, {} protocols",
            reg.types.len(),
            reg.protocols.len()
        );
        Ok(reg)
    }
}

/// Read-only after construction; share it by reference or `Arc`.
#[derive(Debug)]
pub struct Registry {
    types: IndexMap<String, TypeRef>,
    protocols: IndexMap<u32, Protocol>,
    generics: Generics,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// First registration of a name wins; later types with the same name are
    /// reachable only through their parents.
    fn insert(&mut self, ty: TypeRef) {
        self.types.entry(ty.name.clone()).or_insert(ty);
    }

    /// Type registered under `name`.
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types.get(name).map(Arc::clone)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn generic_pdu(&self) -> &TypeRef {
        &self.generics.pdu
    }

    pub fn generic_csap_layer(&self) -> &TypeRef {
        &self.generics.csap_layer
    }

    pub fn protocol(&self, tag: u32) -> Option<&Protocol> {
        self.protocols.get(&tag)
    }

    pub fn protocol_by_label(&self, label: &str) -> Option<&Protocol> {
        self.protocols.values().find(|p| p.label == label)
    }

    pub fn protocols(&self) -> impl Iterator<Item = &Protocol> {
        self.protocols.values()
    }
}

/// Type a value is bound to.
pub fn get_type(value: &Value) -> &TypeRef {
    value.ty()
}
