//! Schema layer: immutable type descriptors that value trees are bound to.
//!
//! A [`Type`] is shared through [`TypeRef`] (`Arc<Type>`) and never changes after
//! construction. Named compound kinds (SEQUENCE, CHOICE) keep their entries in an
//! ordered label map plus a tag index, so both label and tag lookups are O(1) while
//! declaration order is preserved for printing and walking.

use crate::path::{Path, Segment};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type TypeRef = Arc<Type>;

/// ASN.1 tag class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    /// Keyword used in tagged plain-syntax values; context-specific has none.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            TagClass::Universal => Some("UNIVERSAL"),
            TagClass::Application => Some("APPLICATION"),
            TagClass::ContextSpecific => None,
            TagClass::Private => Some("PRIVATE"),
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "UNIVERSAL" => Some(TagClass::Universal),
            "APPLICATION" => Some(TagClass::Application),
            "PRIVATE" => Some(TagClass::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub number: u32,
}

impl Tag {
    pub const fn new(class: TagClass, number: u32) -> Self {
        Tag { class, number }
    }

    pub const fn universal(number: u32) -> Self {
        Tag::new(TagClass::Universal, number)
    }

    pub const fn application(number: u32) -> Self {
        Tag::new(TagClass::Application, number)
    }

    pub const fn context(number: u32) -> Self {
        Tag::new(TagClass::ContextSpecific, number)
    }

    pub const fn private(number: u32) -> Self {
        Tag::new(TagClass::Private, number)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class.keyword() {
            Some(kw) => write!(f, "[{} {}]", kw, self.number),
            None => write!(f, "[{}]", self.number),
        }
    }
}

/// Leaf payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Integer,
    UInteger,
    Boolean,
    Null,
    CharString,
    OctetString,
    ObjectId,
}

/// Coarse classification of a type, used by callers that branch on shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Sequence,
    SequenceOf,
    Choice,
    Tagged,
    Enumerated,
    Integer,
    UInteger,
    Boolean,
    Null,
    CharString,
    OctetString,
    ObjectId,
}

impl Syntax {
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            Syntax::Sequence | Syntax::SequenceOf | Syntax::Choice | Syntax::Tagged
        )
    }
}

/// One named component of a SEQUENCE or CHOICE.
#[derive(Debug, Clone)]
pub struct NamedEntry {
    pub label: String,
    pub ty: TypeRef,
    pub tag: Tag,
}

/// Shorthand constructor used by the NDN tables.
pub fn entry(label: &str, ty: &TypeRef, tag: Tag) -> NamedEntry {
    NamedEntry {
        label: label.to_string(),
        ty: Arc::clone(ty),
        tag,
    }
}

/// Ordered entries of a named compound type with label and tag indices.
#[derive(Debug, Clone)]
pub struct Entries {
    by_label: IndexMap<String, NamedEntry>,
    by_tag: HashMap<Tag, usize>,
}

impl Entries {
    fn build(type_name: &str, list: Vec<NamedEntry>) -> Result<Self, SchemaError> {
        let mut by_label = IndexMap::with_capacity(list.len());
        let mut by_tag = HashMap::with_capacity(list.len());
        for e in list {
            if by_tag.insert(e.tag, by_label.len()).is_some() {
                return Err(SchemaError::DuplicateTag {
                    type_name: type_name.to_string(),
                    tag: e.tag,
                });
            }
            if by_label.contains_key(&e.label) {
                return Err(SchemaError::DuplicateLabel {
                    type_name: type_name.to_string(),
                    label: e.label,
                });
            }
            by_label.insert(e.label.clone(), e);
        }
        Ok(Entries { by_label, by_tag })
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<(usize, &NamedEntry)> {
        self.by_label.get_full(label).map(|(i, _, e)| (i, e))
    }

    pub fn by_tag(&self, tag: Tag) -> Option<(usize, &NamedEntry)> {
        let i = *self.by_tag.get(&tag)?;
        self.by_index(i).map(|e| (i, e))
    }

    pub fn by_index(&self, index: usize) -> Option<&NamedEntry> {
        self.by_label.get_index(index).map(|(_, e)| e)
    }

    /// Index of the first entry whose type is exactly `ty` (by identity, then by name).
    pub fn position_of_type(&self, ty: &TypeRef) -> Option<usize> {
        self.by_label
            .values()
            .position(|e| Arc::ptr_eq(&e.ty, ty))
            .or_else(|| self.by_label.values().position(|e| e.ty.name == ty.name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedEntry> {
        self.by_label.values()
    }
}

#[derive(Debug, Clone)]
pub enum Kind {
    Sequence(Entries),
    SequenceOf(TypeRef),
    Choice(Entries),
    Tagged(TypeRef),
    Enumerated(Vec<(String, i64)>),
    Primitive(Primitive),
}

/// Structural defects in a schema; they are programming errors in type tables.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("type {type_name}: duplicate tag {tag}")]
    DuplicateTag { type_name: String, tag: Tag },
    #[error("type {type_name}: duplicate label '{label}'")]
    DuplicateLabel { type_name: String, label: String },
    #[error("type {type_name}: duplicate enumeration name '{name}'")]
    DuplicateEnumName { type_name: String, name: String },
    #[error("type {type_name}: label '{label}' is not a valid value reference")]
    BadLabel { type_name: String, label: String },
}

/// Immutable schema descriptor.
#[derive(Debug, Clone)]
pub struct Type {
    pub name: String,
    pub tag: Tag,
    pub kind: Kind,
    /// Fixed size for OCTET STRING types (e.g. 4 for IpAddress); `None` = variable.
    pub fixed_len: Option<usize>,
}

fn valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_labels(type_name: &str, entries: &[NamedEntry]) -> Result<(), SchemaError> {
    match entries.iter().find(|e| !valid_label(&e.label)) {
        Some(e) => Err(SchemaError::BadLabel {
            type_name: type_name.to_string(),
            label: e.label.clone(),
        }),
        None => Ok(()),
    }
}

impl Type {
    fn new(name: &str, tag: Tag, kind: Kind) -> TypeRef {
        Arc::new(Type {
            name: name.to_string(),
            tag,
            kind,
            fixed_len: None,
        })
    }

    pub fn primitive(name: &str, tag: Tag, primitive: Primitive) -> TypeRef {
        Type::new(name, tag, Kind::Primitive(primitive))
    }

    /// OCTET STRING of exactly `len` bytes.
    pub fn octet_string_fixed(name: &str, tag: Tag, len: usize) -> TypeRef {
        Arc::new(Type {
            name: name.to_string(),
            tag,
            kind: Kind::Primitive(Primitive::OctetString),
            fixed_len: Some(len),
        })
    }

    pub fn sequence(name: &str, tag: Tag, entries: Vec<NamedEntry>) -> Result<TypeRef, SchemaError> {
        check_labels(name, &entries)?;
        Ok(Type::new(name, tag, Kind::Sequence(Entries::build(name, entries)?)))
    }

    pub fn choice(name: &str, tag: Tag, entries: Vec<NamedEntry>) -> Result<TypeRef, SchemaError> {
        check_labels(name, &entries)?;
        Ok(Type::new(name, tag, Kind::Choice(Entries::build(name, entries)?)))
    }

    pub fn sequence_of(name: &str, tag: Tag, element: &TypeRef) -> TypeRef {
        Type::new(name, tag, Kind::SequenceOf(Arc::clone(element)))
    }

    pub fn tagged(name: &str, tag: Tag, inner: &TypeRef) -> TypeRef {
        Type::new(name, tag, Kind::Tagged(Arc::clone(inner)))
    }

    pub fn enumerated(name: &str, tag: Tag, values: &[(&str, i64)]) -> Result<TypeRef, SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for (n, _) in values {
            if !seen.insert(*n) {
                return Err(SchemaError::DuplicateEnumName {
                    type_name: name.to_string(),
                    name: n.to_string(),
                });
            }
        }
        let values = values.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        Ok(Type::new(name, tag, Kind::Enumerated(values)))
    }

    pub fn syntax(&self) -> Syntax {
        match &self.kind {
            Kind::Sequence(_) => Syntax::Sequence,
            Kind::SequenceOf(_) => Syntax::SequenceOf,
            Kind::Choice(_) => Syntax::Choice,
            Kind::Tagged(_) => Syntax::Tagged,
            Kind::Enumerated(_) => Syntax::Enumerated,
            Kind::Primitive(p) => match p {
                Primitive::Integer => Syntax::Integer,
                Primitive::UInteger => Syntax::UInteger,
                Primitive::Boolean => Syntax::Boolean,
                Primitive::Null => Syntax::Null,
                Primitive::CharString => Syntax::CharString,
                Primitive::OctetString => Syntax::OctetString,
                Primitive::ObjectId => Syntax::ObjectId,
            },
        }
    }

    /// Named entries of a SEQUENCE or CHOICE.
    pub fn entries(&self) -> Option<&Entries> {
        match &self.kind {
            Kind::Sequence(e) | Kind::Choice(e) => Some(e),
            _ => None,
        }
    }

    pub fn entry_by_label(&self, label: &str) -> Option<(usize, &NamedEntry)> {
        self.entries()?.get(label)
    }

    pub fn entry_by_tag(&self, tag: Tag) -> Option<(usize, &NamedEntry)> {
        self.entries()?.by_tag(tag)
    }

    pub fn label_to_tag(&self, label: &str) -> Option<Tag> {
        self.entry_by_label(label).map(|(_, e)| e.tag)
    }

    /// Element type of SEQUENCE OF, inner type of a tagged type.
    pub fn element(&self) -> Option<&TypeRef> {
        match &self.kind {
            Kind::SequenceOf(t) | Kind::Tagged(t) => Some(t),
            _ => None,
        }
    }

    pub fn enum_name(&self, value: i64) -> Option<&str> {
        match &self.kind {
            Kind::Enumerated(vals) => vals.iter().find(|(_, v)| *v == value).map(|(n, _)| n.as_str()),
            _ => None,
        }
    }

    pub fn enum_value(&self, name: &str) -> Option<i64> {
        match &self.kind {
            Kind::Enumerated(vals) => vals.iter().find(|(n, _)| n == name).map(|(_, v)| *v),
            _ => None,
        }
    }

    /// Type-level resolution of `path` (no value needed). Tagged types are transparent;
    /// `Param` segments must be bound first.
    pub fn subtype(self: &Arc<Self>, path: &Path) -> Option<TypeRef> {
        let mut ty = Arc::clone(self);
        for seg in path.segments() {
            while let Kind::Tagged(inner) = &ty.kind {
                ty = Arc::clone(inner);
            }
            let next = match (&ty.kind, seg) {
                (Kind::Sequence(e), Segment::Label(l)) => e.get(l).map(|(_, e)| Arc::clone(&e.ty)),
                (Kind::Choice(e), Segment::Label(l) | Segment::Variant(l)) => {
                    e.get(l).map(|(_, e)| Arc::clone(&e.ty))
                }
                (Kind::SequenceOf(el), Segment::Index(_)) => Some(Arc::clone(el)),
                _ => None,
            }?;
            ty = next;
        }
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Universal base types shared by every table.
pub mod base {
    use super::*;
    use once_cell::sync::Lazy;

    static INTEGER: Lazy<TypeRef> = Lazy::new(|| Type::primitive("INTEGER", Tag::universal(2), Primitive::Integer));
    static UINTEGER: Lazy<TypeRef> = Lazy::new(|| Type::primitive("UINTEGER", Tag::universal(2), Primitive::UInteger));
    static BOOLEAN: Lazy<TypeRef> = Lazy::new(|| Type::primitive("BOOLEAN", Tag::universal(1), Primitive::Boolean));
    static NULL: Lazy<TypeRef> = Lazy::new(|| Type::primitive("NULL", Tag::universal(5), Primitive::Null));
    static OCTET_STRING: Lazy<TypeRef> =
        Lazy::new(|| Type::primitive("OCTET STRING", Tag::universal(4), Primitive::OctetString));
    static CHAR_STRING: Lazy<TypeRef> =
        Lazy::new(|| Type::primitive("UniversalString", Tag::universal(28), Primitive::CharString));
    static OBJECT_ID: Lazy<TypeRef> =
        Lazy::new(|| Type::primitive("OBJECT IDENTIFIER", Tag::universal(6), Primitive::ObjectId));

    pub fn integer() -> TypeRef {
        Arc::clone(&INTEGER)
    }

    pub fn uinteger() -> TypeRef {
        Arc::clone(&UINTEGER)
    }

    pub fn boolean() -> TypeRef {
        Arc::clone(&BOOLEAN)
    }

    pub fn null() -> TypeRef {
        Arc::clone(&NULL)
    }

    pub fn octet_string() -> TypeRef {
        Arc::clone(&OCTET_STRING)
    }

    pub fn char_string() -> TypeRef {
        Arc::clone(&CHAR_STRING)
    }

    pub fn object_id() -> TypeRef {
        Arc::clone(&OBJECT_ID)
    }
}
