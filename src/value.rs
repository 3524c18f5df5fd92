//! Runtime value trees bound to a [`Type`].
//!
//! Every node owns its children exclusively. Borrowed views handed out by
//! [`Value::get_child`], [`Value::element`] and the path lookups are ordinary
//! references, so they cannot outlive a prune or free of an ancestor.

use crate::error::{Error, Result};
use crate::types::{Kind, Primitive, Syntax, Tag, Type, TypeRef};
use std::sync::Arc;

/// Leaf payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// INTEGER, UINTEGER and ENUMERATED payloads.
    Integer(i64),
    Boolean(bool),
    Null,
    CharString(String),
    OctetString(Vec<u8>),
    ObjectId(Vec<u32>),
}

impl Scalar {
    fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Integer(_) => "integer",
            Scalar::Boolean(_) => "boolean",
            Scalar::Null => "null",
            Scalar::CharString(_) => "character string",
            Scalar::OctetString(_) => "octet string",
            Scalar::ObjectId(_) => "object identifier",
        }
    }
}

/// Node shape; always matches the bound type's kind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Data {
    /// One slot per entry of the SEQUENCE type, in declaration order.
    Sequence(Vec<Option<Value>>),
    Array(Vec<Value>),
    /// Active variant: entry index and its value.
    Choice(Option<(usize, Box<Value>)>),
    Tagged(Option<Box<Value>>),
    Scalar(Scalar),
}

/// A node of a value tree.
#[derive(Debug, Clone)]
pub struct Value {
    pub(crate) ty: TypeRef,
    /// Label under which the node sits in a named parent.
    pub(crate) label: Option<String>,
    pub(crate) tag: Tag,
    pub(crate) mark: i32,
    pub(crate) data: Data,
}

impl PartialEq for Value {
    /// Structural equality: same type name and same payload tree. Labels and marks
    /// are bookkeeping and do not take part.
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.data == other.data
    }
}

pub(crate) fn same_type(a: &TypeRef, b: &TypeRef) -> bool {
    Arc::ptr_eq(a, b) || (a.name == b.name && a.syntax() == b.syntax())
}

fn initial_data(ty: &Type) -> Data {
    match &ty.kind {
        Kind::Sequence(entries) => Data::Sequence(vec![None; entries.len()]),
        Kind::SequenceOf(_) => Data::Array(Vec::new()),
        Kind::Choice(_) => Data::Choice(None),
        Kind::Tagged(_) => Data::Tagged(None),
        Kind::Enumerated(vals) => Data::Scalar(Scalar::Integer(vals.first().map(|(_, v)| *v).unwrap_or(0))),
        Kind::Primitive(p) => Data::Scalar(match p {
            Primitive::Integer | Primitive::UInteger => Scalar::Integer(0),
            Primitive::Boolean => Scalar::Boolean(false),
            Primitive::Null => Scalar::Null,
            Primitive::CharString => Scalar::CharString(String::new()),
            Primitive::OctetString => Scalar::OctetString(vec![0; ty.fixed_len.unwrap_or(0)]),
            Primitive::ObjectId => Scalar::ObjectId(Vec::new()),
        }),
    }
}

/// `scalar` converted to the payload a leaf of `ty` stores, or `WrongType` /
/// `Overflow` if it does not fit.
pub(crate) fn fit_scalar(ty: &Type, scalar: Scalar) -> Result<Scalar> {
    let wrong = |s: &Scalar| {
        Error::WrongType(format!("{} payload for {} ({:?})", s.kind_name(), ty.name, ty.syntax()))
    };
    let scalar = match (&ty.kind, scalar) {
        (Kind::Primitive(Primitive::Integer), s @ Scalar::Integer(_)) => s,
        (Kind::Primitive(Primitive::UInteger), Scalar::Integer(i)) => {
            if !(0..=i64::from(u32::MAX)).contains(&i) {
                return Err(Error::WrongType(format!("{} is out of UINTEGER range", i)));
            }
            Scalar::Integer(i)
        }
        (Kind::Enumerated(_), s @ Scalar::Integer(_)) => s,
        (Kind::Primitive(Primitive::Boolean), Scalar::Integer(i)) => Scalar::Boolean(i != 0),
        (Kind::Primitive(Primitive::Boolean), s @ Scalar::Boolean(_)) => s,
        (Kind::Primitive(Primitive::Null), s @ Scalar::Null) => s,
        (Kind::Primitive(Primitive::CharString), s @ Scalar::CharString(_)) => s,
        (Kind::Primitive(Primitive::OctetString), Scalar::OctetString(mut b)) => {
            if let Some(n) = ty.fixed_len {
                if b.len() > n {
                    return Err(Error::Overflow { needed: b.len(), max: n });
                }
                b.resize(n, 0);
            }
            Scalar::OctetString(b)
        }
        (Kind::Primitive(Primitive::ObjectId), s @ Scalar::ObjectId(_)) => s,
        (_, s) => return Err(wrong(&s)),
    };
    Ok(scalar)
}

impl Value {
    /// Empty value of `ty`: no fields, no elements, no active variant, zero payload.
    pub fn new(ty: &TypeRef) -> Value {
        Value {
            ty: Arc::clone(ty),
            label: None,
            tag: ty.tag,
            mark: 0,
            data: initial_data(ty),
        }
    }

    /// Leaf value of `ty` holding `scalar`.
    pub fn with_scalar(ty: &TypeRef, scalar: Scalar) -> Result<Value> {
        let mut v = Value::new(ty);
        v.set_scalar(scalar)?;
        Ok(v)
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    pub fn syntax(&self) -> Syntax {
        self.ty.syntax()
    }

    /// Label of this node in its named parent (`None` for roots and array elements).
    pub fn name(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn put_mark(&mut self, mark: i32) {
        self.mark = mark;
    }

    pub fn get_mark(&self) -> i32 {
        self.mark
    }

    /// Drop all children and reset the payload, keeping the type binding.
    pub fn clear(&mut self) {
        self.data = initial_data(&self.ty);
    }

    /// Number of present children: set fields, elements, 0/1 for CHOICE and tagged.
    pub fn len(&self) -> usize {
        match &self.data {
            Data::Sequence(slots) => slots.iter().filter(|s| s.is_some()).count(),
            Data::Array(items) => items.len(),
            Data::Choice(c) => usize::from(c.is_some()),
            Data::Tagged(t) => usize::from(t.is_some()),
            Data::Scalar(Scalar::CharString(s)) => s.len(),
            Data::Scalar(Scalar::OctetString(b)) => b.len(),
            Data::Scalar(Scalar::ObjectId(ids)) => ids.len(),
            Data::Scalar(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// False when a CHOICE or tagged node has nothing selected, at any depth below
    /// arrays and tagged wrappers (optional SEQUENCE fields may stay absent).
    pub fn is_complete(&self) -> bool {
        match &self.data {
            Data::Sequence(slots) => slots.iter().flatten().all(Value::is_complete),
            Data::Array(items) => items.iter().all(Value::is_complete),
            Data::Choice(c) => c.as_ref().map_or(false, |(_, v)| v.is_complete()),
            Data::Tagged(t) => t.as_ref().map_or(false, |v| v.is_complete()),
            Data::Scalar(_) => true,
        }
    }

    // ---------------------------------------------------------------- scalars

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.data {
            Data::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.scalar()? {
            Scalar::Integer(i) => Some(*i),
            Scalar::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.scalar()? {
            Scalar::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.scalar()? {
            Scalar::CharString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.scalar()? {
            Scalar::OctetString(b) => Some(b),
            Scalar::CharString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&[u32]> {
        match self.scalar()? {
            Scalar::ObjectId(ids) => Some(ids),
            _ => None,
        }
    }

    /// Replace the payload of a leaf. The scalar must fit the leaf's primitive kind;
    /// fixed-size octet strings are zero-padded and reject longer input.
    pub fn set_scalar(&mut self, scalar: Scalar) -> Result<()> {
        self.data = Data::Scalar(fit_scalar(&self.ty, scalar)?);
        Ok(())
    }

    // ------------------------------------------------------- tag-addressed access

    /// Child with `tag`, bypassing label parsing. For a CHOICE this is the active
    /// variant, if it carries that tag.
    pub fn get_child(&self, tag: Tag) -> Option<&Value> {
        match &self.data {
            Data::Sequence(slots) => {
                let (i, _) = self.ty.entry_by_tag(tag)?;
                slots.get(i)?.as_ref()
            }
            Data::Choice(Some((_, v))) if v.tag == tag => Some(v),
            Data::Tagged(Some(v)) if v.tag == tag || self.ty.tag == tag => Some(v),
            _ => None,
        }
    }

    pub fn get_child_mut(&mut self, tag: Tag) -> Option<&mut Value> {
        match &mut self.data {
            Data::Sequence(slots) => {
                let (i, _) = self.ty.entry_by_tag(tag)?;
                slots.get_mut(i)?.as_mut()
            }
            Data::Choice(Some((_, v))) if v.tag == tag => Some(v),
            Data::Tagged(Some(v)) if v.tag == tag || self.ty.tag == tag => Some(v),
            _ => None,
        }
    }

    /// Place `child` under `tag`. A SEQUENCE field is replaced; a CHOICE that already
    /// holds a different variant is left untouched and `DuplicateVariant` is returned
    /// (use [`Value::select_child`] to switch variants).
    pub fn put_child(&mut self, child: Value, tag: Tag) -> Result<()> {
        if let Data::Choice(Some((active, _))) = &self.data {
            if let Some((i, _)) = self.ty.entry_by_tag(tag) {
                if i != *active {
                    let active_label = self.variant_label(*active);
                    return Err(Error::DuplicateVariant {
                        type_name: self.ty.name.clone(),
                        active: active_label,
                    });
                }
            }
        }
        self.place_child(child, tag)
    }

    /// Like [`Value::put_child`] but explicitly re-selects a CHOICE variant.
    pub fn select_child(&mut self, child: Value, tag: Tag) -> Result<()> {
        self.place_child(child, tag)
    }

    /// Detach the child with `tag` and hand ownership to the caller.
    pub fn take_child(&mut self, tag: Tag) -> Option<Value> {
        let index = self.ty.entry_by_tag(tag).map(|(i, _)| i);
        match &mut self.data {
            Data::Sequence(slots) => slots.get_mut(index?)?.take(),
            Data::Choice(c) => {
                if c.as_ref().map_or(false, |(i, _)| Some(*i) == index) {
                    c.take().map(|(_, v)| *v)
                } else {
                    None
                }
            }
            Data::Tagged(t) => t.take().map(|v| *v),
            _ => None,
        }
    }

    fn place_child(&mut self, mut child: Value, tag: Tag) -> Result<()> {
        match &mut self.data {
            Data::Sequence(slots) => {
                let (i, e) = self
                    .ty
                    .entry_by_tag(tag)
                    .ok_or_else(|| Error::wrong_label(tag.to_string(), &self.ty.name))?;
                if !same_type(&e.ty, &child.ty) {
                    return Err(Error::WrongType(format!(
                        "field '{}' of {} expects {}, got {}",
                        e.label, self.ty.name, e.ty.name, child.ty.name
                    )));
                }
                child.label = Some(e.label.clone());
                child.tag = e.tag;
                slots[i] = Some(child);
                Ok(())
            }
            Data::Choice(c) => {
                let (i, e) = self
                    .ty
                    .entry_by_tag(tag)
                    .ok_or_else(|| Error::wrong_label(tag.to_string(), &self.ty.name))?;
                if !same_type(&e.ty, &child.ty) {
                    return Err(Error::WrongType(format!(
                        "variant '{}' of {} expects {}, got {}",
                        e.label, self.ty.name, e.ty.name, child.ty.name
                    )));
                }
                child.label = Some(e.label.clone());
                child.tag = e.tag;
                *c = Some((i, Box::new(child)));
                Ok(())
            }
            Data::Tagged(t) => {
                let inner = self.ty.element().ok_or_else(|| Error::WrongType(self.ty.name.clone()))?;
                if !same_type(inner, &child.ty) {
                    return Err(Error::WrongType(format!(
                        "{} wraps {}, got {}",
                        self.ty.name, inner.name, child.ty.name
                    )));
                }
                *t = Some(Box::new(child));
                Ok(())
            }
            _ => Err(Error::WrongType(format!(
                "{} has no tag-addressed children",
                self.ty.name
            ))),
        }
    }

    // ------------------------------------------------------------------ choices

    pub(crate) fn variant_label(&self, index: usize) -> String {
        self.ty
            .entries()
            .and_then(|e| e.by_index(index))
            .map(|e| e.label.clone())
            .unwrap_or_default()
    }

    /// Label of the active CHOICE variant.
    pub fn active_variant(&self) -> Option<&str> {
        match &self.data {
            Data::Choice(Some((i, _))) => self
                .ty
                .entries()
                .and_then(|e| e.by_index(*i))
                .map(|e| e.label.as_str()),
            _ => None,
        }
    }

    /// Value of the active CHOICE variant.
    pub fn choice_value(&self) -> Option<&Value> {
        match &self.data {
            Data::Choice(Some((_, v))) => Some(v),
            _ => None,
        }
    }

    /// Inner value of a tagged node.
    pub fn tagged_value(&self) -> Option<&Value> {
        match &self.data {
            Data::Tagged(Some(v)) => Some(v),
            _ => None,
        }
    }

    /// Select `label` in a CHOICE with a fresh empty value, dropping any other variant.
    pub fn select_variant(&mut self, label: &str) -> Result<&mut Value> {
        let (i, e) = self
            .ty
            .entry_by_label(label)
            .filter(|_| matches!(self.ty.kind, Kind::Choice(_)))
            .ok_or_else(|| Error::wrong_label(label, &self.ty.name))?;
        let mut child = Value::new(&e.ty);
        child.label = Some(e.label.clone());
        child.tag = e.tag;
        self.data = Data::Choice(Some((i, Box::new(child))));
        match &mut self.data {
            Data::Choice(Some((_, v))) => Ok(v),
            _ => unreachable!("variant was just selected"),
        }
    }

    // -------------------------------------------------------------------- arrays

    /// Elements of a SEQUENCE OF value (empty for other shapes).
    pub fn elements(&self) -> &[Value] {
        match &self.data {
            Data::Array(items) => items,
            _ => &[],
        }
    }

    pub fn element(&self, index: usize) -> Option<&Value> {
        self.elements().get(index)
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut Value> {
        match &mut self.data {
            Data::Array(items) => items.get_mut(index),
            _ => None,
        }
    }

    /// Append an element, taking ownership.
    pub fn push(&mut self, elem: Value) -> Result<()> {
        let len = self.elements().len();
        self.insert_at(elem, len)
    }

    pub(crate) fn insert_at(&mut self, mut elem: Value, index: usize) -> Result<()> {
        let el_ty = match &self.ty.kind {
            Kind::SequenceOf(t) => t,
            _ => return Err(Error::WrongType(format!("{} is not a SEQUENCE OF", self.ty.name))),
        };
        if !same_type(el_ty, &elem.ty) {
            return Err(Error::WrongType(format!(
                "{} holds {}, got {}",
                self.ty.name, el_ty.name, elem.ty.name
            )));
        }
        match &mut self.data {
            Data::Array(items) => {
                if index > items.len() {
                    return Err(Error::wrong_label(index.to_string(), &self.ty.name));
                }
                elem.label = None;
                items.insert(index, elem);
                Ok(())
            }
            _ => Err(Error::WrongType(self.ty.name.clone())),
        }
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Result<Value> {
        match &mut self.data {
            Data::Array(items) if index < items.len() => Ok(items.remove(index)),
            Data::Array(_) => Err(Error::IncompleteValue(index.to_string())),
            _ => Err(Error::WrongType(format!("{} is not a SEQUENCE OF", self.ty.name))),
        }
    }

    // ------------------------------------------------------------------ children

    /// Present children in declaration order with the segment that addresses them.
    /// The inner value of a tagged node is addressed by no segment.
    pub(crate) fn children(&self) -> Vec<(Option<crate::path::Segment>, &Value)> {
        use crate::path::Segment;
        match &self.data {
            Data::Sequence(slots) => slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| {
                    let v = s.as_ref()?;
                    let label = self.ty.entries()?.by_index(i)?.label.clone();
                    Some((Some(Segment::Label(label)), v))
                })
                .collect(),
            Data::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Some(Segment::Index(i)), v))
                .collect(),
            Data::Choice(Some((i, v))) => vec![(Some(Segment::Variant(self.variant_label(*i))), &**v)],
            Data::Tagged(Some(v)) => vec![(None, &**v)],
            _ => Vec::new(),
        }
    }

    /// Set a SEQUENCE field or CHOICE variant by entry index (used by the parser).
    pub(crate) fn put_by_index(&mut self, index: usize, mut child: Value) {
        let Some(e) = self.ty.entries().and_then(|e| e.by_index(index)) else {
            debug_assert!(false, "entry index {} out of range for {}", index, self.ty.name);
            return;
        };
        child.label = Some(e.label.clone());
        child.tag = e.tag;
        match &mut self.data {
            Data::Sequence(slots) => slots[index] = Some(child),
            Data::Choice(c) => *c = Some((index, Box::new(child))),
            _ => debug_assert!(false, "{} is not a named compound", self.ty.name),
        }
    }
}
