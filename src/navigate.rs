//! Path resolution over value trees: lookups, auto-vivifying writes, indexed
//! insert/remove, pruning and leaf field access.
//!
//! Two lookup modes exist and are not interchangeable:
//!
//! | Mode | Entry point | Unset CHOICE / absent slot | Inactive variant named | Label not a variant |
//! |------|-------------|----------------------------|------------------------|---------------------|
//! | tolerant | [`Value::find_descendant`] | `IncompleteValue` | `OtherChoice` | descend into active variant |
//! | strict | [`Value::retrieve_descendant`] | `WrongLabel` | `WrongLabel` | `WrongLabel` |
//!
//! Tagged nodes are transparent in both modes. Writes ([`Value::write_component`],
//! [`Value::write_value_field`], [`Value::insert_indexed`]) create the missing
//! nodes they pass through: absent fields, the array slot right after the last
//! element, and the CHOICE variant named by the path (replacing another active one).
//! Each write is checked against the types along its path first, so a failed
//! write leaves the tree unchanged.

use crate::error::{Error, Result};
use crate::path::{concrete, AsPath, Path, Segment};
use crate::types::{Kind, Primitive, Syntax, TypeRef};
use crate::value::{fit_scalar, same_type, Data, Scalar, Value};
use byteorder::{BigEndian, ByteOrder};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Tolerant,
    Strict,
}

/// Where the next node lives relative to the current one.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Field(usize),
    Element(usize),
    Variant,
    Inner,
}

enum Step {
    /// Enter the slot and consume the segment.
    Enter(Slot),
    /// Enter the slot, keep the segment for the child (tagged, choice fall-through).
    Pass(Slot),
}

impl Value {
    fn slot(&self, slot: Slot) -> Option<&Value> {
        match (&self.data, slot) {
            (Data::Sequence(slots), Slot::Field(i)) => slots.get(i)?.as_ref(),
            (Data::Array(items), Slot::Element(i)) => items.get(i),
            (Data::Choice(Some((_, v))), Slot::Variant) => Some(v),
            (Data::Tagged(Some(v)), Slot::Inner) => Some(v),
            _ => None,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut Value> {
        match (&mut self.data, slot) {
            (Data::Sequence(slots), Slot::Field(i)) => slots.get_mut(i)?.as_mut(),
            (Data::Array(items), Slot::Element(i)) => items.get_mut(i),
            (Data::Choice(Some((_, v))), Slot::Variant) => Some(v),
            (Data::Tagged(Some(v)), Slot::Inner) => Some(v),
            _ => None,
        }
    }
}

fn locate(node: &Value, seg: &Segment, mode: Mode, at: &Path) -> Result<Step> {
    let incomplete = || match mode {
        Mode::Tolerant => Error::IncompleteValue(at.join(seg.clone()).to_string()),
        Mode::Strict => Error::wrong_label(seg.to_string(), &node.ty.name),
    };
    let wrong = || Error::wrong_label(seg.to_string(), &node.ty.name);
    match (&node.data, seg) {
        (Data::Tagged(inner), _) => match inner {
            Some(_) => Ok(Step::Pass(Slot::Inner)),
            None => Err(incomplete()),
        },
        (Data::Sequence(slots), Segment::Label(l)) => {
            let (i, _) = node.ty.entry_by_label(l).ok_or_else(wrong)?;
            match slots[i] {
                Some(_) => Ok(Step::Enter(Slot::Field(i))),
                None => Err(incomplete()),
            }
        }
        (Data::Choice(active), Segment::Label(l) | Segment::Variant(l)) => {
            let explicit = matches!(seg, Segment::Variant(_));
            match (node.ty.entry_by_label(l), active) {
                (Some((i, _)), Some((a, _))) if i == *a => Ok(Step::Enter(Slot::Variant)),
                (Some(_), Some((a, _))) => match mode {
                    Mode::Tolerant => Err(Error::OtherChoice {
                        requested: l.clone(),
                        active: node.variant_label(*a),
                    }),
                    Mode::Strict => Err(wrong()),
                },
                (Some(_), None) => Err(incomplete()),
                (None, Some(_)) if !explicit && mode == Mode::Tolerant => Ok(Step::Pass(Slot::Variant)),
                (None, None) if !explicit && mode == Mode::Tolerant => Err(incomplete()),
                (None, _) => Err(wrong()),
            }
        }
        (Data::Array(items), Segment::Index(i)) => {
            if *i < items.len() {
                Ok(Step::Enter(Slot::Element(*i)))
            } else {
                Err(incomplete())
            }
        }
        (_, Segment::Param) => Err(Error::BadPath(format!("'{}': unbound parameter", at))),
        _ => Err(wrong()),
    }
}

fn resolve<'a>(root: &'a Value, path: &Path, mode: Mode) -> Result<&'a Value> {
    let segs = path.segments();
    let mut at = Path::root();
    let mut cur = root;
    let mut i = 0;
    while i < segs.len() {
        let step = locate(cur, &segs[i], mode, &at).map_err(|e| {
            trace!("resolve '{}' ({:?}) stopped at '{}': {}", path, mode, at, e);
            e
        })?;
        let slot = match step {
            Step::Enter(s) => {
                at.push(segs[i].clone());
                i += 1;
                s
            }
            Step::Pass(s) => s,
        };
        cur = cur
            .slot(slot)
            .ok_or_else(|| Error::IncompleteValue(at.to_string()))?;
    }
    Ok(cur)
}

fn resolve_mut<'a>(root: &'a mut Value, path: &Path, mode: Mode) -> Result<&'a mut Value> {
    let segs = path.segments();
    let mut at = Path::root();
    let mut cur = root;
    let mut i = 0;
    while i < segs.len() {
        let slot = match locate(cur, &segs[i], mode, &at)? {
            Step::Enter(s) => {
                at.push(segs[i].clone());
                i += 1;
                s
            }
            Step::Pass(s) => s,
        };
        let missing = Error::IncompleteValue(at.to_string());
        cur = cur.slot_mut(slot).ok_or(missing)?;
    }
    Ok(cur)
}

/// Where a write to `path` would land, found without touching the tree: the
/// target's type and the node already there, if any. Fails exactly where
/// [`vivify`] would, so callers check the whole write before creating anything.
fn plan<'a>(root: &'a Value, path: &Path) -> Result<(TypeRef, Option<&'a Value>)> {
    let segs = path.segments();
    let mut ty = root.ty.clone();
    let mut cur = Some(root);
    let mut i = 0;
    while i < segs.len() {
        let seg = &segs[i];
        let wrong = || Error::wrong_label(seg.to_string(), &ty.name);
        let (next_ty, next, enter) = match &ty.kind {
            Kind::Tagged(inner) => (inner.clone(), cur.and_then(Value::tagged_value), false),
            Kind::Sequence(entries) => {
                let Segment::Label(l) = seg else { return Err(wrong()) };
                let (k, e) = entries.get(l).ok_or_else(wrong)?;
                (e.ty.clone(), cur.and_then(|v| v.slot(Slot::Field(k))), true)
            }
            Kind::Choice(entries) => {
                let (Segment::Label(l) | Segment::Variant(l)) = seg else { return Err(wrong()) };
                let active = cur.and_then(|v| match &v.data {
                    Data::Choice(Some((a, v))) => Some((*a, &**v)),
                    _ => None,
                });
                match (entries.get(l), active) {
                    (Some((k, e)), _) => {
                        let kept = active.filter(|(a, _)| *a == k).map(|(_, v)| v);
                        (e.ty.clone(), kept, true)
                    }
                    (None, Some((_, v))) if matches!(seg, Segment::Label(_)) => (v.ty.clone(), Some(v), false),
                    (None, _) => return Err(wrong()),
                }
            }
            Kind::SequenceOf(el) => {
                let Segment::Index(k) = seg else { return Err(wrong()) };
                let items = cur.map_or(&[][..], Value::elements);
                if *k > items.len() {
                    return Err(wrong());
                }
                (el.clone(), items.get(*k), true)
            }
            Kind::Enumerated(_) | Kind::Primitive(_) => return Err(wrong()),
        };
        if enter {
            i += 1;
        }
        ty = next_ty;
        cur = next;
    }
    Ok((ty, cur))
}

/// Create whatever `seg` needs on `node` and say where to go next.
fn vivify_step(node: &mut Value, seg: &Segment) -> Result<Step> {
    let ty = node.ty.clone();
    let wrong = || Error::wrong_label(seg.to_string(), &ty.name);
    match &ty.kind {
        Kind::Tagged(inner) => {
            if let Data::Tagged(t @ None) = &mut node.data {
                *t = Some(Box::new(Value::new(inner)));
            }
            Ok(Step::Pass(Slot::Inner))
        }
        Kind::Sequence(entries) => {
            let Segment::Label(l) = seg else { return Err(wrong()) };
            let (i, e) = entries.get(l).ok_or_else(wrong)?;
            if let Data::Sequence(slots) = &mut node.data {
                if slots[i].is_none() {
                    let mut child = Value::new(&e.ty);
                    let (label, tag) = (e.label.clone(), e.tag);
                    child.label = Some(label);
                    child.tag = tag;
                    slots[i] = Some(child);
                }
            }
            Ok(Step::Enter(Slot::Field(i)))
        }
        Kind::Choice(entries) => {
            let (Segment::Label(l) | Segment::Variant(l)) = seg else { return Err(wrong()) };
            match entries.get(l) {
                Some((i, _)) => {
                    let selected = matches!(&node.data, Data::Choice(Some((a, _))) if *a == i);
                    if !selected {
                        node.select_variant(l)?;
                    }
                    Ok(Step::Enter(Slot::Variant))
                }
                None if matches!(seg, Segment::Label(_)) && node.choice_value().is_some() => {
                    Ok(Step::Pass(Slot::Variant))
                }
                None => Err(wrong()),
            }
        }
        Kind::SequenceOf(el) => {
            let Segment::Index(i) = seg else { return Err(wrong()) };
            let len = node.elements().len();
            if *i == len {
                node.push(Value::new(el))?;
            } else if *i > len {
                return Err(wrong());
            }
            Ok(Step::Enter(Slot::Element(*i)))
        }
        Kind::Enumerated(_) | Kind::Primitive(_) => Err(wrong()),
    }
}

fn vivify<'a>(root: &'a mut Value, path: &Path) -> Result<&'a mut Value> {
    let segs = path.segments();
    let mut cur = root;
    let mut i = 0;
    while i < segs.len() {
        let slot = match vivify_step(cur, &segs[i])? {
            Step::Enter(s) => {
                i += 1;
                s
            }
            Step::Pass(s) => s,
        };
        let missing = Error::IncompleteValue(path.to_string());
        cur = cur.slot_mut(slot).ok_or(missing)?;
    }
    Ok(cur)
}

/// Whether `src` can be stored at a node of type `target`, directly or as a
/// variant of a CHOICE.
fn compatible(target: &TypeRef, src: &TypeRef) -> bool {
    if same_type(target, src) {
        return true;
    }
    match &target.kind {
        Kind::Choice(entries) => entries.position_of_type(src).is_some(),
        _ => false,
    }
}

/// Overwrite `target` with a deep copy of `src`, keeping target's position data.
fn assign(target: &mut Value, src: &Value) -> Result<()> {
    if same_type(&target.ty, &src.ty) {
        target.data = src.data.clone();
        target.mark = src.mark;
        return Ok(());
    }
    let index = target
        .ty
        .entries()
        .filter(|_| matches!(target.ty.kind, Kind::Choice(_)))
        .and_then(|e| e.position_of_type(&src.ty))
        .ok_or_else(|| {
            Error::WrongType(format!("cannot store {} into {}", src.ty.name, target.ty.name))
        })?;
    target.put_by_index(index, src.clone());
    Ok(())
}

/// Normalize a signed array index: `-1` is the last slot of a `len`-slot range.
fn signed_index(index: isize, len: usize) -> Option<usize> {
    if index < 0 {
        let back = index.unsigned_abs();
        len.checked_sub(back)
    } else {
        Some(index as usize).filter(|i| *i < len)
    }
}

/// Payload for a leaf of `ty` decoded from its binary field form.
fn decode_field(ty: &TypeRef, data: &[u8], path: &Path) -> Result<Scalar> {
    let scalar = match &ty.kind {
        Kind::Primitive(Primitive::Integer | Primitive::UInteger) | Kind::Enumerated(_) => {
            Scalar::Integer(match data.len() {
                1 => i64::from(data[0]),
                2 => i64::from(BigEndian::read_u16(data)),
                4 => i64::from(BigEndian::read_u32(data)),
                8 => BigEndian::read_i64(data),
                n => return Err(Error::WrongType(format!("integer field width {} bytes", n))),
            })
        }
        Kind::Primitive(Primitive::Boolean) => Scalar::Boolean(data.iter().any(|b| *b != 0)),
        Kind::Primitive(Primitive::Null) => Scalar::Null,
        Kind::Primitive(Primitive::OctetString) => Scalar::OctetString(data.to_vec()),
        Kind::Primitive(Primitive::CharString) => {
            let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
            let s = std::str::from_utf8(&data[..end])
                .map_err(|e| Error::WrongType(format!("character string is not UTF-8: {}", e)))?;
            Scalar::CharString(s.to_string())
        }
        Kind::Primitive(Primitive::ObjectId) => {
            if data.len() % 4 != 0 {
                return Err(Error::WrongType("object id data is not a multiple of 4 bytes".into()));
            }
            Scalar::ObjectId(data.chunks_exact(4).map(BigEndian::read_u32).collect())
        }
        _ => {
            return Err(Error::WrongType(format!(
                "'{}' is a {:?}, not a leaf",
                path,
                ty.syntax()
            )))
        }
    };
    Ok(scalar)
}

/// Descend through CHOICE and tagged wrappers to the leaf they hold.
fn leaf<'a>(mut node: &'a Value, path: &Path) -> Result<&'a Value> {
    loop {
        match &node.data {
            Data::Choice(Some((_, v))) | Data::Tagged(Some(v)) => node = v,
            Data::Choice(None) | Data::Tagged(None) => {
                return Err(Error::IncompleteValue(path.to_string()))
            }
            Data::Scalar(_) => return Ok(node),
            _ => {
                return Err(Error::WrongType(format!(
                    "'{}' is a {:?}, not a leaf",
                    path,
                    node.syntax()
                )))
            }
        }
    }
}

impl Value {
    /// Tolerant, non-mutating lookup (see the module table).
    pub fn find_descendant<P: AsPath + ?Sized>(&self, path: &P) -> Result<&Value> {
        let path = concrete(path)?;
        resolve(self, &path, Mode::Tolerant)
    }

    pub fn find_descendant_mut<P: AsPath + ?Sized>(&mut self, path: &P) -> Result<&mut Value> {
        let path = concrete(path)?;
        resolve_mut(self, &path, Mode::Tolerant)
    }

    /// Strict lookup: every segment must name a present node, and CHOICE segments
    /// must name the active variant. Any failure is `WrongLabel`.
    pub fn retrieve_descendant<P: AsPath + ?Sized>(&self, path: &P) -> Result<&Value> {
        let path = concrete(path)?;
        resolve(self, &path, Mode::Strict)
    }

    pub fn retrieve_descendant_mut<P: AsPath + ?Sized>(&mut self, path: &P) -> Result<&mut Value> {
        let path = concrete(path)?;
        resolve_mut(self, &path, Mode::Strict)
    }

    /// Deep-copy `subvalue` into the node at `path`, creating intermediate nodes.
    /// A value of a CHOICE variant's type written at a CHOICE node selects that variant.
    /// On error the tree is left as it was.
    pub fn write_component<P: AsPath + ?Sized>(&mut self, subvalue: &Value, path: &P) -> Result<()> {
        let path = concrete(path)?;
        let (target_ty, _) = plan(self, &path)?;
        if !compatible(&target_ty, &subvalue.ty) {
            return Err(Error::WrongType(format!(
                "cannot store {} at '{}' ({})",
                subvalue.ty.name, path, target_ty.name
            )));
        }
        let target = vivify(self, &path)?;
        assign(target, subvalue)
    }

    /// Copy of the node at `path` (tolerant lookup).
    pub fn read_component<P: AsPath + ?Sized>(&self, path: &P) -> Result<Value> {
        self.find_descendant(path).map(Value::clone)
    }

    /// Insert `elem` into the SEQUENCE OF at `path`, taking ownership. `index == -1`
    /// appends; other negative indices count from the end. Elements at and after
    /// `index` shift up by one.
    pub fn insert_indexed<P: AsPath + ?Sized>(&mut self, elem: Value, index: isize, path: &P) -> Result<()> {
        let path = concrete(path)?;
        let (ty, existing) = plan(self, &path)?;
        let Kind::SequenceOf(el_ty) = &ty.kind else {
            return Err(Error::WrongType(format!("{} is not a SEQUENCE OF", ty.name)));
        };
        if !same_type(el_ty, &elem.ty) {
            return Err(Error::WrongType(format!(
                "{} holds {}, got {}",
                ty.name, el_ty.name, elem.ty.name
            )));
        }
        let len = existing.map_or(0, |v| v.elements().len());
        let at = signed_index(index, len + 1).ok_or_else(|| Error::wrong_label(index.to_string(), &ty.name))?;
        vivify(self, &path)?.insert_at(elem, at)
    }

    /// Borrowed element `index` of the SEQUENCE OF at `path`.
    pub fn read_indexed<P: AsPath + ?Sized>(&self, index: isize, path: &P) -> Result<&Value> {
        let arr = self.find_descendant(path)?;
        if arr.syntax() != Syntax::SequenceOf {
            return Err(Error::WrongType(format!("{} is not a SEQUENCE OF", arr.ty.name)));
        }
        let elems = arr.elements();
        signed_index(index, elems.len())
            .and_then(|i| elems.get(i))
            .ok_or_else(|| Error::IncompleteValue(format!("{}[{}]", arr.ty.name, index)))
    }

    /// Owned copy of element `index` of the SEQUENCE OF at `path`.
    pub fn get_indexed<P: AsPath + ?Sized>(&self, index: isize, path: &P) -> Result<Value> {
        self.read_indexed(index, path).map(Value::clone)
    }

    /// Replace element `index` with a deep copy of `elem`.
    pub fn write_indexed<P: AsPath + ?Sized>(&mut self, elem: &Value, index: isize, path: &P) -> Result<()> {
        let arr = self.find_descendant_mut(path)?;
        let len = arr.elements().len();
        let i = signed_index(index, len)
            .ok_or_else(|| Error::IncompleteValue(format!("{}[{}]", arr.ty.name, index)))?;
        let slot = arr
            .element_mut(i)
            .ok_or_else(|| Error::WrongType("not a SEQUENCE OF".to_string()))?;
        if !same_type(&slot.ty, &elem.ty) {
            return Err(Error::WrongType(format!(
                "element is {}, got {}",
                slot.ty.name, elem.ty.name
            )));
        }
        *slot = elem.clone();
        Ok(())
    }

    /// Remove element `index`; later elements renumber.
    pub fn remove_indexed<P: AsPath + ?Sized>(&mut self, index: isize, path: &P) -> Result<Value> {
        let arr = self.find_descendant_mut(path)?;
        let len = arr.elements().len();
        let i = signed_index(index, len)
            .ok_or_else(|| Error::IncompleteValue(format!("{}[{}]", arr.ty.name, index)))?;
        arr.remove_at(i)
    }

    /// Detach the node at `path` and return it. Array siblings renumber; a SEQUENCE
    /// field only loses its presence. `Ok(None)` if the node is already absent.
    pub fn detach<P: AsPath + ?Sized>(&mut self, path: &P) -> Result<Option<Value>> {
        let path = concrete(path)?;
        let Some((parent_path, last)) = path.split_last() else {
            return Err(Error::BadPath("cannot detach the root".to_string()));
        };
        let mut parent = match resolve_mut(self, &parent_path, Mode::Tolerant) {
            Ok(p) => p,
            Err(Error::IncompleteValue(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        loop {
            let wrong = Error::wrong_label(last.to_string(), &parent.ty.name);
            let ty = parent.ty.clone();
            match (&mut parent.data, last) {
                (Data::Tagged(Some(_)), _) => {}
                (Data::Tagged(None), _) => return Ok(None),
                (Data::Sequence(slots), Segment::Label(l)) => {
                    let (i, _) = ty.entry_by_label(l).ok_or(wrong)?;
                    return Ok(slots[i].take());
                }
                (Data::Array(items), Segment::Index(i)) => {
                    return Ok((*i < items.len()).then(|| items.remove(*i)));
                }
                (Data::Choice(active), Segment::Label(l) | Segment::Variant(l)) => {
                    let active_index = active.as_ref().map(|(a, _)| *a);
                    match (ty.entry_by_label(l).map(|(i, _)| i), active_index) {
                        (Some(i), Some(a)) if i == a => {
                            return Ok(active.take().map(|(_, v)| *v));
                        }
                        (Some(_), Some(a)) => {
                            return Err(Error::OtherChoice {
                                requested: l.clone(),
                                active: ty
                                    .entries()
                                    .and_then(|e| e.by_index(a))
                                    .map(|e| e.label.clone())
                                    .unwrap_or_default(),
                            });
                        }
                        (Some(_), None) => return Ok(None),
                        (None, Some(_)) if matches!(last, Segment::Label(_)) => {}
                        (None, None) if matches!(last, Segment::Label(_)) => return Ok(None),
                        (None, _) => return Err(wrong),
                    }
                }
                _ => return Err(wrong),
            }
            // Fall through a tagged wrapper or an active CHOICE.
            let slot = match parent.data {
                Data::Tagged(_) => Slot::Inner,
                _ => Slot::Variant,
            };
            let missing = Error::IncompleteValue(path.to_string());
            parent = parent.slot_mut(slot).ok_or(missing)?;
        }
    }

    /// Prune the node at `path`; pruning an absent node is a no-op.
    pub fn free_subvalue<P: AsPath + ?Sized>(&mut self, path: &P) -> Result<()> {
        self.detach(path).map(drop)
    }

    // ------------------------------------------------------------ leaf fields

    /// Payload of the leaf at `path`; CHOICE and tagged nodes on the way are
    /// descended through their active content.
    pub fn read_field<P: AsPath + ?Sized>(&self, path: &P) -> Result<&Scalar> {
        let path = concrete(path)?;
        let node = resolve(self, &path, Mode::Tolerant)?;
        let node = leaf(node, &path)?;
        node.scalar()
            .ok_or_else(|| Error::WrongType(format!("'{}' is not a leaf", path)))
    }

    /// Set the payload of the leaf at `path`, creating intermediate nodes. A payload
    /// that does not fit the leaf is rejected before anything is created.
    pub fn write_field<P: AsPath + ?Sized>(&mut self, scalar: Scalar, path: &P) -> Result<()> {
        let path = concrete(path)?;
        let (ty, _) = plan(self, &path)?;
        let scalar = fit_scalar(&ty, scalar)?;
        vivify(self, &path)?.data = Data::Scalar(scalar);
        Ok(())
    }

    /// Decode the leaf at `path` into `buf` and return the number of bytes used.
    ///
    /// Integers are written big-endian with the width of `buf` (1, 2, 4 or 8 bytes),
    /// booleans as one byte, octet strings as raw bytes, character strings as
    /// NUL-terminated bytes and object ids as big-endian 32-bit arcs.
    pub fn read_value_field<P: AsPath + ?Sized>(&self, buf: &mut [u8], path: &P) -> Result<usize> {
        let overflow = |needed: usize, max: usize| Error::Overflow { needed, max };
        match self.read_field(path)? {
            Scalar::Integer(i) => {
                let i = *i;
                let fits = match buf.len() {
                    1 => u8::try_from(i).is_ok() || i8::try_from(i).is_ok(),
                    2 => u16::try_from(i).is_ok() || i16::try_from(i).is_ok(),
                    4 => u32::try_from(i).is_ok() || i32::try_from(i).is_ok(),
                    8 => true,
                    n => return Err(Error::WrongType(format!("integer field width {} bytes", n))),
                };
                if !fits {
                    return Err(overflow(8, buf.len()));
                }
                match buf.len() {
                    1 => buf[0] = i as u8,
                    2 => BigEndian::write_u16(buf, i as u16),
                    4 => BigEndian::write_u32(buf, i as u32),
                    _ => BigEndian::write_i64(buf, i),
                }
                Ok(buf.len())
            }
            Scalar::Boolean(b) => {
                let first = buf.first_mut().ok_or_else(|| overflow(1, 0))?;
                *first = u8::from(*b);
                Ok(1)
            }
            Scalar::Null => Ok(0),
            Scalar::OctetString(bytes) => {
                if buf.len() < bytes.len() {
                    return Err(overflow(bytes.len(), buf.len()));
                }
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            Scalar::CharString(s) => {
                let n = s.len();
                if buf.len() < n + 1 {
                    return Err(overflow(n + 1, buf.len()));
                }
                buf[..n].copy_from_slice(s.as_bytes());
                buf[n] = 0;
                Ok(n + 1)
            }
            Scalar::ObjectId(ids) => {
                let needed = ids.len() * 4;
                if buf.len() < needed {
                    return Err(overflow(needed, buf.len()));
                }
                for (chunk, id) in buf.chunks_exact_mut(4).zip(ids) {
                    BigEndian::write_u32(chunk, *id);
                }
                Ok(needed)
            }
        }
    }

    /// Encode `data` into the leaf at `path` according to its primitive kind
    /// (inverse of [`Value::read_value_field`]), creating intermediate nodes.
    pub fn write_value_field<P: AsPath + ?Sized>(&mut self, data: &[u8], path: &P) -> Result<()> {
        let path = concrete(path)?;
        let (ty, _) = plan(self, &path)?;
        let scalar = decode_field(&ty, data, &path)?;
        self.write_field(scalar, &*path)
    }

    pub fn read_int<P: AsPath + ?Sized>(&self, path: &P) -> Result<i64> {
        match self.read_field(path)? {
            Scalar::Integer(i) => Ok(*i),
            Scalar::Boolean(b) => Ok(i64::from(*b)),
            other => Err(Error::WrongType(format!("{:?} is not an integer", other))),
        }
    }

    pub fn write_int<P: AsPath + ?Sized>(&mut self, value: i64, path: &P) -> Result<()> {
        self.write_field(Scalar::Integer(value), path)
    }

    pub fn read_bool<P: AsPath + ?Sized>(&self, path: &P) -> Result<bool> {
        match self.read_field(path)? {
            Scalar::Boolean(b) => Ok(*b),
            other => Err(Error::WrongType(format!("{:?} is not a boolean", other))),
        }
    }

    pub fn write_bool<P: AsPath + ?Sized>(&mut self, value: bool, path: &P) -> Result<()> {
        self.write_field(Scalar::Boolean(value), path)
    }

    pub fn read_string<P: AsPath + ?Sized>(&self, path: &P) -> Result<&str> {
        match self.read_field(path)? {
            Scalar::CharString(s) => Ok(s),
            other => Err(Error::WrongType(format!("{:?} is not a character string", other))),
        }
    }

    pub fn write_string<P: AsPath + ?Sized>(&mut self, value: &str, path: &P) -> Result<()> {
        self.write_field(Scalar::CharString(value.to_string()), path)
    }

    pub fn read_octets<P: AsPath + ?Sized>(&self, path: &P) -> Result<&[u8]> {
        match self.read_field(path)? {
            Scalar::OctetString(b) => Ok(b),
            other => Err(Error::WrongType(format!("{:?} is not an octet string", other))),
        }
    }

    pub fn write_octets<P: AsPath + ?Sized>(&mut self, value: &[u8], path: &P) -> Result<()> {
        self.write_field(Scalar::OctetString(value.to_vec()), path)
    }

    pub fn read_oid<P: AsPath + ?Sized>(&self, path: &P) -> Result<&[u32]> {
        match self.read_field(path)? {
            Scalar::ObjectId(ids) => Ok(ids),
            other => Err(Error::WrongType(format!("{:?} is not an object identifier", other))),
        }
    }

    // ----------------------------------------------------------------- queries

    /// Element count of an array, byte length of a string, present children otherwise.
    pub fn get_length<P: AsPath + ?Sized>(&self, path: &P) -> Result<usize> {
        self.find_descendant(path).map(Value::len)
    }

    /// Label of the active variant of the CHOICE at `path`.
    pub fn get_choice<P: AsPath + ?Sized>(&self, path: &P) -> Result<&str> {
        let node = self.find_descendant(path)?;
        if node.syntax() != Syntax::Choice {
            return Err(Error::WrongType(format!("{} is not a CHOICE", node.ty.name)));
        }
        node.active_variant()
            .ok_or_else(|| Error::IncompleteValue(node.ty.name.clone()))
    }

    pub fn get_syntax<P: AsPath + ?Sized>(&self, path: &P) -> Result<Syntax> {
        self.find_descendant(path).map(Value::syntax)
    }

    /// True when every node present in `pattern` is present in `self` with the same
    /// variant and payload. Extra content in `self` is ignored.
    pub fn contains(&self, pattern: &Value) -> bool {
        if self.ty.name != pattern.ty.name {
            return false;
        }
        match (&self.data, &pattern.data) {
            (Data::Scalar(a), Data::Scalar(b)) => a == b,
            (Data::Sequence(have), Data::Sequence(want)) => {
                have.iter().zip(want).all(|(h, w)| match (h, w) {
                    (_, None) => true,
                    (Some(h), Some(w)) => h.contains(w),
                    (None, Some(_)) => false,
                })
            }
            (Data::Array(have), Data::Array(want)) => {
                want.len() <= have.len() && have.iter().zip(want).all(|(h, w)| h.contains(w))
            }
            (Data::Choice(have), Data::Choice(want)) => match (have, want) {
                (_, None) => true,
                (Some((hi, h)), Some((wi, w))) => hi == wi && h.contains(w),
                (None, Some(_)) => false,
            },
            (Data::Tagged(have), Data::Tagged(want)) => match (have, want) {
                (_, None) => true,
                (Some(h), Some(w)) => h.contains(w),
                (None, Some(_)) => false,
            },
            _ => false,
        }
    }
}
