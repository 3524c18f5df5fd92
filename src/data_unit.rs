//! DATA-UNIT: the CHOICE wrapper around a protocol field that lets one schema
//! describe both what to send and what to accept.
//!
//! | Alternative | Send side | Receive side |
//! |-------------|-----------|--------------|
//! | `#plain` | exact value | exact match |
//! | `#range { first, last, mask }` | | `first <= v <= last`, or `v & mask == first & mask` when `mask != 0` |
//! | `#intervals { {b, e}, ... }` | | any `b <= v <= e` |
//! | `#enum { v, ... }` | | any listed value |
//! | `#mask { v, m, exact-len }` | | `data & m == v & m` byte-wise |
//! | `#script`, `#env` | computed by the caller | `Unsupported` |
//! | unset | protocol default | wildcard |
//!
//! [`DataUnit::read`] classifies a field, [`DataUnit::matches_int`] and
//! [`DataUnit::matches_bytes`] filter received data, and [`FlowSpec`] reads a
//! field the way a flow-rule compiler does (`spec` / `last` / `mask`).

use crate::error::{Error, Result};
use crate::path::{concrete, AsPath, Segment};
use crate::types::{base, entry, Kind, Primitive, SchemaError, Syntax, Tag, Type, TypeRef};
use crate::value::{Scalar, Value};
use byteorder::{BigEndian, ByteOrder};
use log::trace;
use once_cell::sync::Lazy;

/// PRIVATE tag numbers of the DATA-UNIT alternatives and their components.
pub mod tag {
    pub const PLAIN: u32 = 1;
    pub const SCRIPT: u32 = 2;
    pub const ENUM: u32 = 3;
    pub const MASK: u32 = 4;
    pub const INTERVALS: u32 = 5;
    pub const RANGE: u32 = 6;
    pub const ENV: u32 = 7;

    pub const INTERVAL_BEGIN: u32 = 1;
    pub const INTERVAL_END: u32 = 2;
    pub const MASK_VALUE: u32 = 1;
    pub const MASK_PATTERN: u32 = 2;
    pub const MASK_EXACT_LEN: u32 = 3;
    pub const RANGE_FIRST: u32 = 1;
    pub const RANGE_LAST: u32 = 2;
    pub const RANGE_MASK: u32 = 3;
    pub const ENV_NAME: u32 = 1;
    pub const ENV_TYPE: u32 = 2;
}

fn schema(r: std::result::Result<TypeRef, SchemaError>) -> TypeRef {
    r.unwrap_or_else(|e| panic!("built-in DATA-UNIT schema is malformed: {}", e))
}

static INTERVAL: Lazy<TypeRef> = Lazy::new(|| {
    schema(Type::sequence(
        "Interval",
        Tag::private(tag::INTERVALS),
        vec![
            entry("b", &base::integer(), Tag::private(tag::INTERVAL_BEGIN)),
            entry("e", &base::integer(), Tag::private(tag::INTERVAL_END)),
        ],
    ))
});

static INTERVALS: Lazy<TypeRef> =
    Lazy::new(|| Type::sequence_of("DATA-UNIT-intervals", Tag::private(tag::INTERVALS), &INTERVAL));

static MASK: Lazy<TypeRef> = Lazy::new(|| {
    schema(Type::sequence(
        "DATA-UNIT-mask",
        Tag::private(tag::MASK),
        vec![
            entry("v", &base::octet_string(), Tag::private(tag::MASK_VALUE)),
            entry("m", &base::octet_string(), Tag::private(tag::MASK_PATTERN)),
            entry("exact-len", &base::boolean(), Tag::private(tag::MASK_EXACT_LEN)),
        ],
    ))
});

static ENV_KIND: Lazy<TypeRef> = Lazy::new(|| {
    schema(Type::enumerated(
        "DATA-UNIT-env-type",
        Tag::universal(10),
        &[("string", 0), ("integer", 1)],
    ))
});

static ENV: Lazy<TypeRef> = Lazy::new(|| {
    schema(Type::sequence(
        "DATA-UNIT-env",
        Tag::private(tag::ENV),
        vec![
            entry("name", &base::char_string(), Tag::private(tag::ENV_NAME)),
            entry("type", &ENV_KIND, Tag::private(tag::ENV_TYPE)),
        ],
    ))
});

/// `DATA-UNIT-mask { v, m, exact-len }`, also used by payload descriptions.
pub fn mask_type() -> TypeRef {
    std::sync::Arc::clone(&MASK)
}

fn integer_like(ty: &Type) -> bool {
    matches!(
        ty.kind,
        Kind::Primitive(Primitive::Integer | Primitive::UInteger) | Kind::Enumerated(_)
    )
}

/// Build `DATA-UNIT(<base>)`. `#intervals` is offered for integer bases, `#mask` for
/// octet-string bases and `#range` when `with_range` is set.
pub fn data_unit_type(base_ty: &TypeRef, with_range: bool) -> std::result::Result<TypeRef, SchemaError> {
    let mut entries = vec![
        entry("plain", base_ty, Tag::private(tag::PLAIN)),
        entry("script", &base::char_string(), Tag::private(tag::SCRIPT)),
        entry(
            "enum",
            &Type::sequence_of(&format!("DATA-UNIT-enum({})", base_ty.name), Tag::private(tag::ENUM), base_ty),
            Tag::private(tag::ENUM),
        ),
    ];
    if base_ty.syntax() == Syntax::OctetString {
        entries.push(entry("mask", &MASK, Tag::private(tag::MASK)));
    }
    if integer_like(base_ty) {
        entries.push(entry("intervals", &INTERVALS, Tag::private(tag::INTERVALS)));
    }
    if with_range {
        let range = Type::sequence(
            &format!("DATA-UNIT-range({})", base_ty.name),
            Tag::private(tag::RANGE),
            vec![
                entry("first", base_ty, Tag::private(tag::RANGE_FIRST)),
                entry("last", base_ty, Tag::private(tag::RANGE_LAST)),
                entry("mask", base_ty, Tag::private(tag::RANGE_MASK)),
            ],
        )?;
        entries.push(entry("range", &range, Tag::private(tag::RANGE)));
    }
    entries.push(entry("env", &ENV, Tag::private(tag::ENV)));
    Type::choice(&format!("DATA-UNIT({})", base_ty.name), Tag::universal(16), entries)
}

/// Classified view of one DATA-UNIT field.
#[derive(Debug, Clone, Copy)]
pub enum DataUnit<'a> {
    Unset,
    Plain(&'a Value),
    Script(&'a str),
    Enum(&'a [Value]),
    Mask(&'a Value),
    Intervals(&'a Value),
    Range(&'a Value),
    Env(&'a Value),
}

impl<'a> DataUnit<'a> {
    /// Classify the DATA-UNIT at `path` under `container`; an absent field or an
    /// unset CHOICE is [`DataUnit::Unset`].
    pub fn read<P: AsPath + ?Sized>(container: &'a Value, path: &P) -> Result<DataUnit<'a>> {
        match container.find_descendant(path) {
            Ok(du) => DataUnit::of(du),
            Err(e) if e.is_incomplete() => Ok(DataUnit::Unset),
            Err(e) => Err(e),
        }
    }

    /// Classify a DATA-UNIT node.
    pub fn of(du: &'a Value) -> Result<DataUnit<'a>> {
        if du.syntax() != Syntax::Choice {
            return Err(Error::WrongType(format!("{} is not a DATA-UNIT", du.type_name())));
        }
        let (Some(label), Some(arm)) = (du.active_variant(), du.choice_value()) else {
            return Ok(DataUnit::Unset);
        };
        Ok(match label {
            "plain" => DataUnit::Plain(arm),
            "script" => DataUnit::Script(
                arm.as_str()
                    .ok_or_else(|| Error::WrongType("script is not a character string".into()))?,
            ),
            "enum" => DataUnit::Enum(arm.elements()),
            "mask" => DataUnit::Mask(arm),
            "intervals" => DataUnit::Intervals(arm),
            "range" => DataUnit::Range(arm),
            "env" => DataUnit::Env(arm),
            other => {
                return Err(Error::WrongType(format!(
                    "'{}' is not a DATA-UNIT alternative of {}",
                    other,
                    du.type_name()
                )))
            }
        })
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, DataUnit::Unset)
    }

    /// Exact value for generation: the `#plain` payload, if that is the active arm.
    pub fn plain(&self) -> Option<&'a Value> {
        match self {
            DataUnit::Plain(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a received integer `v` is accepted.
    pub fn matches_int(&self, v: i64) -> Result<bool> {
        let matched = match self {
            DataUnit::Unset => true,
            DataUnit::Plain(p) => int_of(p)? == v,
            DataUnit::Enum(items) => {
                let mut any = false;
                for item in items.iter() {
                    any |= int_of(item)? == v;
                }
                any
            }
            DataUnit::Intervals(list) => list.elements().iter().any(|iv| {
                match (iv.read_int("b"), iv.read_int("e")) {
                    (Ok(b), Ok(e)) => (b..=e).contains(&v),
                    _ => {
                        trace!("skipping incomplete interval");
                        false
                    }
                }
            }),
            DataUnit::Range(r) => {
                let first = r.read_int("first")?;
                let last = optional(r.read_int("last"))?.unwrap_or(first);
                let mask = optional(r.read_int("mask"))?.unwrap_or(0);
                (first..=last).contains(&v) || (mask != 0 && v & mask == first & mask)
            }
            DataUnit::Mask(_) => return Err(Error::Unsupported("mask filter on an integer field".into())),
            DataUnit::Script(_) | DataUnit::Env(_) => return Err(self.unsupported()),
        };
        Ok(matched)
    }

    /// Whether received field bytes are accepted. Integer DATA-UNITs decode `data`
    /// as a big-endian integer of its length (1, 2, 4 or 8 bytes).
    pub fn matches_bytes(&self, data: &[u8]) -> Result<bool> {
        let matched = match self {
            DataUnit::Unset => true,
            DataUnit::Plain(p) => match p.scalar() {
                Some(Scalar::Integer(_)) => return self.matches_int(be_int(data)?),
                _ => bytes_of(p)? == data,
            },
            DataUnit::Enum(items) => {
                let mut any = false;
                for item in items.iter() {
                    any |= match item.scalar() {
                        Some(Scalar::Integer(i)) => *i == be_int(data)?,
                        _ => bytes_of(item)? == data,
                    };
                }
                any
            }
            DataUnit::Mask(m) => match_mask(m, data)?,
            DataUnit::Intervals(_) => return self.matches_int(be_int(data)?),
            DataUnit::Range(r) => match r.find_descendant("first")?.scalar() {
                Some(Scalar::Integer(_)) => return self.matches_int(be_int(data)?),
                _ => {
                    let first = r.read_octets("first")?;
                    let last = optional(r.read_octets("last"))?.unwrap_or(first);
                    let in_range = data.len() == first.len() && first <= data && data <= last;
                    let masked = match optional(r.read_octets("mask"))? {
                        Some(mask) if mask.iter().any(|b| *b != 0) => {
                            data.len() == first.len()
                                && data
                                    .iter()
                                    .zip(first)
                                    .zip(mask)
                                    .all(|((d, f), m)| d & m == f & m)
                        }
                        _ => false,
                    };
                    in_range || masked
                }
            },
            DataUnit::Script(_) | DataUnit::Env(_) => return Err(self.unsupported()),
        };
        Ok(matched)
    }

    fn unsupported(&self) -> Error {
        let what = match self {
            DataUnit::Script(_) => "script",
            _ => "env",
        };
        Error::Unsupported(format!("{} DATA-UNIT cannot be matched", what))
    }
}

/// Treat `IncompleteValue` as "absent".
fn optional<T>(r: Result<T>) -> Result<Option<T>> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_incomplete() => Ok(None),
        Err(e) => Err(e),
    }
}

fn int_of(v: &Value) -> Result<i64> {
    v.as_int()
        .ok_or_else(|| Error::WrongType(format!("{} is not an integer", v.type_name())))
}

fn bytes_of(v: &Value) -> Result<&[u8]> {
    v.as_bytes()
        .ok_or_else(|| Error::WrongType(format!("{} is not a string", v.type_name())))
}

fn be_int(data: &[u8]) -> Result<i64> {
    Ok(match data.len() {
        1 => i64::from(data[0]),
        2 => i64::from(BigEndian::read_u16(data)),
        4 => i64::from(BigEndian::read_u32(data)),
        8 => BigEndian::read_i64(data),
        n => return Err(Error::WrongType(format!("cannot match {} bytes as an integer", n))),
    })
}

fn match_mask(m: &Value, data: &[u8]) -> Result<bool> {
    let value = m.read_octets("v")?;
    let mask = m.read_octets("m")?;
    let exact_len = optional(m.read_bool("exact-len"))?.unwrap_or(false);
    if exact_len && mask.len() != data.len() {
        trace!("mask length {} differs from data length {}", mask.len(), data.len());
        return Ok(false);
    }
    Ok(data
        .iter()
        .zip(mask)
        .zip(value)
        .all(|((d, m), v)| d & m == v & m))
}

/// A DATA-UNIT field read as a flow-rule item: `spec` plus `mask`, and `last` for
/// ranges. All three are big-endian byte strings of the requested width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSpec {
    pub spec: Vec<u8>,
    pub last: Option<Vec<u8>>,
    pub mask: Vec<u8>,
}

impl FlowSpec {
    /// Read the DATA-UNIT at `field` under `container` into `width`-byte buffers.
    ///
    /// `#plain` gives `spec = value`, `mask = all ones`; `#range` gives
    /// `spec = first`, `last`, `mask` (absent components stay zero / `None`).
    /// An absent or unset field yields `Ok(None)`: the item is unconstrained.
    pub fn read<P: AsPath + ?Sized>(container: &Value, field: &P, width: usize) -> Result<Option<FlowSpec>> {
        let field = concrete(field)?;
        let mut spec = vec![0u8; width];
        match container.read_value_field(&mut spec, &field.join(Segment::Variant("plain".into()))) {
            Ok(_) => {
                return Ok(Some(FlowSpec {
                    spec,
                    last: None,
                    mask: vec![0xff; width],
                }))
            }
            Err(Error::OtherChoice { .. }) => {}
            Err(e) if e.is_incomplete() => return Ok(None),
            Err(e) => return Err(e),
        }
        let range = field.join(Segment::Variant("range".into()));
        let read = |label: &str, buf: &mut Vec<u8>| -> Result<bool> {
            optional(container.read_value_field(buf, &range.join(Segment::Label(label.into()))))
                .map(|n| n.is_some())
        };
        read("first", &mut spec)?;
        let mut last = vec![0u8; width];
        let has_last = read("last", &mut last)?;
        let mut mask = vec![0u8; width];
        read("mask", &mut mask)?;
        Ok(Some(FlowSpec {
            spec,
            last: has_last.then_some(last),
            mask,
        }))
    }

    /// Whether `data` satisfies the item: masked equality with `spec`, or with a
    /// `last` bound, `spec & mask <= data & mask <= last & mask`.
    pub fn matches(&self, data: &[u8]) -> bool {
        let masked = |v: &[u8]| -> Vec<u8> { v.iter().zip(&self.mask).map(|(b, m)| b & m).collect() };
        let d = masked(data);
        let s = masked(&self.spec);
        match &self.last {
            None => d == s,
            Some(last) => s <= d && d <= masked(last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn du_int() -> TypeRef {
        data_unit_type(&base::integer(), true).unwrap()
    }

    fn holder() -> TypeRef {
        Type::sequence(
            "Holder",
            Tag::universal(16),
            vec![entry("f", &du_int(), Tag::context(0))],
        )
        .unwrap()
    }

    #[test]
    fn range_with_zero_mask_is_an_interval() {
        let mut v = Value::new(&holder());
        v.write_int(10, "f.#range.first").unwrap();
        v.write_int(20, "f.#range.last").unwrap();
        v.write_int(0, "f.#range.mask").unwrap();
        let du = DataUnit::read(&v, "f").unwrap();
        assert!(du.matches_int(15).unwrap());
        assert!(!du.matches_int(25).unwrap());
    }

    #[test]
    fn range_mask_accepts_outside_interval() {
        let mut v = Value::new(&holder());
        v.write_int(0x10, "f.#range.first").unwrap();
        v.write_int(0x1f, "f.#range.last").unwrap();
        v.write_int(0xf0, "f.#range.mask").unwrap();
        let du = DataUnit::read(&v, "f").unwrap();
        assert!(du.matches_int(0x13).unwrap());
        assert!(!du.matches_int(0x23).unwrap());
    }

    #[test]
    fn plain_matches_exactly() {
        let mut v = Value::new(&holder());
        v.write_int(7, "f.#plain").unwrap();
        let du = DataUnit::read(&v, "f").unwrap();
        assert!(du.matches_int(7).unwrap());
        assert!(!du.matches_int(8).unwrap());
        assert!(du.matches_bytes(&[0, 7]).unwrap());
    }

    #[test]
    fn absent_field_is_wildcard() {
        let v = Value::new(&holder());
        let du = DataUnit::read(&v, "f").unwrap();
        assert!(du.is_unset());
        assert!(du.matches_int(12345).unwrap());
    }

    #[test]
    fn script_is_unsupported() {
        let mut v = Value::new(&holder());
        v.write_string("rand()", "f.#script").unwrap();
        let du = DataUnit::read(&v, "f").unwrap();
        assert!(matches!(du.matches_int(1), Err(Error::Unsupported(_))));
    }

    #[test]
    fn mask_on_octets() {
        let ty = data_unit_type(&base::octet_string(), false).unwrap();
        let mut du = Value::new(&ty);
        du.write_octets(&[0x12, 0x30], "#mask.v").unwrap();
        du.write_octets(&[0xff, 0xf0], "#mask.m").unwrap();
        let unit = DataUnit::of(&du).unwrap();
        assert!(unit.matches_bytes(&[0x12, 0x3f]).unwrap());
        assert!(!unit.matches_bytes(&[0x13, 0x30]).unwrap());
        du.write_bool(true, "#mask.exact-len").unwrap();
        let unit = DataUnit::of(&du).unwrap();
        assert!(!unit.matches_bytes(&[0x12, 0x30, 0x00]).unwrap());
    }

    #[test]
    fn flow_spec_from_plain_and_range() {
        let mut v = Value::new(&holder());
        v.write_int(0x0800, "f.#plain").unwrap();
        let fs = FlowSpec::read(&v, "f", 2).unwrap().unwrap();
        assert_eq!(fs.spec, vec![0x08, 0x00]);
        assert_eq!(fs.mask, vec![0xff, 0xff]);
        assert_eq!(fs.last, None);

        let mut v = Value::new(&holder());
        v.write_int(100, "f.#range.first").unwrap();
        v.write_int(200, "f.#range.last").unwrap();
        let fs = FlowSpec::read(&v, "f", 2).unwrap().unwrap();
        assert_eq!(fs.spec, vec![0, 100]);
        assert_eq!(fs.last, Some(vec![0, 200]));
        assert_eq!(fs.mask, vec![0, 0]);

        assert_eq!(FlowSpec::read(&Value::new(&holder()), "f", 2).unwrap(), None);
    }
}
