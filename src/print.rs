//! Render value trees in plain syntax.
//!
//! Layout: SEQUENCE and SEQUENCE OF open a brace, put each present component on
//! its own line indented two more columns than the opening line, and separate
//! components with `,`. CHOICE values print as `label:value`, tagged values as
//! `[APPLICATION n] value` (`[n]` for context tags).

use crate::error::{Error, Result};
use crate::types::Kind;
use crate::value::{Data, Scalar, Value};
use std::fmt::{self, Write};

/// How [`crate::codec::print`] lays out text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Column of the opening line; nested lines are indented relative to it.
    pub indent: usize,
    /// Maximum text length in symbols; `None` = unbounded.
    pub max_len: Option<usize>,
}

impl PrintOptions {
    pub fn with_max_len(max_len: usize) -> Self {
        PrintOptions {
            max_len: Some(max_len),
            ..Default::default()
        }
    }
}

const STEP: usize = 2;

/// Counts symbols instead of storing them.
#[derive(Default)]
pub(crate) struct Counter(pub usize);

impl Write for Counter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.chars().count();
        Ok(())
    }
}

pub(crate) struct Printer<'w, W: Write> {
    out: &'w mut W,
}

fn fmt_err(_: fmt::Error) -> Error {
    Error::OutOfMemory
}

/// True for a node that prints nothing: an unset CHOICE or empty tagged wrapper.
fn is_unset(v: &Value) -> bool {
    matches!(v.data, Data::Choice(None) | Data::Tagged(None))
}

impl<'w, W: Write> Printer<'w, W> {
    pub(crate) fn new(out: &'w mut W) -> Self {
        Printer { out }
    }

    fn put(&mut self, s: &str) -> Result<()> {
        self.out.write_str(s).map_err(fmt_err)
    }

    fn pad(&mut self, n: usize) -> Result<()> {
        write!(self.out, "{:n$}", "", n = n).map_err(fmt_err)
    }

    pub(crate) fn value(&mut self, v: &Value, indent: usize) -> Result<()> {
        match &v.data {
            Data::Sequence(slots) => {
                let entries = v.ty.entries();
                let present: Vec<(&str, &Value)> = slots
                    .iter()
                    .enumerate()
                    .filter_map(|(i, s)| {
                        let child = s.as_ref().filter(|c| !is_unset(c))?;
                        let label = entries?.by_index(i)?.label.as_str();
                        Some((label, child))
                    })
                    .collect();
                self.block(present.len(), indent, |p, i| {
                    let (label, child) = present[i];
                    p.put(label)?;
                    p.put(" ")?;
                    p.value(child, indent + STEP)
                })
            }
            Data::Array(items) => self.block(items.len(), indent, |p, i| p.value(&items[i], indent + STEP)),
            Data::Choice(Some((i, child))) => {
                let label = v
                    .ty
                    .entries()
                    .and_then(|e| e.by_index(*i))
                    .map(|e| e.label.as_str())
                    .unwrap_or_default();
                self.put(label)?;
                self.put(":")?;
                self.value(child, indent)
            }
            Data::Tagged(Some(inner)) => {
                write!(self.out, "{} ", v.ty.tag).map_err(fmt_err)?;
                self.value(inner, indent)
            }
            Data::Choice(None) | Data::Tagged(None) => Err(Error::IncompleteValue(format!(
                "{} has no value selected",
                v.name().unwrap_or(&v.ty.name)
            ))),
            Data::Scalar(s) => self.scalar(v, s),
        }
    }

    fn block<F>(&mut self, n: usize, indent: usize, mut item: F) -> Result<()>
    where
        F: FnMut(&mut Self, usize) -> Result<()>,
    {
        if n == 0 {
            return self.put("{ }");
        }
        self.put("{\n")?;
        for i in 0..n {
            self.pad(indent + STEP)?;
            item(self, i)?;
            self.put(if i + 1 < n { ",\n" } else { "\n" })?;
        }
        self.pad(indent)?;
        self.put("}")
    }

    fn scalar(&mut self, v: &Value, s: &Scalar) -> Result<()> {
        match s {
            Scalar::Integer(i) => match &v.ty.kind {
                Kind::Enumerated(_) => match v.ty.enum_name(*i) {
                    Some(name) => self.put(name),
                    None => write!(self.out, "{}", i).map_err(fmt_err),
                },
                _ => write!(self.out, "{}", i).map_err(fmt_err),
            },
            Scalar::Boolean(b) => self.put(if *b { "TRUE" } else { "FALSE" }),
            Scalar::Null => self.put("NULL"),
            Scalar::CharString(text) => {
                self.put("\"")?;
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        self.put("\\")?;
                    }
                    self.out.write_char(c).map_err(fmt_err)?;
                }
                self.put("\"")
            }
            Scalar::OctetString(bytes) => {
                self.put("'")?;
                for b in bytes {
                    write!(self.out, "{:02X} ", b).map_err(fmt_err)?;
                }
                self.put("'H")
            }
            Scalar::ObjectId(arcs) => {
                self.put("{")?;
                for a in arcs {
                    write!(self.out, " {}", a).map_err(fmt_err)?;
                }
                self.put(" }")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{base, entry, Tag, Type};

    fn render(v: &Value) -> String {
        let mut s = String::new();
        Printer::new(&mut s).value(v, 0).unwrap();
        s
    }

    #[test]
    fn octets_and_escapes() {
        let v = Value::with_scalar(&base::octet_string(), Scalar::OctetString(vec![0x0a, 0xff])).unwrap();
        assert_eq!(render(&v), "'0A FF 'H");
        let v = Value::with_scalar(&base::char_string(), Scalar::CharString("a\"b\\".into())).unwrap();
        assert_eq!(render(&v), r#""a\"b\\""#);
    }

    #[test]
    fn nested_layout() {
        let inner = Type::sequence("In", Tag::universal(16), vec![entry("a", &base::integer(), Tag::context(0))]).unwrap();
        let outer = Type::sequence(
            "Out",
            Tag::universal(16),
            vec![
                entry("n", &base::boolean(), Tag::context(0)),
                entry("in", &inner, Tag::context(1)),
            ],
        )
        .unwrap();
        let mut v = Value::new(&outer);
        v.write_bool(true, "n").unwrap();
        v.write_int(5, "in.a").unwrap();
        assert_eq!(render(&v), "{\n  n TRUE,\n  in {\n    a 5\n  }\n}");
    }

    #[test]
    fn counter_counts_symbols() {
        let mut c = Counter::default();
        write!(c, "h\u{e9}!").unwrap();
        assert_eq!(c.0, 3);
    }
}
