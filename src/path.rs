//! Dot-paths addressing nodes of a value tree.
//!
//! Text form: segments joined by `.`; a decimal segment is an array index, a
//! segment starting with `#` selects (or requires) a CHOICE variant, anything else
//! is a field label. The empty string is the root.
//!
//! ```
//! use ndn_asn::path::{Path, Segment};
//!
//! let p: Path = "pdus.0.#eth.length-type".parse().unwrap();
//! assert_eq!(p.segments()[1], Segment::Index(0));
//!
//! // Index supplied by the caller at a fixed position.
//! let tmpl = Path::root().label("pdus").param().variant("tcp");
//! assert_eq!(tmpl.bind(&[2]).unwrap().to_string(), "pdus.2.#tcp");
//! ```

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// SEQUENCE field or CHOICE variant name.
    Label(String),
    /// SEQUENCE OF element index.
    Index(usize),
    /// `#name`: explicit CHOICE variant.
    Variant(String),
    /// Index placeholder, replaced by [`Path::bind`].
    Param,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Label(l) => f.write_str(l),
            Segment::Index(i) => write!(f, "{}", i),
            Segment::Variant(v) => write!(f, "#{}", v),
            Segment::Param => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Path::default()
    }

    pub fn label(mut self, label: &str) -> Self {
        self.segments.push(Segment::Label(label.to_string()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn variant(mut self, name: &str) -> Self {
        self.segments.push(Segment::Variant(name.to_string()));
        self
    }

    pub fn param(mut self) -> Self {
        self.segments.push(Segment::Param);
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Parent path and last segment; `None` for the root.
    pub fn split_last(&self) -> Option<(Path, &Segment)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            Path {
                segments: rest.to_vec(),
            },
            last,
        ))
    }

    pub fn join(&self, segment: Segment) -> Path {
        let mut p = self.clone();
        p.push(segment);
        p
    }

    /// True when no `Param` placeholder is left.
    pub fn is_concrete(&self) -> bool {
        !self.segments.contains(&Segment::Param)
    }

    /// Substitute `args` into the `Param` placeholders, in order.
    pub fn bind(&self, args: &[usize]) -> Result<Path> {
        let mut args_iter = args.iter();
        let mut segments = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg {
                Segment::Param => {
                    let i = args_iter
                        .next()
                        .ok_or_else(|| Error::BadPath(format!("'{}': too few arguments", self)))?;
                    segments.push(Segment::Index(*i));
                }
                other => segments.push(other.clone()),
            }
        }
        if args_iter.next().is_some() {
            return Err(Error::BadPath(format!("'{}': too many arguments", self)));
        }
        Ok(Path { segments })
    }
}

fn parse_segment(text: &str, whole: &str) -> Result<Segment> {
    let bad = || Error::BadPath(format!("'{}': bad segment '{}'", whole, text));
    if let Some(name) = text.strip_prefix('#') {
        if name.is_empty() || !name.chars().all(label_char) {
            return Err(bad());
        }
        return Ok(Segment::Variant(name.to_string()));
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().map(Segment::Index).map_err(|_| bad());
    }
    if text.is_empty() || !text.chars().all(label_char) {
        return Err(bad());
    }
    Ok(Segment::Label(text.to_string()))
}

fn label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Path::root());
        }
        let segments = s
            .split('.')
            .map(|seg| parse_segment(seg, s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Path { segments })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path { segments }
    }
}

/// Anything a path operation accepts: a [`Path`] or its text form.
pub trait AsPath {
    fn as_path(&self) -> Result<Cow<'_, Path>>;
}

impl AsPath for Path {
    fn as_path(&self) -> Result<Cow<'_, Path>> {
        Ok(Cow::Borrowed(self))
    }
}

impl AsPath for str {
    fn as_path(&self) -> Result<Cow<'_, Path>> {
        self.parse().map(Cow::Owned)
    }
}

impl AsPath for String {
    fn as_path(&self) -> Result<Cow<'_, Path>> {
        self.as_str().as_path()
    }
}

/// Resolve `path` to a concrete [`Path`] (no `Param` left).
pub(crate) fn concrete<P: AsPath + ?Sized>(path: &P) -> Result<Cow<'_, Path>> {
    let p = path.as_path()?;
    if !p.is_concrete() {
        return Err(Error::BadPath(format!("'{}': unbound parameter", p)));
    }
    Ok(p)
}
