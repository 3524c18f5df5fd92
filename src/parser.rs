//! Parse plain-syntax text into a [`Value`] of an expected type using PEST.
//!
//! The grammar (`grammar.pest`) only knows the lexical shapes (braces, `label:value`,
//! literals); which shape is legal where comes from the expected [`Type`], so the
//! builder below walks the pest tree and the type side by side.
//!
//! Positions are reported as *symbols*: Unicode scalar values from the start of
//! the input, not bytes.

use crate::error::{Error, Result};
use crate::types::{Kind, Primitive, TagClass, Type, TypeRef};
use crate::value::{Scalar, Value};
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct PlainParser;

/// Symbols in `source` before byte offset `pos`.
fn symbols(source: &str, pos: usize) -> usize {
    source.get(..pos).map_or(pos, |s| s.chars().count())
}

fn syntax_error(source: &str, e: pest::error::Error<Rule>) -> Error {
    let pos = match e.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((s, _)) => s,
    };
    let message = match &e.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            format!("expected {}", rule_list(positives))
        }
        pest::error::ErrorVariant::CustomError { message } => message.clone(),
        _ => "syntax error".to_string(),
    };
    Error::parse(symbols(source, pos), message)
}

fn rule_list(rules: &[Rule]) -> String {
    let mut names: Vec<&str> = rules
        .iter()
        .map(|r| match r {
            Rule::value | Rule::item => "value",
            Rule::named_item => "labelled value",
            Rule::ident => "identifier",
            Rule::integer => "integer",
            Rule::char_string => "character string",
            Rule::oct_string => "octet string",
            Rule::comma => "','",
            Rule::close => "'}'",
            Rule::EOI => "end of input",
            _ => "token",
        })
        .collect();
    names.dedup();
    names.join(" or ")
}

/// Parse the leading value of `source` as `ty`; returns the value and the number
/// of symbols it spans (trailing text is not examined).
pub fn parse_value(source: &str, ty: &TypeRef) -> Result<(Value, usize)> {
    parse_rule(source, ty, Rule::document)
}

/// Like [`parse_value`], but only whitespace and comments may follow the value.
pub fn parse_complete(source: &str, ty: &TypeRef) -> Result<(Value, usize)> {
    parse_rule(source, ty, Rule::complete)
}

fn parse_rule(source: &str, ty: &TypeRef, rule: Rule) -> Result<(Value, usize)> {
    let mut pairs = PlainParser::parse(rule, source).map_err(|e| syntax_error(source, e))?;
    let top = pairs.next().ok_or_else(|| Error::parse(0, "empty input"))?;
    let value_pair = top
        .into_inner()
        .find(|p| p.as_rule() == Rule::value)
        .ok_or_else(|| Error::parse(0, "missing value"))?;
    let end = value_pair.as_span().end();
    let builder = Builder { source };
    let value = builder.build(value_pair, ty)?;
    Ok((value, symbols(source, end)))
}

struct Builder<'s> {
    source: &'s str,
}

impl<'s> Builder<'s> {
    fn error(&self, pair: &Pair<'_, Rule>, message: impl Into<String>) -> Error {
        Error::parse(symbols(self.source, pair.as_span().start()), message)
    }

    fn expected(&self, pair: &Pair<'_, Rule>, what: &str, ty: &Type) -> Error {
        self.error(
            pair,
            format!("expected {} for {}, found '{}'", what, ty.name, snippet(pair.as_str())),
        )
    }

    /// `pair` is a `value` rule (or directly one of its alternatives).
    fn build(&self, pair: Pair<'_, Rule>, ty: &TypeRef) -> Result<Value> {
        let pair = unwrap_value(pair);
        match &ty.kind {
            Kind::Tagged(inner) => self.build_tagged(pair, ty, inner),
            Kind::Sequence(_) => self.build_sequence(pair, ty),
            Kind::SequenceOf(el) => self.build_sequence_of(pair, ty, el),
            Kind::Choice(_) => self.build_choice(pair, ty),
            Kind::Enumerated(_) => self.build_enumerated(pair, ty),
            Kind::Primitive(p) => self.build_primitive(pair, ty, *p),
        }
    }

    fn build_tagged(&self, pair: Pair<'_, Rule>, ty: &TypeRef, inner_ty: &TypeRef) -> Result<Value> {
        let mut v = Value::new(ty);
        let inner_pair = if pair.as_rule() == Rule::tagged {
            let mut it = pair.clone().into_inner();
            let tag_pair = it.next().ok_or_else(|| self.error(&pair, "missing tag"))?;
            self.check_tag(&tag_pair, ty)?;
            it.next().ok_or_else(|| self.error(&pair, "missing tagged value"))?
        } else {
            pair
        };
        let inner = self.build(inner_pair, inner_ty)?;
        v.select_child(inner, ty.tag)?;
        Ok(v)
    }

    fn check_tag(&self, tag_pair: &Pair<'_, Rule>, ty: &Type) -> Result<()> {
        let mut class = TagClass::ContextSpecific;
        let mut number = None;
        for p in tag_pair.clone().into_inner() {
            match p.as_rule() {
                Rule::tag_class => {
                    class = TagClass::from_keyword(p.as_str())
                        .ok_or_else(|| self.error(&p, "unknown tag class"))?;
                }
                Rule::integer => {
                    number = Some(
                        p.as_str()
                            .parse::<u32>()
                            .map_err(|_| self.error(&p, "bad tag number"))?,
                    );
                }
                _ => {}
            }
        }
        if number != Some(ty.tag.number) || class != ty.tag.class {
            return Err(self.error(
                tag_pair,
                format!("tag {} does not match {} {}", tag_pair.as_str(), ty.name, ty.tag),
            ));
        }
        Ok(())
    }

    fn build_sequence(&self, pair: Pair<'_, Rule>, ty: &TypeRef) -> Result<Value> {
        if pair.as_rule() != Rule::braced {
            return Err(self.expected(&pair, "'{'", ty));
        }
        let mut v = Value::new(ty);
        let mut seen = vec![false; ty.entries().map_or(0, |e| e.len())];
        for item in items(pair) {
            let named = item
                .clone()
                .into_inner()
                .next()
                .filter(|p| p.as_rule() == Rule::named_item)
                .ok_or_else(|| self.expected(&item, "'label value'", ty))?;
            let mut it = named.clone().into_inner();
            let label = it.next().ok_or_else(|| self.error(&named, "missing label"))?;
            let body = it.next().ok_or_else(|| self.error(&named, "missing value"))?;
            let (index, entry) = ty.entry_by_label(label.as_str()).ok_or_else(|| {
                self.error(&label, format!("'{}' is not a field of {}", label.as_str(), ty.name))
            })?;
            if std::mem::replace(&mut seen[index], true) {
                return Err(self.error(&label, format!("field '{}' given twice", label.as_str())));
            }
            let child = self.build(body, &entry.ty)?;
            v.put_by_index(index, child);
        }
        Ok(v)
    }

    fn build_sequence_of(&self, pair: Pair<'_, Rule>, ty: &TypeRef, el: &TypeRef) -> Result<Value> {
        let mut v = Value::new(ty);
        match pair.as_rule() {
            Rule::braced => {
                for item in items(pair) {
                    let inner = item
                        .clone()
                        .into_inner()
                        .next()
                        .ok_or_else(|| self.error(&item, "empty item"))?;
                    if inner.as_rule() == Rule::named_item {
                        return Err(self.expected(&item, "an element value", ty));
                    }
                    v.push(self.build(inner, el)?)?;
                }
            }
            // `{1 2 3}` lexes as an object id; as an array it is a list of integers.
            Rule::oid => {
                for arc in pair.into_inner() {
                    v.push(self.build(arc, el)?)?;
                }
            }
            _ => return Err(self.expected(&pair, "'{'", ty)),
        }
        Ok(v)
    }

    fn build_choice(&self, pair: Pair<'_, Rule>, ty: &TypeRef) -> Result<Value> {
        if pair.as_rule() != Rule::choice_value {
            return Err(self.expected(&pair, "'label:value'", ty));
        }
        let mut it = pair.clone().into_inner();
        let label = it.next().ok_or_else(|| self.error(&pair, "missing label"))?;
        let body = it.next().ok_or_else(|| self.error(&pair, "missing value"))?;
        let (index, entry) = ty.entry_by_label(label.as_str()).ok_or_else(|| {
            self.error(&label, format!("'{}' is not a variant of {}", label.as_str(), ty.name))
        })?;
        let child = self.build(body, &entry.ty)?;
        let mut v = Value::new(ty);
        v.put_by_index(index, child);
        Ok(v)
    }

    fn build_enumerated(&self, pair: Pair<'_, Rule>, ty: &TypeRef) -> Result<Value> {
        let n = match pair.as_rule() {
            Rule::ident => ty.enum_value(pair.as_str()).ok_or_else(|| {
                self.error(&pair, format!("'{}' is not a value of {}", pair.as_str(), ty.name))
            })?,
            Rule::integer => self.integer(&pair)?,
            _ => return Err(self.expected(&pair, "an enumeration name", ty)),
        };
        self.leaf(&pair, ty, Scalar::Integer(n))
    }

    fn build_primitive(&self, pair: Pair<'_, Rule>, ty: &TypeRef, p: Primitive) -> Result<Value> {
        let scalar = match (p, pair.as_rule()) {
            (Primitive::Integer | Primitive::UInteger, Rule::integer) => Scalar::Integer(self.integer(&pair)?),
            (Primitive::Boolean, Rule::true_kw) => Scalar::Boolean(true),
            (Primitive::Boolean, Rule::false_kw) => Scalar::Boolean(false),
            (Primitive::Null, Rule::null_kw) => Scalar::Null,
            (Primitive::CharString, Rule::char_string) => Scalar::CharString(self.char_string(&pair)?),
            (Primitive::OctetString, Rule::oct_string) => Scalar::OctetString(self.octets(&pair)?),
            (Primitive::ObjectId, Rule::oid | Rule::braced) => Scalar::ObjectId(self.oid(&pair)?),
            (_, _) => {
                let what = match p {
                    Primitive::Integer | Primitive::UInteger => "an integer",
                    Primitive::Boolean => "TRUE or FALSE",
                    Primitive::Null => "NULL",
                    Primitive::CharString => "a quoted string",
                    Primitive::OctetString => "'..'H",
                    Primitive::ObjectId => "an object identifier",
                };
                return Err(self.expected(&pair, what, ty));
            }
        };
        self.leaf(&pair, ty, scalar)
    }

    fn leaf(&self, pair: &Pair<'_, Rule>, ty: &TypeRef, scalar: Scalar) -> Result<Value> {
        Value::with_scalar(ty, scalar).map_err(|e| self.error(pair, e.to_string()))
    }

    fn integer(&self, pair: &Pair<'_, Rule>) -> Result<i64> {
        pair.as_str()
            .parse::<i64>()
            .map_err(|e| self.error(pair, format!("bad integer '{}': {}", pair.as_str(), e)))
    }

    fn char_string(&self, pair: &Pair<'_, Rule>) -> Result<String> {
        let body = pair
            .clone()
            .into_inner()
            .next()
            .map_or("", |p| p.as_str());
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(e) => out.push(e),
                    None => return Err(self.error(pair, "dangling escape")),
                }
            } else {
                out.push(c);
            }
        }
        Ok(out)
    }

    fn octets(&self, pair: &Pair<'_, Rule>) -> Result<Vec<u8>> {
        let body = pair
            .clone()
            .into_inner()
            .next()
            .map_or("", |p| p.as_str());
        let digits: Vec<u8> = body.bytes().filter(u8::is_ascii_hexdigit).collect();
        if digits.len() % 2 != 0 {
            return Err(self.error(pair, "odd number of hex digits"));
        }
        Ok(digits
            .chunks_exact(2)
            .map(|d| (hex_val(d[0]) << 4) | hex_val(d[1]))
            .collect())
    }

    fn oid(&self, pair: &Pair<'_, Rule>) -> Result<Vec<u32>> {
        let mut arcs = Vec::new();
        for p in pair.clone().into_inner() {
            let p = match p.as_rule() {
                Rule::comma | Rule::close => continue,
                Rule::item => unwrap_value(p.into_inner().next().ok_or_else(|| self.error(pair, "empty arc"))?),
                _ => p,
            };
            if p.as_rule() != Rule::integer {
                return Err(self.error(&p, "object identifier arcs must be integers"));
            }
            arcs.push(p.as_str().parse::<u32>().map_err(|_| self.error(&p, "bad arc"))?);
        }
        Ok(arcs)
    }
}

/// The `item` children of a `braced` pair, without separators.
fn items<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| p.as_rule() == Rule::item)
}

/// Strip the `value` wrapper to get at the alternative that matched.
fn unwrap_value(pair: Pair<'_, Rule>) -> Pair<'_, Rule> {
    if pair.as_rule() == Rule::value {
        let fallback = pair.clone();
        pair.into_inner().next().unwrap_or(fallback)
    } else {
        pair
    }
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

fn snippet(s: &str) -> String {
    let mut out: String = s.chars().take(24).collect();
    if s.chars().count() > 24 {
        out.push_str("...");
    }
    out
}
