//! Plain-syntax tests: literal forms, layout, error positions and size checks.

use ndn_asn::codec::{self, PrintOptions};
use ndn_asn::types::{base, entry, Type};
use ndn_asn::{Error, Path, Scalar, Tag, TypeRef, Value};
use pretty_assertions::assert_eq;

/// A schema touching every literal form.
fn sample() -> TypeRef {
    let colour = Type::enumerated("Colour", Tag::universal(10), &[("red", 0), ("green", 1), ("blue", 7)]).unwrap();
    let id = Type::tagged("Ident", Tag::application(3), &base::integer());
    let note = Type::tagged("Note", Tag::context(5), &base::char_string());
    let kind = Type::choice(
        "Kind",
        Tag::universal(16),
        vec![
            entry("none", &base::null(), Tag::context(0)),
            entry("count", &base::integer(), Tag::context(1)),
            entry("name", &base::char_string(), Tag::context(2)),
        ],
    )
    .unwrap();
    let numbers = Type::sequence_of("Numbers", Tag::universal(16), &base::integer());
    Type::sequence(
        "Sample",
        Tag::universal(16),
        vec![
            entry("flag", &base::boolean(), Tag::context(0)),
            entry("colour", &colour, Tag::context(1)),
            entry("id", &id, Tag::context(2)),
            entry("note", &note, Tag::context(3)),
            entry("oid", &base::object_id(), Tag::context(4)),
            entry("kind", &kind, Tag::context(5)),
            entry("numbers", &numbers, Tag::context(6)),
            entry("raw", &base::octet_string(), Tag::context(7)),
            entry("empty", &base::null(), Tag::context(8)),
        ],
    )
    .unwrap()
}

fn kind_type(sample: &TypeRef) -> TypeRef {
    let path: Path = "kind".parse().unwrap();
    sample.subtype(&path).unwrap()
}

const FULL: &str = r#"{
  flag TRUE,
  colour blue,
  id [APPLICATION 3] 42,
  note [5] "say \"hi\"",
  oid { 1 3 6 1 },
  kind count:-3,
  numbers {
    1,
    2,
    3
  },
  raw '01 AB 'H,
  empty NULL
}"#;

#[test]
fn test_literal_forms() {
    let v = codec::parse_complete(FULL, &sample()).expect("parse");
    assert_eq!(v.read_bool("flag").unwrap(), true);
    assert_eq!(v.read_int("colour").unwrap(), 7);
    assert_eq!(v.read_int("id").unwrap(), 42);
    assert_eq!(v.read_string("note").unwrap(), "say \"hi\"");
    assert_eq!(v.read_oid("oid").unwrap(), [1, 3, 6, 1]);
    assert_eq!(v.get_choice("kind").unwrap(), "count");
    assert_eq!(v.read_int("kind.#count").unwrap(), -3);
    assert_eq!(v.get_length("numbers").unwrap(), 3);
    assert_eq!(v.read_octets("raw").unwrap(), [0x01, 0xab]);
    assert_eq!(v.read_field("empty").unwrap(), &Scalar::Null);
}

#[test]
fn test_canonical_print_is_stable() {
    let v = codec::parse_complete(FULL, &sample()).expect("parse");
    let text = codec::to_text(&v).expect("print");
    assert_eq!(text, FULL);
    assert_eq!(codec::to_text(&codec::parse_complete(&text, &sample()).unwrap()).unwrap(), text);
}

#[test]
fn test_enumerated_accepts_numbers_and_prints_names() {
    let text = "{ colour 1 }";
    let v = codec::parse_complete(text, &sample()).unwrap();
    assert_eq!(codec::to_text(&v).unwrap(), "{\n  colour green\n}");
    let err = codec::parse_complete("{ colour purple }", &sample()).unwrap_err();
    assert_eq!(err.consumed(), Some(9));
}

#[test]
fn test_tagged_value_checks_its_tag() {
    let v = codec::parse_complete("{ id 42 }", &sample()).expect("untagged literal");
    assert_eq!(v.read_int("id").unwrap(), 42);
    let err = codec::parse_complete("{ id [APPLICATION 4] 42 }", &sample()).unwrap_err();
    assert!(matches!(err, Error::Parse { consumed: 5, .. }), "{}", err);
}

#[test]
fn test_unset_fields_are_omitted() {
    let ty = sample();
    let mut v = Value::new(&ty);
    assert_eq!(codec::to_text(&v).unwrap(), "{ }");
    v.write_int(3, "numbers.0").unwrap();
    let kind = kind_type(&ty);
    v.write_component(&Value::new(&kind), "kind").unwrap();
    assert_eq!(codec::to_text(&v).unwrap(), "{\n  numbers {\n    3\n  }\n}");
}

#[test]
fn test_unset_choice_cannot_be_printed_alone() {
    let v = Value::new(&kind_type(&sample()));
    assert!(matches!(codec::to_text(&v), Err(Error::IncompleteValue(_))));
    assert!(codec::estimate_text_length(&v, &PrintOptions::default()).unwrap_err().is_incomplete());
}

#[test]
fn test_comments_and_whitespace() {
    let text = "# leading comment\n{ flag FALSE, # trailing\n  kind none:NULL }\n# end\n";
    let v = codec::parse_complete(text, &sample()).expect("parse");
    assert_eq!(v.read_bool("flag").unwrap(), false);
    assert_eq!(v.get_choice("kind").unwrap(), "none");
}

#[test]
fn test_parse_reports_consumed_symbols() {
    let (_, n) = codec::parse("{ flag TRUE }, next", &sample()).unwrap();
    assert_eq!(n, 13);
    let (v, n) = codec::parse("{ kind name:\"\u{1F600}\" } rest", &sample()).unwrap();
    assert_eq!(n, 17);
    assert_eq!(v.read_string("kind.#name").unwrap(), "\u{1F600}");
}

#[test]
fn test_syntax_errors() {
    let ty = sample();
    let cases = [
        ("{ flag TRUE, flag FALSE }", 13),
        ("{ flag 1 }", 7),
        ("{ raw '0 'H }", 6),
        ("{ kind other:1 }", 7),
        ("{ flag TRUE", 11),
        ("{ flag TRUE flag FALSE }", 12),
        ("flag TRUE", 0),
    ];
    for (text, at) in cases {
        let err = codec::parse(text, &ty).unwrap_err();
        assert_eq!(err.consumed(), Some(at), "{}: {}", text, err);
    }
    let err = codec::parse("{ flag TRUE", &ty).unwrap_err();
    assert!(err.to_string().contains("'}'"), "{}", err);
}

#[test]
fn test_estimate_matches_print() {
    let v = codec::parse_complete(FULL, &sample()).unwrap();
    for indent in [0, 3] {
        let opts = PrintOptions { indent, max_len: None };
        let text = codec::print(&v, &opts).unwrap();
        assert_eq!(codec::estimate_text_length(&v, &opts).unwrap(), text.chars().count());
    }
    let long = codec::print(&v, &PrintOptions { indent: 3, max_len: None }).unwrap();
    assert!(long.ends_with("\n   }"));
}
