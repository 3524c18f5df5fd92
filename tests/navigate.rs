//! Path engine tests: lookups through tagged and CHOICE nodes, binary field
//! access, bound paths, traversal order and pattern containment.

use ndn_asn::types::{base, entry, Type};
use ndn_asn::{codec, ndn, Error, Path, Scalar, Segment, Syntax, Tag, TypeRef, Value};
use pretty_assertions::assert_eq;

/// `Outer { wrapped [APPLICATION 7] Inner, items SEQUENCE OF Inner, pick CHOICE { a Inner, b INTEGER } }`
fn outer() -> TypeRef {
    let inner = Type::sequence(
        "Inner",
        Tag::universal(16),
        vec![
            entry("n", &base::integer(), Tag::context(0)),
            entry("s", &base::char_string(), Tag::context(1)),
        ],
    )
    .unwrap();
    let wrapped = Type::tagged("Wrapped", Tag::application(7), &inner);
    let items = Type::sequence_of("Items", Tag::universal(16), &inner);
    let pick = Type::choice(
        "Pick",
        Tag::universal(16),
        vec![
            entry("a", &inner, Tag::context(0)),
            entry("b", &base::integer(), Tag::context(1)),
        ],
    )
    .unwrap();
    Type::sequence(
        "Outer",
        Tag::universal(16),
        vec![
            entry("wrapped", &wrapped, Tag::context(0)),
            entry("items", &items, Tag::context(1)),
            entry("pick", &pick, Tag::context(2)),
        ],
    )
    .unwrap()
}

fn filled() -> Value {
    let text = r#"{
      wrapped [APPLICATION 7] { n 1, s "one" },
      items { { n 10 }, { n 11 }, { n 12 } },
      pick a:{ n 5 }
    }"#;
    codec::parse_complete(text, &outer()).expect("parse")
}

#[test]
fn test_tagged_nodes_are_transparent() {
    let v = filled();
    assert_eq!(v.read_int("wrapped.n").unwrap(), 1);
    assert_eq!(v.retrieve_descendant("wrapped.s").unwrap().as_str(), Some("one"));
    assert_eq!(v.get_syntax("wrapped").unwrap(), Syntax::Tagged);
}

#[test]
fn test_choice_fall_through_is_tolerant_only() {
    let v = filled();
    assert_eq!(v.read_int("pick.n").unwrap(), 5);
    assert_eq!(v.read_int("pick.#a.n").unwrap(), 5);
    assert!(matches!(v.retrieve_descendant("pick.n"), Err(Error::WrongLabel { .. })));
    assert!(matches!(v.find_descendant("pick.#b"), Err(Error::OtherChoice { .. })));
    // Unknown labels are errors in both modes.
    assert!(matches!(v.find_descendant("pick.#zz"), Err(Error::WrongLabel { .. })));
    assert!(matches!(v.find_descendant("nothing"), Err(Error::WrongLabel { .. })));
}

#[test]
fn test_mutable_lookup_edits_in_place() {
    let mut v = filled();
    let item = v.find_descendant_mut("items.1").unwrap();
    item.write_string("eleven", "s").unwrap();
    v.retrieve_descendant_mut("pick.#a.n").unwrap().set_scalar(Scalar::Integer(6)).unwrap();
    assert_eq!(v.read_string("items.1.s").unwrap(), "eleven");
    assert_eq!(v.read_int("pick.#a.n").unwrap(), 6);
}

#[test]
fn test_indexed_access_with_negative_indices() {
    let mut v = filled();
    assert_eq!(v.read_indexed(-1, "items").unwrap().read_int("n").unwrap(), 12);
    assert_eq!(v.read_indexed(0, "items").unwrap().read_int("n").unwrap(), 10);
    assert!(v.read_indexed(3, "items").unwrap_err().is_incomplete());
    assert!(matches!(v.read_indexed(0, "pick"), Err(Error::WrongType(_))));

    let mut replacement = v.get_indexed(0, "items").unwrap();
    replacement.write_int(99, "n").unwrap();
    v.write_indexed(&replacement, -2, "items").unwrap();
    assert_eq!(v.read_int("items.1.n").unwrap(), 99);

    let wrong = Value::with_scalar(&base::integer(), Scalar::Integer(1)).unwrap();
    assert!(matches!(v.write_indexed(&wrong, 0, "items"), Err(Error::WrongType(_))));

    let tail = v.get_indexed(-1, "items").unwrap();
    v.insert_indexed(tail, -1, "items").unwrap();
    assert_eq!(v.get_length("items").unwrap(), 4);
    assert_eq!(v.read_int("items.3.n").unwrap(), 12);
}

#[test]
fn test_value_fields_are_big_endian() {
    let mut v = Value::new(&outer());
    v.write_value_field(&[0x12, 0x34], "pick.#b").unwrap();
    assert_eq!(v.read_int("pick.#b").unwrap(), 0x1234);

    let mut buf = [0u8; 4];
    assert_eq!(v.read_value_field(&mut buf, "pick").unwrap(), 4);
    assert_eq!(buf, [0, 0, 0x12, 0x34]);

    v.write_value_field(b"abc\0junk", "wrapped.s").unwrap();
    assert_eq!(v.read_string("wrapped.s").unwrap(), "abc");
    let mut small = [0u8; 3];
    assert!(matches!(
        v.read_value_field(&mut small, "wrapped.s"),
        Err(Error::Overflow { needed: 4, max: 3 })
    ));
    let mut exact = [0xffu8; 4];
    assert_eq!(v.read_value_field(&mut exact, "wrapped.s").unwrap(), 4);
    assert_eq!(&exact, b"abc\0");
}

#[test]
fn test_bound_paths() {
    let v = filled();
    let tmpl = Path::root().label("items").param().label("n");
    assert!(!tmpl.is_concrete());
    assert!(matches!(v.find_descendant(&tmpl), Err(Error::BadPath(_))));
    let total: i64 = (0..3)
        .map(|i| v.read_int(&tmpl.bind(&[i]).unwrap()).unwrap())
        .sum();
    assert_eq!(total, 33);
    assert!(tmpl.bind(&[]).is_err());
    assert!(tmpl.bind(&[0, 1]).is_err());
}

#[test]
fn test_path_text() {
    let p: Path = "pdus.0.#eth.length-type".parse().unwrap();
    assert_eq!(
        p.segments(),
        [
            Segment::Label("pdus".into()),
            Segment::Index(0),
            Segment::Variant("eth".into()),
            Segment::Label("length-type".into()),
        ]
    );
    assert_eq!(p.to_string(), "pdus.0.#eth.length-type");
    for bad in ["a..b", "#", "a.#", "a b", "."] {
        assert!(bad.parse::<Path>().is_err(), "{}", bad);
    }
    let v = filled();
    assert!(matches!(v.find_descendant("items..n"), Err(Error::BadPath(_))));
}

#[test]
fn test_walk_orders() {
    let mut v = filled();
    let mut pre = Vec::new();
    v.walk_depth(true, false, |p, _| {
        pre.push(p.to_string());
        Ok::<_, ()>(())
    })
    .unwrap();
    // The tagged wrapper and the value it holds share a path.
    assert_eq!(&pre[..5], ["", "wrapped", "wrapped", "wrapped.n", "wrapped.s"]);

    let mut post = Vec::new();
    v.visit(false, false, |p, _| {
        post.push(p.to_string());
        Ok::<_, ()>(())
    })
    .unwrap();
    assert_eq!(post.first().map(String::as_str), Some("wrapped.n"));
    assert_eq!(post.last().map(String::as_str), Some(""));
    assert_eq!(pre.len(), post.len());

    let leaves: Vec<String> = v.leaf_paths().iter().map(Path::to_string).collect();
    assert_eq!(
        leaves,
        ["wrapped.n", "wrapped.s", "items.0.n", "items.1.n", "items.2.n", "pick.#a.n"]
    );
}

#[test]
fn test_walk_stops_on_callback_error() {
    let mut v = filled();
    let mut seen = 0;
    let r = v.walk_depth(true, true, |p, _| {
        seen += 1;
        if p.to_string() == "items.1.n" {
            Err("stop")
        } else {
            Ok(())
        }
    });
    assert_eq!(r, Err("stop"));
    assert_eq!(seen, 4);
}

#[test]
fn test_contains_pattern() {
    let v = filled();
    let pattern = codec::parse_complete("{ items { { n 10 } }, pick a:{ } }", &outer()).unwrap();
    assert!(v.contains(&pattern));
    let other = codec::parse_complete("{ pick b:5 }", &outer()).unwrap();
    assert!(!v.contains(&other));
    assert!(v.contains(&Value::new(&outer())));
}

#[test]
fn test_detach_returns_the_subtree() {
    let mut v = filled();
    let detached = v.detach("pick.#a").unwrap().expect("present");
    assert_eq!(detached.read_int("n").unwrap(), 5);
    assert!(v.find_descendant("pick.#a").unwrap_err().is_incomplete());
    assert_eq!(v.detach("pick.#a").unwrap(), None);
    assert!(matches!(v.detach(""), Err(Error::BadPath(_))));

    let mut tmpl = Value::new(&ndn::registry().get("Traffic-Template").unwrap());
    tmpl.write_int(7, "pdus.0.#udp.src-port.#plain").unwrap();
    assert!(matches!(tmpl.detach("pdus.0.#tcp"), Err(Error::OtherChoice { .. })));
}

#[test]
fn test_tag_addressed_children() {
    let mut v = filled();

    // SEQUENCE field: replaced in place.
    let mut items = v.get_child(Tag::context(1)).expect("items").clone();
    items.remove_indexed(0, "").unwrap();
    v.put_child(items, Tag::context(1)).unwrap();
    assert_eq!(v.get_length("items").unwrap(), 2);
    assert_eq!(v.read_int("items.0.n").unwrap(), 11);

    // Tagged field: reachable by the wrapper's own tag only.
    let wrapped = v.get_child_mut(Tag::context(0)).expect("wrapped");
    assert!(wrapped.get_child_mut(Tag::application(9)).is_none());
    assert!(wrapped.get_child(Tag::application(9)).is_none());
    assert_eq!(
        wrapped.get_child_mut(Tag::application(7)).map(|inner| inner.read_int("n").unwrap()),
        Some(1)
    );

    // CHOICE: only the active variant is a child.
    let pick = v.get_child_mut(Tag::context(2)).expect("pick");
    assert!(pick.get_child(Tag::context(0)).is_some());
    assert!(pick.get_child(Tag::context(1)).is_none());

    let nine = Value::with_scalar(&base::integer(), Scalar::Integer(9)).unwrap();
    let before = pick.clone();
    let err = pick.put_child(nine.clone(), Tag::context(1)).unwrap_err();
    assert!(matches!(err, Error::DuplicateVariant { ref active, .. } if active == "a"), "{}", err);
    assert_eq!(*pick, before);

    pick.select_child(nine, Tag::context(1)).unwrap();
    assert_eq!(pick.active_variant(), Some("b"));
    assert!(pick.get_child(Tag::context(0)).is_none());
    let ten = Value::with_scalar(&base::integer(), Scalar::Integer(10)).unwrap();
    pick.put_child(ten, Tag::context(1)).unwrap();

    assert_eq!(v.read_int("pick.#b").unwrap(), 10);
}
