//! Integration tests: parse NDN literals against registered types, navigate and
//! edit them, match received fields through DATA-UNITs, print and persist.

use ndn_asn::codec::{self, PrintOptions};
use ndn_asn::data_unit::DataUnit;
use ndn_asn::{ndn, Error, FlowSpec, Scalar, Syntax, TypeRef, Value};
use pretty_assertions::assert_eq;

const RAW_PACKET: &str = r#"
{
  received { seconds 1700000000, micro-seconds 250 },
  pdus {
    tcp:{ src-port plain:27103, dst-port plain:80, flags plain:18 },
    ip4:{ src-addr plain:'0A 00 00 01 'H, protocol plain:6 },
    eth:{ length-type plain:2048 }
  },
  payload bytes:'DE AD BE EF 'H
}
"#;

const PATTERN: &str = r#"
{
  {
    pdus {
      tcp:{ dst-port range:{ first 1024, last 65535 }, flags intervals:{ { b 16, e 18 }, { b 2, e 2 } } },
      ip4:{ dst-addr range:{ first '0A 00 00 00 'H, mask 'FF FF FF 00 'H } },
      eth:{ }
    },
    actions { no-report:NULL }
  }
}
"#;

fn ty(name: &str) -> TypeRef {
    ndn::registry()
        .get(name)
        .unwrap_or_else(|| panic!("type {} is not registered", name))
}

fn raw_packet() -> Value {
    codec::parse_complete(RAW_PACKET, &ty("Raw-Packet")).expect("parse raw packet")
}

#[test]
fn test_tcp_csap_local_port() {
    let (v, consumed) = codec::parse(
        "{ local-port plain:27103, remote-port plain:27104 }",
        &ty("TCP-CSAP"),
    )
    .expect("parse");
    assert_eq!(consumed, 51);
    let port = v.find_descendant("local-port.#plain").expect("find");
    assert_eq!(port.as_int(), Some(27103));
    assert_eq!(v.read_int("remote-port.#plain").unwrap(), 27104);
}

#[test]
fn test_raw_packet_strict_paths() {
    let v = raw_packet();
    let tcp = v.retrieve_descendant("pdus.0.#tcp").expect("tcp pdu");
    assert_eq!(tcp.type_name(), "TCP-Header");
    let lt = v
        .retrieve_descendant("pdus.2.#eth.length-type.#plain")
        .expect("length-type");
    assert_eq!(lt.as_int(), Some(2048));
    assert_eq!(v.get_length("pdus").unwrap(), 3);
    assert_eq!(v.get_choice("pdus.1").unwrap(), "ip4");
    assert_eq!(v.read_octets("payload.#bytes").unwrap(), [0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn test_strict_lookup_rejects_what_tolerant_lookup_resolves() {
    let v = raw_packet();
    // Label that is not a variant: tolerant lookup descends into the active one.
    assert_eq!(v.read_int("pdus.0.src-port.#plain").unwrap(), 27103);
    assert!(matches!(
        v.retrieve_descendant("pdus.0.src-port"),
        Err(Error::WrongLabel { .. })
    ));
    // Named variant that is not active.
    assert!(matches!(
        v.find_descendant("pdus.0.#udp"),
        Err(Error::OtherChoice { ref active, .. }) if active == "tcp"
    ));
    assert!(matches!(
        v.retrieve_descendant("pdus.0.#udp"),
        Err(Error::WrongLabel { .. })
    ));
    // Absent field.
    assert!(matches!(
        v.find_descendant("pdus.0.#tcp.seqn"),
        Err(Error::IncompleteValue(_))
    ));
    assert!(matches!(
        v.retrieve_descendant("pdus.0.#tcp.seqn"),
        Err(Error::WrongLabel { .. })
    ));
}

#[test]
fn test_free_subvalue_then_lookup() {
    let mut v = raw_packet();
    v.free_subvalue("pdus.1").expect("free");
    assert_eq!(v.get_length("pdus").unwrap(), 2);
    assert_eq!(v.get_choice("pdus.0").unwrap(), "tcp");
    assert_eq!(v.get_choice("pdus.1").unwrap(), "eth");
    assert_eq!(v.read_int("pdus.1.#eth.length-type.#plain").unwrap(), 2048);
    v.free_subvalue("pdus.1").expect("free");
    assert_eq!(v.get_length("pdus").unwrap(), 1);
    assert!(matches!(
        v.find_descendant("pdus.1"),
        Err(Error::IncompleteValue(_))
    ));
    assert!(matches!(
        v.retrieve_descendant("pdus.1"),
        Err(Error::WrongLabel { .. })
    ));
    // Freeing an absent node is a no-op.
    v.free_subvalue("pdus.5").expect("free absent");
    v.free_subvalue("received").expect("free field");
    assert!(v.find_descendant("received").unwrap_err().is_incomplete());
}

#[test]
fn test_choice_holds_one_variant() {
    let mut tmpl = Value::new(&ty("Traffic-Template"));
    tmpl.write_int(5000, "pdus.0.#tcp.src-port.#plain").unwrap();
    tmpl.write_int(64, "pdus.1.#ip4.time-to-live.#plain").unwrap();
    assert_eq!(tmpl.get_choice("pdus.0").unwrap(), "tcp");

    tmpl.write_int(53, "pdus.0.#udp.dst-port.#plain").unwrap();
    assert_eq!(tmpl.get_choice("pdus.0").unwrap(), "udp");
    assert!(matches!(
        tmpl.find_descendant("pdus.0.#tcp"),
        Err(Error::OtherChoice { .. })
    ));
    assert!(tmpl.find_descendant("pdus.0.#udp.src-port").unwrap_err().is_incomplete());

    // Appending past the end is rejected; the slot right after the last is created.
    assert!(matches!(
        tmpl.write_int(1, "pdus.5.#eth.length-type.#plain"),
        Err(Error::WrongLabel { .. })
    ));
    tmpl.write_int(0x0800, "pdus.2.#eth.length-type.#plain").unwrap();
    assert_eq!(tmpl.get_length("pdus").unwrap(), 3);
}

#[test]
fn test_failed_write_leaves_tree_unchanged() {
    let mut tmpl = Value::new(&ty("Traffic-Template"));
    tmpl.write_int(5000, "pdus.0.#tcp.src-port.#plain").unwrap();
    let before = tmpl.clone();

    // Unknown field under a variant that is not the active one.
    assert!(matches!(
        tmpl.write_int(1, "pdus.0.#udp.bogus"),
        Err(Error::WrongLabel { .. })
    ));
    // Payload kind that does not fit the leaf, in a slot that does not exist yet.
    assert!(matches!(
        tmpl.write_field(Scalar::CharString("x".into()), "pdus.1.#ip4.protocol.#plain"),
        Err(Error::WrongType(_))
    ));
    assert!(matches!(
        tmpl.write_octets(&[10, 0, 0, 1, 5], "pdus.1.#ip4.src-addr.#plain"),
        Err(Error::Overflow { needed: 5, max: 4 })
    ));
    assert!(matches!(
        tmpl.write_value_field(&[1, 2, 3], "pdus.0.#udp.src-port.#plain"),
        Err(Error::WrongType(_))
    ));
    assert!(matches!(
        tmpl.write_component(&raw_packet(), "pdus.1"),
        Err(Error::WrongType(_))
    ));
    let pdu = Value::new(ndn::registry().generic_pdu());
    assert!(matches!(
        tmpl.insert_indexed(pdu, 0, "payload"),
        Err(Error::WrongType(_))
    ));

    assert_eq!(tmpl, before);
    assert_eq!(tmpl.get_choice("pdus.0").unwrap(), "tcp");
    assert_eq!(tmpl.get_length("pdus").unwrap(), 1);

    let mut empty = Value::new(&ty("Traffic-Template"));
    assert!(empty
        .write_field(Scalar::CharString("x".into()), "pdus.0.#ip4.protocol.#plain")
        .is_err());
    assert_eq!(codec::to_text(&empty).unwrap(), "{ }");
}

#[test]
fn test_write_component_deep_copies() {
    let v = raw_packet();
    let tcp = v.read_component("pdus.0").expect("copy");
    let mut tmpl = Value::new(&ty("Traffic-Template"));
    tmpl.write_component(&tcp, "pdus.0").unwrap();
    tmpl.write_int(1, "pdus.0.#tcp.src-port.#plain").unwrap();
    assert_eq!(v.read_int("pdus.0.#tcp.src-port.#plain").unwrap(), 27103);
    assert_eq!(tmpl.read_int("pdus.0.#tcp.dst-port.#plain").unwrap(), 80);

    // A variant's type stored at a CHOICE node selects that variant.
    let udp_ty = ndn::registry().protocol_by_label("udp").unwrap().pdu.clone();
    let mut udp = Value::new(&udp_ty);
    udp.write_int(53, "dst-port.#plain").unwrap();
    tmpl.write_component(&udp, "pdus.1").unwrap();
    assert_eq!(tmpl.get_choice("pdus.1").unwrap(), "udp");

    let err = tmpl.write_component(&udp, "payload").unwrap_err();
    assert!(matches!(err, Error::WrongType(_)), "{}", err);
}

#[test]
fn test_indexed_insert_and_remove() {
    let mut v = raw_packet();
    let eth = v.get_indexed(-1, "pdus").unwrap();
    assert_eq!(eth.active_variant(), Some("eth"));

    let mut udp = Value::new(ndn::registry().generic_pdu());
    udp.write_int(68, "#udp.src-port.#plain").unwrap();
    v.insert_indexed(udp, 1, "pdus").unwrap();
    assert_eq!(v.get_choice("pdus.1").unwrap(), "udp");
    assert_eq!(v.get_choice("pdus.2").unwrap(), "ip4");

    let removed = v.remove_indexed(0, "pdus").unwrap();
    assert_eq!(removed.active_variant(), Some("tcp"));
    assert_eq!(v.get_choice("pdus.0").unwrap(), "udp");
    assert_eq!(v.get_length("pdus").unwrap(), 3);
}

#[test]
fn test_pattern_matching_through_data_units() {
    let pattern = codec::parse_complete(PATTERN, &ty("Traffic-Pattern")).expect("parse pattern");
    let unit = pattern.read_indexed(0, "").expect("unit");

    let dst_port = DataUnit::read(unit, "pdus.0.#tcp.dst-port").unwrap();
    assert!(dst_port.matches_int(8080).unwrap());
    assert!(!dst_port.matches_int(80).unwrap());
    assert!(dst_port.matches_bytes(&[0x1f, 0x90]).unwrap());

    let flags = DataUnit::read(unit, "pdus.0.#tcp.flags").unwrap();
    assert!(flags.matches_int(17).unwrap());
    assert!(flags.matches_int(2).unwrap());
    assert!(!flags.matches_int(4).unwrap());

    let src_port = DataUnit::read(unit, "pdus.0.#tcp.src-port").unwrap();
    assert!(src_port.is_unset());
    assert!(src_port.matches_int(12345).unwrap());

    let dst_addr = DataUnit::read(unit, "pdus.1.#ip4.dst-addr").unwrap();
    assert!(dst_addr.matches_bytes(&[10, 0, 0, 77]).unwrap());
    assert!(!dst_addr.matches_bytes(&[10, 0, 1, 77]).unwrap());
}

#[test]
fn test_flow_spec_from_template_fields() {
    let pattern = codec::parse_complete(PATTERN, &ty("Traffic-Pattern")).expect("parse pattern");
    let spec = FlowSpec::read(&pattern, "0.pdus.1.#ip4.dst-addr", 4)
        .unwrap()
        .expect("constrained");
    assert_eq!(spec.spec, [10, 0, 0, 0]);
    assert_eq!(spec.mask, [0xff, 0xff, 0xff, 0]);
    assert_eq!(spec.last, None);
    assert!(spec.matches(&[10, 0, 0, 200]));

    let v = raw_packet();
    let port = FlowSpec::read(&v, "pdus.0.#tcp.src-port", 2).unwrap().expect("plain");
    assert_eq!(port.spec, 27103u16.to_be_bytes());
    assert_eq!(port.mask, [0xff, 0xff]);
    assert_eq!(FlowSpec::read(&v, "pdus.0.#tcp.seqn", 4).unwrap(), None);
}

#[test]
fn test_print_parse_round_trip() {
    let v = raw_packet();
    let text = codec::to_text(&v).expect("print");
    let back = codec::parse_complete(&text, v.ty()).expect("reparse");
    assert_eq!(back, v);
    assert_eq!(
        codec::estimate_text_length(&v, &PrintOptions::default()).unwrap(),
        text.chars().count()
    );
    assert!(text.starts_with("{\n  received {\n    seconds 1700000000,"));
    assert!(text.contains("    eth:{\n      length-type plain:2048\n    }"));
}

#[test]
fn test_print_overflow() {
    let v = raw_packet();
    let needed = codec::estimate_text_length(&v, &PrintOptions::default()).unwrap();
    match codec::print(&v, &PrintOptions::with_max_len(needed - 1)) {
        Err(Error::Overflow { needed: n, max }) => {
            assert_eq!(n, needed);
            assert_eq!(max, needed - 1);
        }
        other => panic!("expected overflow, got {:?}", other),
    }
    assert!(codec::print(&v, &PrintOptions::with_max_len(needed)).is_ok());
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("packet.asn");
    let v = raw_packet();
    codec::save_to_file(&v, &path).expect("save");
    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.ends_with("}\n"));
    let back = codec::parse_from_file(&path, v.ty()).expect("load");
    assert_eq!(back, v);

    let missing = codec::parse_from_file(dir.path().join("nope.asn"), v.ty());
    assert!(matches!(missing, Err(Error::Io(_))));
}

#[test]
fn test_csap_spec_layers() {
    let text = "{ layers { tcp:{ local-port plain:5000, data client:NULL }, ip4:{ local-addr plain:'C0 A8 00 01 'H } }, params { receive-timeout-ms 100 } }";
    let spec = codec::parse_complete(text, &ty("CSAP-spec")).expect("parse");
    assert_eq!(spec.get_syntax("layers").unwrap(), Syntax::SequenceOf);
    assert_eq!(spec.get_choice("layers.0.#tcp.data").unwrap(), "client");
    assert_eq!(spec.read_field("params.receive-timeout-ms").unwrap(), &Scalar::Integer(100));
    let mut buf = [0u8; 4];
    let n = spec.read_value_field(&mut buf, "layers.1.#ip4.local-addr.#plain").unwrap();
    assert_eq!(&buf[..n], [192, 168, 0, 1]);
}

#[test]
fn test_walk_marks_leaves() {
    let mut v = raw_packet();
    v.walk_depth(true, true, |path, node| {
        if path.to_string().ends_with(".#plain") {
            node.put_mark(1);
        }
        Ok::<_, ()>(())
    })
    .unwrap();
    assert_eq!(v.find_descendant("pdus.2.#eth.length-type.#plain").unwrap().get_mark(), 1);
    assert_eq!(v.find_descendant("received.seconds").unwrap().get_mark(), 0);
    v.reset_marks(0);
    assert_eq!(v.find_descendant("pdus.2.#eth.length-type.#plain").unwrap().get_mark(), 0);
}
