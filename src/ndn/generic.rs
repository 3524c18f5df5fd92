//! Protocol-independent NDN types: the DATA-UNIT family, payload descriptions,
//! CSAP specifications, traffic templates and patterns, raw packets.

use super::{choice, sequence};
use crate::data_unit::{data_unit_type, mask_type};
use crate::registry::Generics;
use crate::types::{base, Primitive, SchemaError, Tag, Type, TypeRef};
use once_cell::sync::Lazy;
use std::sync::Arc;

fn schema(r: Result<TypeRef, SchemaError>) -> TypeRef {
    r.unwrap_or_else(|e| panic!("built-in NDN schema is malformed: {}", e))
}

fn int_subtype(name: &str) -> TypeRef {
    Type::primitive(name, Tag::universal(2), Primitive::Integer)
}

static IP_ADDRESS: Lazy<TypeRef> = Lazy::new(|| Type::octet_string_fixed("IpAddress", Tag::application(0), 4));
static MAC_ADDRESS: Lazy<TypeRef> = Lazy::new(|| Type::octet_string_fixed("MacAddress", Tag::application(1), 6));

/// IPv4 address: `OCTET STRING (SIZE(4))`, `[APPLICATION 0]`.
pub fn ip_address() -> TypeRef {
    Arc::clone(&IP_ADDRESS)
}

pub fn mac_address() -> TypeRef {
    Arc::clone(&MAC_ADDRESS)
}

macro_rules! data_unit {
    ($(#[$doc:meta])* $name:ident, $base:expr, $range:expr) => {
        $(#[$doc])*
        pub fn $name() -> TypeRef {
            static TY: Lazy<TypeRef> = Lazy::new(|| schema(data_unit_type(&$base, $range)));
            Arc::clone(&TY)
        }
    };
}

data_unit!(
    /// `DATA-UNIT(INTEGER)`
    du_integer, base::integer(), true);
data_unit!(du_int1, int_subtype("INTEGER (0..1)"), true);
data_unit!(du_int3, int_subtype("INTEGER (0..7)"), true);
data_unit!(du_int4, int_subtype("INTEGER (0..15)"), true);
data_unit!(du_int8, int_subtype("INTEGER (0..255)"), true);
data_unit!(du_int12, int_subtype("INTEGER (0..4095)"), true);
data_unit!(du_int16, int_subtype("INTEGER (0..65535)"), true);
data_unit!(du_int32, int_subtype("INTEGER (-2147483648..2147483647)"), true);
data_unit!(du_uint32, Type::primitive("INTEGER (0..4294967295)", Tag::universal(2), Primitive::UInteger), true);
data_unit!(du_octet_string, base::octet_string(), false);
data_unit!(du_char_string, base::char_string(), false);
data_unit!(
    /// `DATA-UNIT(IpAddress)`; `#range` masks select prefixes.
    du_ip_address, ip_address(), true);
data_unit!(du_mac_address, mac_address(), true);

/// Every DATA-UNIT instance, for registration by name.
pub fn data_units() -> Vec<TypeRef> {
    vec![
        du_integer(),
        du_int1(),
        du_int3(),
        du_int4(),
        du_int8(),
        du_int12(),
        du_int16(),
        du_int32(),
        du_uint32(),
        du_octet_string(),
        du_char_string(),
        du_ip_address(),
        du_mac_address(),
    ]
}

static PAYLOAD: Lazy<TypeRef> = Lazy::new(|| {
    schema(choice(
        "Payload",
        10,
        &[
            ("bytes", &base::octet_string()),
            ("mask", &mask_type()),
            ("function", &base::char_string()),
            ("filename", &base::char_string()),
            ("length", &base::integer()),
        ],
    ))
});

pub fn payload() -> TypeRef {
    Arc::clone(&PAYLOAD)
}

static CSAP_PARAMS: Lazy<TypeRef> = Lazy::new(|| {
    schema(sequence(
        "CSAP-params",
        11,
        &[
            ("receive-timeout-ms", &base::integer()),
            ("stop-latency-timeout-ms", &base::integer()),
        ],
    ))
});

pub fn csap_params() -> TypeRef {
    Arc::clone(&CSAP_PARAMS)
}

static TIMESTAMP: Lazy<TypeRef> = Lazy::new(|| {
    schema(sequence(
        "NDN-TimeStamp",
        12,
        &[("seconds", &base::integer()), ("micro-seconds", &base::integer())],
    ))
});

pub fn timestamp() -> TypeRef {
    Arc::clone(&TIMESTAMP)
}

static PACKET_ACTION: Lazy<TypeRef> = Lazy::new(|| {
    schema(choice(
        "Packet-Action",
        13,
        &[
            ("forw-pld", &base::integer()),
            ("forw-raw", &base::integer()),
            ("function", &base::char_string()),
            ("file", &base::char_string()),
            ("break", &base::null()),
            ("no-report", &base::null()),
        ],
    ))
});

pub fn packet_action() -> TypeRef {
    Arc::clone(&PACKET_ACTION)
}

static PACKET_ACTIONS: Lazy<TypeRef> =
    Lazy::new(|| Type::sequence_of("Packet-Actions", Tag::private(14), &PACKET_ACTION));

pub fn packet_actions() -> TypeRef {
    Arc::clone(&PACKET_ACTIONS)
}

/// Template iteration arguments: explicit lists or a counted loop.
fn template_parameters() -> Result<TypeRef, SchemaError> {
    let ints = Type::sequence_of("Template-Parameter-ints", Tag::private(1), &base::integer());
    let strings = Type::sequence_of("Template-Parameter-strings", Tag::private(2), &base::char_string());
    let simple_for = sequence(
        "Template-Parameter-simple-for",
        3,
        &[
            ("begin", &base::integer()),
            ("end", &base::integer()),
            ("step", &base::integer()),
        ],
    )?;
    let param = choice(
        "Template-Parameter",
        15,
        &[("ints", &ints), ("strings", &strings), ("simple-for", &simple_for)],
    )?;
    Ok(Type::sequence_of("Template-Parameters", Tag::private(16), &param))
}

/// Types that do not embed `Generic-PDU` or `Generic-CSAP-Layer`.
pub fn standalone() -> Result<Vec<TypeRef>, SchemaError> {
    Ok(vec![
        payload(),
        csap_params(),
        timestamp(),
        packet_action(),
        packet_actions(),
        template_parameters()?,
    ])
}

/// Types built over the aggregate CHOICE types of a registry.
pub fn aggregates(g: &Generics) -> Result<Vec<TypeRef>, SchemaError> {
    let pdus = Type::sequence_of("Generic-PDU-sequence", Tag::private(20), &g.pdu);
    let layers = Type::sequence_of("CSAP-layers", Tag::private(21), &g.csap_layer);

    let csap_spec = sequence("CSAP-spec", 22, &[("layers", &layers), ("params", &csap_params())])?;

    let template = sequence(
        "Traffic-Template",
        23,
        &[
            ("arg-sets", &template_parameters()?),
            ("delays", &du_int32()),
            ("pdus", &pdus),
            ("payload", &payload()),
            ("send-func", &base::char_string()),
        ],
    )?;

    let unit = sequence(
        "Traffic-Pattern-Unit",
        24,
        &[("pdus", &pdus), ("payload", &payload()), ("actions", &packet_actions())],
    )?;
    let pattern = Type::sequence_of("Traffic-Pattern", Tag::private(25), &unit);

    let raw_packet = sequence(
        "Raw-Packet",
        26,
        &[
            ("received", &timestamp()),
            ("pdus", &pdus),
            ("payload", &payload()),
            ("match-unit", &base::integer()),
        ],
    )?;

    Ok(vec![pdus, layers, csap_spec, template, unit, pattern, raw_packet])
}
