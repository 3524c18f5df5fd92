//! IPv4, TCP and UDP.

use super::generic::{
    du_char_string, du_int1, du_int16, du_int32, du_int4, du_int8, du_ip_address, du_mac_address, du_octet_string,
    du_uint32,
};
use super::{choice, proto, sequence};
use crate::registry::Protocol;
use crate::types::{base, SchemaError, Tag, Type, TypeRef};

/// How a sender splits a datagram into fragments.
fn ip4_fragments() -> Result<TypeRef, SchemaError> {
    let frag = sequence(
        "IP4-Fragment",
        1,
        &[
            ("hdr-offset", &base::integer()),
            ("real-offset", &base::integer()),
            ("hdr-length", &base::integer()),
            ("real-length", &base::integer()),
            ("more-frags", &base::boolean()),
            ("dont-frag", &base::boolean()),
            ("id", &base::uinteger()),
        ],
    )?;
    Ok(Type::sequence_of("IP4-Fragments", Tag::private(1), &frag))
}

/// Upper-layer checksum handling: explicit offset, disabled, or corrupted by `diff`.
fn payload_checksum(name: &str) -> Result<TypeRef, SchemaError> {
    choice(
        name,
        2,
        &[
            ("offset", &base::integer()),
            ("disable", &base::null()),
            ("diff", &base::integer()),
        ],
    )
}

pub fn ip4() -> Result<Protocol, SchemaError> {
    let header = sequence(
        "IPv4-Header",
        proto::IP4,
        &[
            ("version", &du_int4()),
            ("h-length", &du_int4()),
            ("type-of-service", &du_int8()),
            ("total-length", &du_int16()),
            ("ip-ident", &du_int16()),
            ("flag-reserved", &du_int1()),
            ("dont-frag", &du_int1()),
            ("more-frags", &du_int1()),
            ("frag-offset", &du_int16()),
            ("time-to-live", &du_int8()),
            ("protocol", &du_int8()),
            ("h-checksum", &du_int16()),
            ("src-addr", &du_ip_address()),
            ("dst-addr", &du_ip_address()),
            ("options", &du_octet_string()),
            ("fragment-spec", &ip4_fragments()?),
            ("pld-checksum", &payload_checksum("IP4-Payload-Checksum")?),
        ],
    )?;
    let csap = sequence(
        "IPv4-CSAP",
        proto::IP4,
        &[
            ("type-of-service", &du_int8()),
            ("time-to-live", &du_int8()),
            ("protocol", &du_int8()),
            ("local-addr", &du_ip_address()),
            ("remote-addr", &du_ip_address()),
            ("max-packet-size", &du_int32()),
            ("ifname", &du_char_string()),
            ("remote-hwaddr", &du_mac_address()),
        ],
    )?;
    Ok(Protocol::new("ip4", proto::IP4, header, csap))
}

fn tcp_options() -> Result<TypeRef, SchemaError> {
    let mss = sequence("TCP-Option-MSS", 3, &[("length", &du_int8()), ("mss", &du_int16())])?;
    let win_scale = sequence("TCP-Option-Win-Scale", 4, &[("length", &du_int8()), ("scale", &du_int8())])?;
    let sack_perm = sequence("TCP-Option-SACK-Perm", 5, &[("length", &du_int8())])?;
    let block = sequence("TCP-SACK-Block", 6, &[("left", &du_int32()), ("right", &du_int32())])?;
    let blocks = Type::sequence_of("TCP-SACK-Blocks", Tag::private(6), &block);
    let sack_data = sequence("TCP-Option-SACK-Data", 6, &[("length", &du_int8()), ("blocks", &blocks)])?;
    let timestamp = sequence(
        "TCP-Option-Timestamp",
        7,
        &[
            ("length", &du_int8()),
            ("value", &du_int32()),
            ("echo-reply", &du_int32()),
        ],
    )?;
    let option = choice(
        "TCP-Option",
        8,
        &[
            ("eol", &base::null()),
            ("nop", &base::null()),
            ("mss", &mss),
            ("win-scale", &win_scale),
            ("sack-perm", &sack_perm),
            ("sack-data", &sack_data),
            ("timestamp", &timestamp),
        ],
    )?;
    Ok(Type::sequence_of("TCP-Options", Tag::private(9), &option))
}

pub fn tcp() -> Result<Protocol, SchemaError> {
    let header = sequence(
        "TCP-Header",
        proto::TCP,
        &[
            ("src-port", &du_int16()),
            ("dst-port", &du_int16()),
            ("seqn", &du_uint32()),
            ("ackn", &du_uint32()),
            ("hlen", &du_int8()),
            ("flags", &du_int8()),
            ("win-size", &du_int16()),
            ("checksum", &du_int16()),
            ("urg-p", &du_int16()),
            ("options", &tcp_options()?),
            ("socket", &base::integer()),
            ("length", &base::integer()),
        ],
    )?;
    let data = choice(
        "TCP-CSAP-Data",
        10,
        &[
            ("server", &base::null()),
            ("client", &base::null()),
            ("socket", &base::integer()),
        ],
    )?;
    let csap = sequence(
        "TCP-CSAP",
        proto::TCP,
        &[
            ("local-port", &du_int16()),
            ("remote-port", &du_int16()),
            ("data", &data),
        ],
    )?;
    Ok(Protocol::new("tcp", proto::TCP, header, csap).with_extra(data))
}

pub fn udp() -> Result<Protocol, SchemaError> {
    let header = sequence(
        "UDP-Header",
        proto::UDP,
        &[
            ("src-port", &du_int16()),
            ("dst-port", &du_int16()),
            ("length", &du_int16()),
            ("checksum", &du_int16()),
        ],
    )?;
    let csap = sequence(
        "UDP-CSAP",
        proto::UDP,
        &[("local-port", &du_int16()), ("remote-port", &du_int16())],
    )?;
    Ok(Protocol::new("udp", proto::UDP, header, csap))
}
