//! Ethernet (IEEE 802.3, optional 802.1Q tag).

use super::generic::{du_char_string, du_int1, du_int12, du_int16, du_int3, du_mac_address};
use super::{proto, sequence};
use crate::registry::Protocol;
use crate::types::SchemaError;

pub fn protocol() -> Result<Protocol, SchemaError> {
    let header = sequence(
        "Ethernet-Header",
        proto::ETH,
        &[
            ("dst-addr", &du_mac_address()),
            ("src-addr", &du_mac_address()),
            ("length-type", &du_int16()),
            ("priority", &du_int3()),
            ("cfi", &du_int1()),
            ("vlan-id", &du_int12()),
        ],
    )?;
    let csap = sequence(
        "Ethernet-CSAP",
        proto::ETH,
        &[
            ("device-id", &du_char_string()),
            ("local-addr", &du_mac_address()),
            ("remote-addr", &du_mac_address()),
            ("eth-type", &du_int16()),
            ("priority", &du_int3()),
            ("vlan-id", &du_int12()),
        ],
    )?;
    Ok(Protocol::new("eth", proto::ETH, header, csap))
}
