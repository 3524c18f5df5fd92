//! # ndn-asn — schema-driven value trees for protocol test templates
//!
//! Network data notation (NDN) describes packets, capture endpoints (CSAPs),
//! traffic templates and receive patterns as typed, ASN-like value trees. This
//! crate provides the pieces a test agent needs to work with them:
//!
//! - **Types** ([`types`]): immutable schema descriptors (SEQUENCE, SEQUENCE OF,
//!   CHOICE, tagged wrappers, ENUMERATED and primitives), shared via [`TypeRef`].
//! - **Values** ([`value`]): trees bound to a type. CHOICE nodes hold at most one
//!   active variant; SEQUENCE fields may be absent.
//! - **Paths** ([`path`], [`navigate`]): dot-separated addresses such as
//!   `pdus.0.#tcp.src-port.#plain`, with a tolerant lookup that descends through
//!   active choices ([`Value::find_descendant`]) and a strict one that follows the
//!   path literally ([`Value::retrieve_descendant`]).
//! - **Plain syntax** ([`codec`]): parse and print the textual value notation,
//!   estimate printed length, save and load files.
//! - **DATA-UNIT** ([`data_unit`]): the per-field CHOICE of exact value, range,
//!   intervals, enumeration or mask that lets one schema describe both what to send
//!   and what to accept.
//! - **Registry** ([`registry`], [`ndn`]): the built-in protocol tables (eth, ip4,
//!   tcp, udp) and the generic types assembled over them.
//!
//! ## Example
//!
//! ```
//! use ndn_asn::{codec, ndn};
//!
//! let ty = ndn::registry().get("TCP-CSAP").unwrap();
//! let (v, _) = codec::parse("{ local-port plain:27103, remote-port plain:27104 }", &ty).unwrap();
//! assert_eq!(v.read_int("local-port.#plain").unwrap(), 27103);
//! assert_eq!(
//!     codec::to_text(&v).unwrap(),
//!     "{\n  local-port plain:27103,\n  remote-port plain:27104\n}"
//! );
//! ```
//!
//! See `tests/integration.rs` for the template and pattern workflows.

pub mod codec;
pub mod data_unit;
pub mod error;
pub mod navigate;
pub mod ndn;
pub mod parser;
pub mod path;
pub mod print;
pub mod registry;
pub mod types;
pub mod value;
pub mod walk;

pub use codec::PrintOptions;
pub use data_unit::{DataUnit, FlowSpec};
pub use error::{Error, Result};
pub use path::{AsPath, Path, Segment};
pub use registry::{get_type, Protocol, Registry};
pub use types::{SchemaError, Syntax, Tag, TagClass, Type, TypeRef};
pub use value::{Scalar, Value};
pub use walk::{get_walk_profile, reset_walk_profile};
