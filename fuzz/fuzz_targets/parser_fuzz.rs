//! Parser fuzz target: feed arbitrary text to the plain-syntax parser for a few
//! registered types. Parsing must not panic, and whatever parses must print and
//! parse back to the same value.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let reg = ndn_asn::ndn::registry();
    for name in ["Raw-Packet", "Traffic-Template", "CSAP-spec"] {
        let Some(ty) = reg.get(name) else { continue };
        if let Ok((v, _)) = ndn_asn::codec::parse(s, &ty) {
            if let Ok(text) = ndn_asn::codec::to_text(&v) {
                let back = ndn_asn::codec::parse_complete(&text, &ty);
                assert!(matches!(back, Ok(ref b) if *b == v), "round trip failed for {}", name);
            }
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
