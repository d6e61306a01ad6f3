//! Hex helpers shared by the HTTP surfaces.
//!
//! All byte fields on the wire are `0x`-prefixed lowercase hex; addresses
//! are exactly 20 bytes.

use alloy::primitives::{hex, Address, Bytes};

/// Decode a `0x`-prefixed hex string into bytes.
pub(crate) fn decode_payload(value: &str) -> Result<Bytes, &'static str> {
    if !value.starts_with("0x") {
        return Err("invalid hex payload");
    }
    hex::decode(value)
        .map(Bytes::from)
        .map_err(|_| "invalid hex payload")
}

/// Decode a `0x`-prefixed hex string into a 20-byte address.
pub(crate) fn decode_address(value: &str) -> Result<Address, &'static str> {
    let bytes = decode_payload(value)?;
    if bytes.len() != Address::len_bytes() {
        return Err("invalid address length");
    }
    Ok(Address::from_slice(&bytes))
}

/// Encode bytes as `0x`-prefixed lowercase hex. Empty input encodes as
/// `"0x"`.
pub(crate) fn encode(bytes: &[u8]) -> String {
    hex::encode_prefixed(bytes)
}
