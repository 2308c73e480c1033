//! RLP helpers for arbitrary-precision fields

use num_bigint::{BigInt, Sign};
use rlp::RlpStream;

/// Append a signed integer as `[is_negative, magnitude]`. Zero encodes with an
/// empty magnitude so every value has exactly one encoding.
pub(crate) fn append_signed(stream: &mut RlpStream, value: &BigInt) {
    stream.begin_list(2);
    stream.append(&(value.sign() == Sign::Minus));
    let magnitude = match value.sign() {
        Sign::NoSign => Vec::new(),
        _ => value.magnitude().to_bytes_be(),
    };
    stream.append(&magnitude);
}
