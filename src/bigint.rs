//! Unsigned big-integer helpers over the VDF's RSA group.
//!
//! Thin wrapper around `num-bigint`: hex parse/serialize with the "no
//! leading zeros except zero itself" rule, and a `mod_pow` convenience.
//! Side-channel resistance is explicitly out of scope (spec.md §4.A) —
//! the VDF is slow by design, and `num-bigint`'s modpow is not
//! constant-time.

use crate::error::BigIntError;
use num_bigint::BigUint;
use num_traits::Zero;

/// Parse a lowercase hex string (no `0x` prefix) into a `BigUint`.
///
/// Accepts an odd number of hex digits (callers are not required to pad).
/// Rejects non-hex characters and the empty string.
pub fn from_hex(s: &str) -> Result<BigUint, BigIntError> {
    if s.is_empty() {
        return Err(BigIntError::InvalidHex("empty string".to_string()));
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BigIntError::InvalidHex(s.to_string()));
    }
    let padded = if s.len() % 2 == 1 {
        format!("0{s}")
    } else {
        s.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| BigIntError::InvalidHex(e.to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Serialize a `BigUint` as lowercase hex without a leading `0x`.
///
/// Zero serializes to `"0"`; every other value has no leading zero
/// nibble, matching spec.md §4.A's canonical-hex rule.
pub fn to_hex(value: &BigUint) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let bytes = value.to_bytes_be();
    let mut out = hex::encode(bytes);
    while out.starts_with('0') && out.len() > 1 {
        out.remove(0);
    }
    out
}

/// `base^exp mod modulus`, rejecting a zero modulus per spec.md §4.A.
pub fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> Result<BigUint, BigIntError> {
    if modulus.is_zero() {
        return Err(BigIntError::ZeroModulus);
    }
    Ok(base.modpow(exp, modulus))
}

/// Serialize a `BigUint` as a fixed-width big-endian byte buffer, used
/// when hashing group elements into the Wesolowski challenge (spec.md
/// §4.B step 1): the width must be uniform regardless of the element's
/// natural byte length so hash inputs cannot collide across paddings.
pub fn to_fixed_width_be(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut buf = vec![0u8; width];
    let start = width.saturating_sub(bytes.len());
    let copy_len = bytes.len().min(width);
    buf[start..].copy_from_slice(&bytes[bytes.len() - copy_len..]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let n = BigUint::from(4096u32);
        let hex = to_hex(&n);
        assert_eq!(hex, "1000");
        assert_eq!(from_hex(&hex).unwrap(), n);
    }

    #[test]
    fn zero_serializes_to_single_zero() {
        assert_eq!(to_hex(&BigUint::zero()), "0");
    }

    #[test]
    fn odd_length_hex_is_accepted() {
        assert_eq!(from_hex("abc").unwrap(), BigUint::parse_bytes(b"abc", 16).unwrap());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(from_hex("zz").is_err());
        assert!(from_hex("").is_err());
    }

    #[test]
    fn mod_pow_rejects_zero_modulus() {
        let b = BigUint::from(2u32);
        assert!(mod_pow(&b, &b, &BigUint::zero()).is_err());
    }

    #[test]
    fn fixed_width_padding() {
        let n = BigUint::from(1u32);
        let buf = to_fixed_width_be(&n, 8);
        assert_eq!(buf, vec![0, 0, 0, 0, 0, 0, 0, 1]);
    }
}
