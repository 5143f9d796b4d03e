//! Ordered-key codec.
//!
//! A valid key is 1-4 uppercase ASCII letters followed by 1-8 decimal
//! digits with no leading zero (a lone `0` is allowed). The codec maps a
//! key to a `u64` ordinal and back; the mapping is a strict monotonic
//! bijection over the valid key space and induces the table's key order.
//! Ordinals exist only to build range predicates, never for arithmetic on
//! the key itself.

use crate::types::{IncidKey, Result, TessellaError};

/// Width of the numeric component: ordinals reserve the low 8 decimal
/// digits for the record number.
const NUMBER_SPAN: u64 = 100_000_000;

/// Largest bijective base-26 prefix code for a 4-letter prefix.
const MAX_PREFIX: u64 = 26 + 26 * 26 + 26 * 26 * 26 + 26 * 26 * 26 * 26;

/// Smallest valid ordinal (`A0`).
pub const MIN_ORDINAL: u64 = NUMBER_SPAN;

/// Largest valid ordinal (`ZZZZ99999999`).
pub const MAX_ORDINAL: u64 = MAX_PREFIX * NUMBER_SPAN + (NUMBER_SPAN - 1);

/// Parses a key into its ordinal.
pub fn to_ordinal(key: &IncidKey) -> Result<u64> {
    let text = key.as_str();
    let split = text.bytes().position(|b| b.is_ascii_digit()).unwrap_or(text.len());
    let (prefix, digits) = text.split_at(split);

    if prefix.is_empty() || prefix.len() > 4 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(TessellaError::MalformedKey(text.to_owned()));
    }
    if digits.is_empty()
        || digits.len() > 8
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return Err(TessellaError::MalformedKey(text.to_owned()));
    }

    // Bijective base-26: A=1 .. Z=26, AA=27, so shorter prefixes always
    // order below longer ones that extend them.
    let mut code: u64 = 0;
    for b in prefix.bytes() {
        code = code * 26 + u64::from(b - b'A') + 1;
    }
    let number: u64 = digits
        .parse()
        .map_err(|_| TessellaError::MalformedKey(text.to_owned()))?;
    Ok(code * NUMBER_SPAN + number)
}

/// Renders an ordinal back into its canonical key.
pub fn from_ordinal(ordinal: u64) -> Result<IncidKey> {
    if !(MIN_ORDINAL..=MAX_ORDINAL).contains(&ordinal) {
        return Err(TessellaError::MalformedKey(format!("#{ordinal}")));
    }
    let mut code = ordinal / NUMBER_SPAN;
    let number = ordinal % NUMBER_SPAN;

    let mut letters = [0u8; 4];
    let mut n = 0;
    while code > 0 {
        let rem = (code - 1) % 26;
        letters[n] = b'A' + rem as u8;
        n += 1;
        code = (code - 1) / 26;
    }
    let mut text = String::with_capacity(n + 8);
    for b in letters[..n].iter().rev() {
        text.push(*b as char);
    }
    text.push_str(&number.to_string());
    Ok(IncidKey(text))
}

#[cfg(test)]
mod tests {
    use super::{from_ordinal, to_ordinal, MAX_ORDINAL, MIN_ORDINAL};
    use crate::types::IncidKey;
    use proptest::prelude::*;

    #[test]
    fn ordinal_roundtrip_basics() {
        for text in ["A0", "A1", "A2", "B7", "Z99999999", "AA1", "ZZZZ99999999"] {
            let key = IncidKey::from(text);
            let ord = to_ordinal(&key).unwrap();
            assert_eq!(from_ordinal(ord).unwrap(), key, "roundtrip for {text}");
        }
    }

    #[test]
    fn ordinal_order_matches_key_order() {
        let a1 = to_ordinal(&IncidKey::from("A1")).unwrap();
        let a2 = to_ordinal(&IncidKey::from("A2")).unwrap();
        let a10 = to_ordinal(&IncidKey::from("A10")).unwrap();
        let b1 = to_ordinal(&IncidKey::from("B1")).unwrap();
        let aa1 = to_ordinal(&IncidKey::from("AA1")).unwrap();
        assert!(a1 < a2);
        assert!(a2 < a10);
        assert!(a10 < b1);
        assert!(b1 < aa1);
    }

    #[test]
    fn rejects_malformed_keys() {
        for text in ["", "A", "1", "a1", "ABCDE1", "A123456789", "A01", "A-1", "A1B"] {
            assert!(to_ordinal(&IncidKey::from(text)).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn rejects_out_of_range_ordinals() {
        assert!(from_ordinal(0).is_err());
        assert!(from_ordinal(MIN_ORDINAL - 1).is_err());
        assert!(from_ordinal(MAX_ORDINAL + 1).is_err());
    }

    proptest! {
        #[test]
        fn every_ordinal_renders_and_parses_back(ord in MIN_ORDINAL..=MAX_ORDINAL) {
            let key = from_ordinal(ord).unwrap();
            prop_assert_eq!(to_ordinal(&key).unwrap(), ord);
        }

        #[test]
        fn parse_render_is_identity(
            prefix in "[A-Z]{1,4}",
            number in 0u64..100_000_000,
        ) {
            let key = IncidKey(format!("{prefix}{number}"));
            let ord = to_ordinal(&key).unwrap();
            prop_assert_eq!(from_ordinal(ord).unwrap(), key);
        }
    }
}
