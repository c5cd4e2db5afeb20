//! Field-element helpers: selectors, hex normalization and rendering.
//!
//! Felts travel as `0x`-prefixed hex strings of up to 252 bits. Nodes are free
//! to zero-pad them, so every comparison goes through [`normalize`].

use alloy_primitives::U256;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// Errors raised while reading felts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeltError {
    #[error("invalid felt '{0}'")]
    InvalidHex(String),

    #[error("felt '{0}' does not fit in 64 bits")]
    Overflow(String),

    #[error("payload ended at felt {position}, expected {expected}")]
    Truncated { position: usize, expected: &'static str },

    #[error("{count} unread felts after the last field")]
    Trailing { count: usize },
}

/// Starknet keccak: keccak256 of `name`, masked to the low 250 bits.
///
/// Returned as normalized `0x` hex, the form used in `keys[0]`.
pub fn starknet_keccak(name: &str) -> String {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(name.as_bytes());
    hasher.finalize(&mut output);
    output[0] &= 0x03;
    normalize(&format!("0x{}", hex::encode(output)))
}

/// Hex digits of `felt` without prefix or leading zeros, lowercase.
/// Zero renders as `"0"`.
pub fn bare_hex(felt: &str) -> String {
    let digits = felt
        .strip_prefix("0x")
        .or_else(|| felt.strip_prefix("0X"))
        .unwrap_or(felt)
        .trim_start_matches('0')
        .to_ascii_lowercase();
    if digits.is_empty() {
        "0".to_string()
    } else {
        digits
    }
}

/// Canonical `0x` form: lowercase, no leading zeros.
pub fn normalize(felt: &str) -> String {
    format!("0x{}", bare_hex(felt))
}

/// Parse a felt into a 256-bit integer.
fn parse(felt: &str) -> Result<U256, FeltError> {
    U256::from_str_radix(&bare_hex(felt), 16).map_err(|_| FeltError::InvalidHex(felt.to_string()))
}

fn checked_digits(felt: &str) -> Result<String, FeltError> {
    parse(felt)?;
    Ok(bare_hex(felt))
}

pub fn to_u64(felt: &str) -> Result<u64, FeltError> {
    u64::try_from(parse(felt)?).map_err(|_| FeltError::Overflow(felt.to_string()))
}

/// Decimal rendering of an arbitrary-width felt.
pub fn to_decimal(felt: &str) -> Result<String, FeltError> {
    Ok(parse(felt)?.to_string())
}

/// Cairo short string: the felt's bytes as ASCII, leading zero bytes dropped.
pub fn to_short_string(felt: &str) -> Result<String, FeltError> {
    let mut digits = checked_digits(felt)?;
    if digits == "0" {
        return Ok(String::new());
    }
    if digits.len() % 2 == 1 {
        digits.insert(0, '0');
    }
    let bytes = hex::decode(&digits).map_err(|_| FeltError::InvalidHex(felt.to_string()))?;
    Ok(bytes.iter().map(|b| char::from(*b)).collect())
}

// ─── FeltReader ──────────────────────────────────────────────────────────────

/// Sequential reader over an event payload in ABI order.
pub struct FeltReader<'a> {
    felts: Vec<&'a str>,
    position: usize,
}

impl<'a> FeltReader<'a> {
    pub fn new<I>(felts: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self {
            felts: felts.into_iter().map(String::as_str).collect(),
            position: 0,
        }
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a str, FeltError> {
        let felt = self.felts.get(self.position).copied().ok_or(FeltError::Truncated {
            position: self.position,
            expected,
        })?;
        self.position += 1;
        Ok(felt)
    }

    /// Enum-like attribute: bare hex.
    pub fn hex(&mut self) -> Result<String, FeltError> {
        let felt = self.next("felt")?;
        checked_digits(felt)
    }

    pub fn decimal(&mut self) -> Result<String, FeltError> {
        to_decimal(self.next("felt")?)
    }

    /// Account or contract address: `0x` + bare hex.
    pub fn address(&mut self) -> Result<String, FeltError> {
        Ok(format!("0x{}", checked_digits(self.next("address")?)?))
    }

    pub fn short_string(&mut self) -> Result<String, FeltError> {
        to_short_string(self.next("short string")?)
    }

    /// `(label, id)` pair: label as bare hex, id as decimal.
    pub fn entity(&mut self) -> Result<(String, String), FeltError> {
        let label = checked_digits(self.next("entity label")?)?;
        let id = to_decimal(self.next("entity id")?)?;
        Ok((label, id))
    }

    /// Length-prefixed array, elements as decimal.
    pub fn span(&mut self) -> Result<Vec<String>, FeltError> {
        let len = to_u64(self.next("span length")?)? as usize;
        let remaining = self.felts.len() - self.position;
        if len > remaining {
            return Err(FeltError::Truncated {
                position: self.felts.len(),
                expected: "span element",
            });
        }
        (0..len).map(|_| self.decimal()).collect()
    }

    /// Fail if felts remain unread.
    pub fn finish(self) -> Result<(), FeltError> {
        match self.felts.len() - self.position {
            0 => Ok(()),
            count => Err(FeltError::Trailing { count }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_selector() {
        assert_eq!(
            starknet_keccak("Transfer"),
            "0x99cd8bde557814842a3121e8ddfd433a539b8c9f14bf31ebf108d12e6196e9"
        );
    }

    #[test]
    fn selector_fits_250_bits() {
        for name in ["CrewmatePurchased", "CrewmateRecruitedV1"] {
            let digits = bare_hex(&starknet_keccak(name));
            assert!(digits.len() < 63 || digits.as_bytes()[0] <= b'3', "{name}: {digits}");
        }
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("0x000ABc"), "0xabc");
        assert_eq!(normalize("0x0"), "0x0");
        assert_eq!(bare_hex("0x00"), "0");
    }

    #[test]
    fn decimal_rendering() {
        assert_eq!(to_decimal("0x2a").unwrap(), "42");
        assert_eq!(to_decimal("0x0").unwrap(), "0");
        // 2^128
        assert_eq!(
            to_decimal("0x100000000000000000000000000000000").unwrap(),
            "340282366920938463463374607431768211456"
        );
        // largest felt, P - 1
        assert_eq!(
            to_decimal("0x800000000000011000000000000000000000000000000000000000000000000").unwrap(),
            "3618502788666131213697322783095070105623107215331596699973092056135872020480"
        );
        // wider than 256 bits
        assert!(to_decimal(&format!("0x1{}", "0".repeat(64))).is_err());
        assert!(to_decimal("0xzz").is_err());
    }

    #[test]
    fn short_string() {
        // "Kael"
        assert_eq!(to_short_string("0x4b61656c").unwrap(), "Kael");
        assert_eq!(to_short_string("0x0").unwrap(), "");
    }

    #[test]
    fn u64_bounds() {
        assert_eq!(to_u64("0xffffffffffffffff").unwrap(), u64::MAX);
        assert!(matches!(to_u64("0x10000000000000000"), Err(FeltError::Overflow(_))));
    }

    #[test]
    fn reader_walks_payload() {
        let payload: Vec<String> = ["0x1", "0x1f4", "0x2", "0x7", "0x8", "0xabc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut r = FeltReader::new(&payload);
        assert_eq!(r.entity().unwrap(), ("1".to_string(), "500".to_string()));
        assert_eq!(r.span().unwrap(), vec!["7", "8"]);
        assert_eq!(r.address().unwrap(), "0xabc");
        r.finish().unwrap();
    }

    #[test]
    fn reader_detects_truncation_and_leftovers() {
        let payload: Vec<String> = vec!["0x5".into(), "0x1".into()];
        let mut r = FeltReader::new(&payload);
        assert!(matches!(r.span(), Err(FeltError::Truncated { .. })));

        let mut r = FeltReader::new(&payload);
        r.hex().unwrap();
        assert_eq!(r.finish(), Err(FeltError::Trailing { count: 1 }));
    }
}
