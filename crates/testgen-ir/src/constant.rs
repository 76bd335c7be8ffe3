use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A concrete, unsigned bit-vector of fixed width.
///
/// The value is always kept reduced modulo `2^width`, so two constants
/// compare equal exactly when they hold the same bits at the same width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ConstantRepr", into = "ConstantRepr")]
pub struct Constant {
    width: u32,
    value: BigUint,
}

/// Wire form: `{"width": 32, "value": "0x0a000001"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConstantRepr {
    width: u32,
    value: String,
}

impl Constant {
    pub fn new(width: u32, value: BigUint) -> Self {
        let value = value & modulus_mask(width);
        Self { width, value }
    }

    pub fn from_u64(width: u32, value: u64) -> Self {
        Self::new(width, BigUint::from(value))
    }

    pub fn zero(width: u32) -> Self {
        Self {
            width,
            value: BigUint::from(0u8),
        }
    }

    /// All `width` bits set.
    pub fn ones(width: u32) -> Self {
        Self {
            width,
            value: modulus_mask(width),
        }
    }

    pub fn from_bool(b: bool) -> Self {
        Self::from_u64(1, u64::from(b))
    }

    /// Parse a `0x`-prefixed hex or a plain decimal literal.
    pub fn parse(width: u32, literal: &str) -> Option<Self> {
        let literal = literal.trim();
        let parsed = match literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
            None => BigUint::parse_bytes(literal.as_bytes(), 10),
        }?;
        Some(Self::new(width, parsed))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.bits() == 0
    }

    pub fn as_u64(&self) -> Option<u64> {
        let mut digits = self.value.iter_u64_digits();
        let low = digits.next().unwrap_or(0);
        match digits.next() {
            Some(_) => None,
            None => Some(low),
        }
    }

    /// Bit `index`, counted from the least significant bit.
    pub fn bit(&self, index: u32) -> bool {
        index < self.width && self.value.bit(u64::from(index))
    }

    /// `self` in the high bits, `low` in the low bits.
    pub fn concat(&self, low: &Constant) -> Constant {
        let value = (&self.value << low.width as usize) | &low.value;
        Constant::new(self.width + low.width, value)
    }

    /// Bits `hi..=lo`; callers guarantee `lo <= hi < width`.
    pub fn slice(&self, hi: u32, lo: u32) -> Constant {
        let width = hi.saturating_sub(lo) + 1;
        Constant::new(width, &self.value >> lo as usize)
    }

    pub fn bitand(&self, other: &Constant) -> Constant {
        Constant::new(self.width, &self.value & &other.value)
    }

    pub fn bitor(&self, other: &Constant) -> Constant {
        Constant::new(self.width, &self.value | &other.value)
    }

    pub fn bitxor(&self, other: &Constant) -> Constant {
        Constant::new(self.width, &self.value ^ &other.value)
    }

    pub fn bitnot(&self) -> Constant {
        Constant::new(self.width, &self.value ^ modulus_mask(self.width))
    }

    pub fn wrapping_add(&self, other: &Constant) -> Constant {
        Constant::new(self.width, &self.value + &other.value)
    }

    pub fn wrapping_sub(&self, other: &Constant) -> Constant {
        let modulus = BigUint::from(1u8) << self.width as usize;
        Constant::new(self.width, (&self.value + modulus) - &other.value)
    }

    /// Lower-case hex, zero-padded to one digit per nibble of the width.
    pub fn to_hex(&self) -> String {
        let digits = self.width.div_ceil(4).max(1) as usize;
        format!("{:0>digits$}", self.value.to_str_radix(16))
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<Constant> for ConstantRepr {
    fn from(c: Constant) -> Self {
        ConstantRepr {
            width: c.width,
            value: format!("0x{}", c.to_hex()),
        }
    }
}

impl TryFrom<ConstantRepr> for Constant {
    type Error = String;

    fn try_from(repr: ConstantRepr) -> Result<Self, Self::Error> {
        Constant::parse(repr.width, &repr.value)
            .ok_or_else(|| format!("invalid bit-vector literal: {}", repr.value))
    }
}

fn modulus_mask(width: u32) -> BigUint {
    (BigUint::from(1u8) << width as usize) - BigUint::from(1u8)
}
