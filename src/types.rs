//! Core types: TokenId, AccountId, Amount, Timestamp, Ratio

use std::cmp::Ordering;
use std::fmt;

/// Absolute token amount in the token's smallest unit.
///
/// `u128` leaves headroom for 18-decimal tokens multiplied by basket supply.
pub type Amount = u128;

/// Signed amount used for per-token deltas.
pub type SignedAmount = i128;

/// Wall-clock time in seconds, supplied by the caller of every time-gated call.
pub type Timestamp = u64;

/// Token identifier: a short ticker stored inline (max 8 bytes, UTF-8).
///
/// `Copy` and hashable without allocation, so it can key every map in the
/// ledger.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId {
    bytes: [u8; TokenId::MAX_LEN],
    len: u8,
}

impl TokenId {
    /// Maximum ticker length in bytes.
    pub const MAX_LEN: usize = 8;

    /// Create a token id from a ticker.
    ///
    /// # Panics
    ///
    /// Panics if `s` is longer than [`TokenId::MAX_LEN`] bytes.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(id) => id,
            None => panic!("token ticker '{s}' exceeds {} bytes", Self::MAX_LEN),
        }
    }

    /// Create a token id, returning `None` if the ticker is too long.
    pub fn try_new(s: &str) -> Option<Self> {
        if s.len() > Self::MAX_LEN {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// Create a token id, truncating at a char boundary if the ticker is too long.
    pub fn from_str_truncated(s: &str) -> Self {
        let mut end = s.len().min(Self::MAX_LEN);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        Self::new(&s[..end])
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Always built from a &str cut at a char boundary.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({:?})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TokenId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TokenId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenId::try_new(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "token ticker '{s}' exceeds {} bytes",
                TokenId::MAX_LEN
            ))
        })
    }
}

/// Ledger participant (holder, bidder, data manager, or a system account).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// Exact positive rational `numerator / denominator`.
///
/// Ordering and equality are by value (`1/2 == 2/4`), computed without
/// multiplication so no operand size can overflow.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ratio {
    numerator: u128,
    denominator: u128,
}

impl Ratio {
    /// 1/1: a bid that moves the creation unit exactly onto the target.
    pub const ONE: Ratio = Ratio {
        numerator: 1,
        denominator: 1,
    };

    /// Create a ratio. Returns `None` unless both parts are non-zero.
    pub fn new(numerator: u128, denominator: u128) -> Option<Self> {
        if numerator == 0 || denominator == 0 {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    #[inline]
    pub fn numerator(&self) -> u128 {
        self.numerator
    }

    #[inline]
    pub fn denominator(&self) -> u128 {
        self.denominator
    }

    /// `floor(self * value)`, rounding toward negative infinity.
    ///
    /// Exact for any pair of parts; `None` only if the result itself does
    /// not fit in a `SignedAmount`.
    pub fn floor_mul(&self, value: SignedAmount) -> Option<SignedAmount> {
        let whole = self.numerator / self.denominator;
        let rest = self.numerator % self.denominator;
        let magnitude = value.unsigned_abs();
        let (quotient, remainder) = mul_div_below(rest, magnitude, self.denominator);
        let truncated = whole.checked_mul(magnitude)?.checked_add(quotient)?;
        if value >= 0 {
            SignedAmount::try_from(truncated).ok()
        } else {
            let ceiled = truncated.checked_add(u128::from(remainder > 0))?;
            0_i128.checked_sub_unsigned(ceiled)
        }
    }
}

/// `(a * b) / d` and `(a * b) % d` for `a < d`, without a wider integer.
///
/// Shift-and-add over the bits of `b`, keeping `a * prefix = q * d + r`.
fn mul_div_below(a: u128, b: u128, d: u128) -> (u128, u128) {
    let (mut q, mut r) = (0_u128, 0_u128);
    for bit in (0..u128::BITS).rev() {
        q <<= 1;
        if r >= d - r {
            q += 1;
            r -= d - r;
        } else {
            r += r;
        }
        if (b >> bit) & 1 == 1 {
            if r >= d - a {
                q += 1;
                r -= d - a;
            } else {
                r += a;
            }
        }
    }
    (q, r)
}

/// Compare `an/ad` with `bn/bd` by continued-fraction expansion.
fn cmp_fraction(mut an: u128, mut ad: u128, mut bn: u128, mut bd: u128) -> Ordering {
    loop {
        let (aq, ar) = (an / ad, an % ad);
        let (bq, br) = (bn / bd, bn % bd);
        if aq != bq {
            return aq.cmp(&bq);
        }
        match (ar == 0, br == 0) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        // ar/ad vs br/bd has the same order as bd/br vs ad/ar
        (an, ad, bn, bd) = (bd, br, ad, ar);
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_fraction(
            self.numerator,
            self.denominator,
            other.numerator,
            other.denominator,
        )
    }
}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ratio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ratio {}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
