//! Fixed-point decimal numbers.

use std::fmt;
use std::str::FromStr;

/// An exact decimal number stored as `value / 10^scale`.
///
/// `Decimal::new(12345, 2)` is `123.45`. Equality is structural, so `1.0`
/// (`10, 1`) and `1` (`1, 0`) compare unequal; use [`Decimal::normalized`]
/// before comparing values of different scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    value: i128,
    scale: u8,
}

impl Decimal {
    /// Largest supported scale.
    pub const MAX_SCALE: u8 = 38;

    /// Creates a decimal from a scaled integer.
    pub fn new(value: i128, scale: u8) -> Self {
        Self {
            value,
            scale: scale.min(Self::MAX_SCALE),
        }
    }

    /// Returns the unscaled integer.
    pub fn value(&self) -> i128 {
        self.value
    }

    /// Returns the number of fractional digits.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Strips trailing fractional zeros.
    pub fn normalized(&self) -> Self {
        let mut value = self.value;
        let mut scale = self.scale;
        while scale > 0 && value % 10 == 0 {
            value /= 10;
            scale -= 1;
        }
        Self { value, scale }
    }

    /// Converts to the nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        self.value as f64 / 10f64.powi(self.scale as i32)
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Self::new(v as i128, 0)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.value);
        }
        let divisor = 10i128.pow(self.scale as u32);
        let int_part = (self.value / divisor).abs();
        let frac_part = (self.value % divisor).abs();
        let sign = if self.value < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0>width$}",
            sign,
            int_part,
            frac_part,
            width = self.scale as usize
        )
    }
}

/// Error returned when a string is not a valid decimal literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError(String);

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal '{}'", self.0)
    }
}

impl std::error::Error for ParseDecimalError {}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac_part.len() > Self::MAX_SCALE as usize {
            return Err(invalid());
        }

        let mut value: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let digit = c.to_digit(10).ok_or_else(invalid)? as i128;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(invalid)?;
        }
        if negative {
            value = -value;
        }
        Ok(Self::new(value, frac_part.len() as u8))
    }
}
