use std::{fmt, str::FromStr};

use thiserror::Error;

/// Largest magnitude accepted when parsing an [`Amount`]: one trillion units.
pub const MAX_PARSED_CENTS: i64 = 100_000_000_000_000;

/// Signed amount represented as **integer cents**.
///
/// Every expense, budget and total goes through this type so sums never
/// drift the way floating point would.
///
/// # Examples
///
/// ```rust
/// use engine::Amount;
///
/// let amount: Amount = "12.5".parse().unwrap();
/// assert_eq!(amount.cents(), 1250);
/// assert_eq!(amount.to_string(), "12.50");
/// assert_eq!(Amount::new(1500).to_string(), "15");
/// ```
///
/// Parsing accepts `.` or `,` as decimal separator and any number of
/// decimals, rounded to the cent half away from zero:
///
/// ```rust
/// use engine::Amount;
///
/// assert_eq!("-3,2".parse::<Amount>().unwrap().cents(), -320);
/// assert_eq!("12.345".parse::<Amount>().unwrap().cents(), 1235);
/// assert_eq!(".5".parse::<Amount>().unwrap().cents(), 50);
/// assert!("abc".parse::<Amount>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Amount(i64);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount")]
    Invalid,
    #[error("amount too large")]
    Overflow,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Divides by `count` and rounds to whole currency units, half up
    /// (towards positive infinity). Returns `None` when `count` is 0.
    ///
    /// ```rust
    /// use engine::Amount;
    ///
    /// assert_eq!(Amount::new(15_000).average_units(2), Some(75));
    /// assert_eq!(Amount::new(250).average_units(1), Some(3));
    /// assert_eq!(Amount::new(-250).average_units(1), Some(-2));
    /// assert_eq!(Amount::new(100).average_units(0), None);
    /// ```
    #[must_use]
    pub fn average_units(self, count: u32) -> Option<i64> {
        if count == 0 {
            return None;
        }
        // floor(x + 1/2) with x = cents / (count * 100), kept in integers.
        let denominator = i128::from(count) * 100;
        let numerator = 2 * i128::from(self.0) + denominator;
        let rounded = numerator.div_euclid(2 * denominator);
        i64::try_from(rounded).ok()
    }
}

impl fmt::Display for Amount {
    /// Whole amounts render without a fraction (`15`), the rest with two
    /// digits (`12.50`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        if cents == 0 {
            write!(f, "{sign}{units}")
        } else {
            write!(f, "{sign}{units}.{cents:02}")
        }
    }
}

fn digit(b: u8) -> i64 {
    i64::from(b - b'0')
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses a decimal string into cents.
    ///
    /// - optional leading `+`/`-`
    /// - `.` or `,` as decimal separator; either side may be empty, not both
    /// - extra decimals round to the cent, half away from zero
    /// - magnitude at most [`MAX_PARSED_CENTS`]
    /// - no whitespace, no currency symbols, no exponent
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (negative, rest) = if let Some(stripped) = s.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = s.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, s)
        };
        if rest.is_empty() {
            return Err(AmountError::Empty);
        }

        let (units_str, frac) = rest.split_once(['.', ',']).unwrap_or((rest, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (units_str.is_empty() && frac.is_empty()) || !all_digits(units_str) || !all_digits(frac)
        {
            return Err(AmountError::Invalid);
        }

        let units: i64 = match units_str {
            "" => 0,
            digits => digits.parse().map_err(|_| AmountError::Overflow)?,
        };

        let frac = frac.as_bytes();
        let mut cents = frac.first().map_or(0, |&b| digit(b) * 10)
            + frac.get(1).map_or(0, |&b| digit(b));
        if frac.get(2).is_some_and(|&b| b >= b'5') {
            cents += 1;
        }

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .filter(|v| *v <= MAX_PARSED_CENTS)
            .ok_or(AmountError::Overflow)?;

        Ok(Amount(if negative { -total } else { total }))
    }
}
