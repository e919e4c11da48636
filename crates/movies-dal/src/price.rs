use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize, de};

const MIN_PRICE: Price = Price::from_cents(100);
const MAX_PRICE: Price = Price::from_cents(100_00);

/// Money amount with two fractional digits, kept as hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePriceError {
    #[error("Price is empty")]
    Empty,
    #[error("Price is not a valid number")]
    InvalidNumber,
    #[error("Price can have at most two decimal places")]
    TooPrecise,
    #[error("Price is too large")]
    Overflow,
}

impl Price {
    pub const fn from_cents(cents: i64) -> Self {
        Price(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParsePriceError::Empty);
        }
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParsePriceError::InvalidNumber);
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(ParsePriceError::InvalidNumber);
        }
        if fraction.len() > 2 {
            return Err(ParsePriceError::TooPrecise);
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParsePriceError::Overflow)?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| ParsePriceError::InvalidNumber)? * 10,
            _ => fraction.parse().map_err(|_| ParsePriceError::InvalidNumber)?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or(ParsePriceError::Overflow)?;

        Ok(Price(if negative { -cents } else { cents }))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

struct PriceVisitor;

impl de::Visitor<'_> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("decimal number with at most two decimal places")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        v.checked_mul(100)
            .map(Price)
            .ok_or_else(|| E::custom(ParsePriceError::Overflow))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(ParsePriceError::Overflow))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // Shortest round-trip representation of the float, so 9.99 stays 9.99
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(PriceVisitor)
    }
}

/// Range rule for [`Price`]: 1 to 100 inclusive.
pub fn price_in_range(value: &Price, _ctx: &()) -> garde::Result {
    if (MIN_PRICE..=MAX_PRICE).contains(value) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "must be between {MIN_PRICE} and {MAX_PRICE}"
        )))
    }
}
