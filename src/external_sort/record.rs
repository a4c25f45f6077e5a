use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use crate::constants::*;

/// Why a candidate record line could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("too few fields: found {0}, need at least 3")]
    TooFewFields(usize),
    #[error("invalid id: {0:?}")]
    InvalidId(String),
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),
    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}

/// What a raw line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank line, header, or anything else not starting with a digit.
    NonRecord,
    Record(Product),
    Malformed(ParseFailure),
}

/// Fixed-point decimal: `units / 10^scale`.
///
/// The scale seen in the source is preserved so that `2.50` is written back
/// as `2.50`. Equality is structural, so `2.5` and `2.50` are different
/// values that compare equal under `numeric_cmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Price {
    units: i64,
    scale: u32,
}

impl Price {
    pub fn new(units: i64, scale: u32) -> Option<Self> {
        if scale > MAX_PRICE_SCALE {
            return None;
        }
        Some(Self { units, scale })
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Compares by value only.
    pub fn numeric_cmp(&self, other: &Self) -> Ordering {
        let common = self.scale.max(other.scale);
        self.scaled_to(common).cmp(&other.scaled_to(common))
    }

    fn scaled_to(&self, scale: u32) -> i128 {
        self.units as i128 * 10i128.pow(scale - self.scale)
    }
}

impl FromStr for Price {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFailure::InvalidPrice(s.to_string());
        let trimmed = s.trim();

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let scale = u32::try_from(fraction.len()).map_err(|_| invalid())?;
        if scale > MAX_PRICE_SCALE {
            return Err(invalid());
        }

        let mut units: i64 = 0;
        for b in whole.bytes().chain(fraction.bytes()) {
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(i64::from(b - b'0')))
                .ok_or_else(invalid)?;
        }
        if negative {
            units = -units;
        }

        Ok(Self { units, scale })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.units < 0 { "-" } else { "" };
        let magnitude = self.units.unsigned_abs();
        if self.scale == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        let divisor = 10u64.pow(self.scale);
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / divisor,
            magnitude % divisor,
            width = self.scale as usize
        )
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Price,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: Price) -> Self {
        Self { id, name: name.into(), price }
    }

    /// Classifies a raw line: non-record lines are told apart from malformed
    /// ones so that the two can be counted separately.
    pub fn classify_line(line: &str) -> LineOutcome {
        let line = strip_line_terminator(line);
        if !is_record_line(line) {
            return LineOutcome::NonRecord;
        }
        match Self::decode(line) {
            Ok(product) => LineOutcome::Record(product),
            Err(failure) => LineOutcome::Malformed(failure),
        }
    }

    pub fn decode(line: &str) -> Result<Self, ParseFailure> {
        let line = strip_line_terminator(line);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_RECORD_FIELDS {
            return Err(ParseFailure::TooFewFields(fields.len()));
        }

        let id = fields[0]
            .trim()
            .parse::<i64>()
            .map_err(|_| ParseFailure::InvalidId(fields[0].to_string()))?;
        let price = fields[2].parse::<Price>()?;

        Ok(Self { id, name: fields[1].to_string(), price })
    }

    pub fn encode(&self) -> String {
        format!("{}{sep}{}{sep}{}", self.id, self.name, self.price, sep = FIELD_SEPARATOR)
    }
}

/// Classifies a raw line that may not be valid UTF-8. Undecodable bytes on a
/// line that looks like a record count as malformed.
pub fn classify_bytes(bytes: &[u8]) -> LineOutcome {
    match std::str::from_utf8(bytes) {
        Ok(line) => Product::classify_line(line),
        Err(_) => match bytes.first() {
            Some(b) if b.is_ascii_digit() => LineOutcome::Malformed(ParseFailure::InvalidEncoding),
            _ => LineOutcome::NonRecord,
        },
    }
}

/// A line is a record candidate only if its first character is a digit.
pub fn is_record_line(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn strip_line_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}
