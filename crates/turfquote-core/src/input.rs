//! Square-footage input handling.
//!
//! The footage box accepts digits only. An empty box means "no estimate
//! yet", which the pricing functions treat like a footage too small to
//! price.

use std::fmt;

use thiserror::Error;

use crate::catalog::Catalog;
use crate::pricing::CONTACT_CEILING_SQ_FT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FootageInputError {
    #[error("square footage must be a whole number, got {0:?}")]
    NotNumeric(String),
}

/// Parse a raw footage field.
///
/// Whitespace around the value is ignored. Digit strings too long for a
/// `u32` saturate, since they are far past the custom-quote ceiling anyway.
pub fn parse_footage(raw: &str) -> Result<Option<u32>, FootageInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FootageInputError::NotNumeric(raw.to_owned()));
    }
    Ok(Some(trimmed.parse().unwrap_or(u32::MAX)))
}

/// A hint shown under the footage box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootageNotice {
    /// Something was entered but it is under the smallest priced bracket.
    BelowOnlineMinimum { minimum: u32 },
    /// The property is large enough to need a custom quote.
    CustomQuoteRequired,
}

impl fmt::Display for FootageNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowOnlineMinimum { minimum } => {
                write!(f, "Minimum {minimum} sq ft for online pricing.")
            }
            Self::CustomQuoteRequired => f.write_str(
                "For properties 5,000 sq ft or larger, a custom quote is required for accuracy.",
            ),
        }
    }
}

/// Which notice, if any, applies to `footage` under `catalog`'s bracket
/// tables. Zero and empty input get none.
pub fn footage_notice(footage: Option<u32>, catalog: &Catalog) -> Option<FootageNotice> {
    match footage? {
        0 => None,
        f if f >= CONTACT_CEILING_SQ_FT => Some(FootageNotice::CustomQuoteRequired),
        f => match catalog.online_minimum_sq_ft() {
            Some(minimum) if f < minimum => Some(FootageNotice::BelowOnlineMinimum { minimum }),
            _ => None,
        },
    }
}
