//! Square-footage brackets and the lookup that resolves a footage to a
//! bracket price.

use serde::{Deserialize, Serialize};

use super::{CONTACT_CEILING_SQ_FT, Resolution};

/// A contiguous, inclusive square-footage range mapped to a fixed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub min_sq_ft: u32,
    pub max_sq_ft: u32,
    /// Whole currency units.
    pub price: u32,
}

impl Bracket {
    pub const fn new(min_sq_ft: u32, max_sq_ft: u32, price: u32) -> Self {
        Self {
            min_sq_ft,
            max_sq_ft,
            price,
        }
    }

    /// Whether `sq_ft` falls inside this bracket, bounds included.
    pub fn contains(&self, sq_ft: u32) -> bool {
        self.min_sq_ft <= sq_ft && sq_ft <= self.max_sq_ft
    }
}

/// Resolve a footage against an ascending bracket table.
///
/// Footage at or above [`CONTACT_CEILING_SQ_FT`] always needs a custom
/// quote, whatever the table says. Otherwise the first bracket containing
/// the footage wins; footage no bracket covers (anything under the lowest
/// bracket) is [`Resolution::BelowMinimum`].
pub fn resolve(sq_ft: u32, brackets: &[Bracket]) -> Resolution {
    if sq_ft >= CONTACT_CEILING_SQ_FT {
        return Resolution::RequiresContact;
    }

    brackets
        .iter()
        .find(|b| b.contains(sq_ft))
        .map_or(Resolution::BelowMinimum, |b| Resolution::Priced {
            amount: b.price,
        })
}
