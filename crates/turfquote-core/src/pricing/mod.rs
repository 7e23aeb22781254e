//! Pricing: bracket lookup, instant quotes, and seasonal plan prices.
//!
//! Everything here is a pure function of its inputs and the catalog. No
//! outcome is an error: a footage either prices, falls below the smallest
//! bracket, or needs a custom quote.

pub mod bracket;
pub mod quote;
pub mod seasonal;

use serde::Serialize;

pub use bracket::{Bracket, resolve};
pub use quote::{
    ContactReason, LinePrice, QuoteLine, QuoteRequest, QuoteResult, ServiceEstimate,
    compute_quote, estimate_services,
};
pub use seasonal::{PREMIUM_SURCHARGE_PERCENT, apply_premium_surcharge, compute_seasonal_price};

/// Footage at or above which every service and plan needs a custom quote.
pub const CONTACT_CEILING_SQ_FT: u32 = 5000;

/// Outcome of pricing a footage against a bracket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// A bracket matched.
    Priced { amount: u32 },
    /// No bracket covers the footage; too small to price online.
    BelowMinimum,
    /// The footage is at or above the ceiling; a person must quote it.
    RequiresContact,
}

impl Resolution {
    /// The price, if one was resolved.
    pub fn amount(&self) -> Option<u32> {
        match self {
            Self::Priced { amount } => Some(*amount),
            Self::BelowMinimum | Self::RequiresContact => None,
        }
    }
}
