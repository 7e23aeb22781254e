//! Seasonal subscription pricing.

use crate::catalog::SubscriptionPlan;

use super::{Resolution, resolve};

/// Surcharge applied to premium plans, in percent of the base price.
pub const PREMIUM_SURCHARGE_PERCENT: u32 = 30;

/// Price a seasonal plan for a lawn of `sq_ft` square feet.
///
/// The base price comes from the plan's seasonal bracket table; premium
/// plans add [`PREMIUM_SURCHARGE_PERCENT`] on top.
pub fn compute_seasonal_price(sq_ft: u32, plan: &SubscriptionPlan) -> Resolution {
    match resolve(sq_ft, &plan.seasonal_base_brackets) {
        Resolution::Priced { amount } if plan.is_premium_tier => Resolution::Priced {
            amount: apply_premium_surcharge(amount),
        },
        other => other,
    }
}

/// `base * 1.30`, rounded half up to a whole currency unit.
///
/// Integer arithmetic keeps ties exact (`x.5` always rounds up).
pub fn apply_premium_surcharge(base: u32) -> u32 {
    let scaled = u64::from(base) * u64::from(100 + PREMIUM_SURCHARGE_PERCENT) + 50;
    u32::try_from(scaled / 100).unwrap_or(u32::MAX)
}
