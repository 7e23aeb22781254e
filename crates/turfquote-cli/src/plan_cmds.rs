//! CLI handlers for `turfquote plan` subcommands.
//!
//! - `turfquote plan list`                     -- plans and their features
//! - `turfquote plan price <slug> --sq-ft <n>` -- seasonal price for a lawn

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use turfquote_core::catalog::{Catalog, SubscriptionPlan};
use turfquote_core::pricing::{Resolution, compute_seasonal_price};

use crate::PlanCommands;
use crate::quote_cmds::{footage_arg, format_money};

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub fn run_plan_command(command: PlanCommands, catalog: &Catalog) -> Result<()> {
    match command {
        PlanCommands::List => {
            print!("{}", render_plan_list(catalog.plans()));
            Ok(())
        }
        PlanCommands::Price { slug, sq_ft, json } => {
            cmd_price(catalog, &slug, sq_ft.as_deref(), json)
        }
    }
}

/// Seasonal price of one plan, as printed with `--json` and returned by
/// the HTTP API.
#[derive(Debug, Serialize)]
pub struct PlanPrice {
    pub slug: String,
    pub name: String,
    pub square_footage: Option<u32>,
    #[serde(flatten)]
    pub resolution: Resolution,
    /// Lower bound of the plan's first seasonal bracket.
    #[serde(skip)]
    pub minimum_sq_ft: Option<u32>,
}

/// Price `plan` for an optional footage. No footage prices like one below
/// the smallest bracket.
pub fn price_plan(plan: &SubscriptionPlan, footage: Option<u32>) -> PlanPrice {
    let resolution = match footage {
        Some(sq_ft) => compute_seasonal_price(sq_ft, plan),
        None => Resolution::BelowMinimum,
    };
    PlanPrice {
        slug: plan.slug.clone(),
        name: plan.name.clone(),
        square_footage: footage,
        resolution,
        minimum_sq_ft: plan.seasonal_base_brackets.first().map(|b| b.min_sq_ft),
    }
}

fn cmd_price(catalog: &Catalog, slug: &str, sq_ft: Option<&str>, json: bool) -> Result<()> {
    let plan = catalog
        .plan(slug)
        .with_context(|| format!("plan not found: {slug}"))?;
    let footage = footage_arg(sq_ft)?;
    let price = price_plan(plan, footage);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&price).context("failed to serialize plan price")?
        );
    } else {
        print!("{}", render_plan_price(&price));
    }
    Ok(())
}

pub fn render_plan_list(plans: &[SubscriptionPlan]) -> String {
    if plans.is_empty() {
        return "No plans in catalog.\n".to_owned();
    }

    let mut out = String::new();
    for plan in plans {
        let badge = if plan.popular { "  [most popular]" } else { "" };
        let _ = writeln!(out, "{} ({}){badge}", plan.name, plan.slug);
        if !plan.description.is_empty() {
            let _ = writeln!(out, "  {}", plan.description);
        }
        for feature in &plan.features {
            let _ = writeln!(out, "  - {feature}");
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_plan_price(price: &PlanPrice) -> String {
    match price.resolution {
        Resolution::Priced { amount } => format!(
            "{}: estimated seasonal price {} for {} sq ft (mid March to mid October)\n",
            price.name,
            format_money(amount),
            price.square_footage.unwrap_or_default(),
        ),
        Resolution::RequiresContact => format!(
            "{}: for lawns 5000 sq ft or larger, please contact us for a custom quote.\n",
            price.name
        ),
        Resolution::BelowMinimum => match price.minimum_sq_ft {
            Some(minimum) => format!(
                "{}: minimum {minimum} sq ft for online pricing.\n",
                price.name
            ),
            None => format!("{}: no online pricing for this plan.\n", price.name),
        },
    }
}
