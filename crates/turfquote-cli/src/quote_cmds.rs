//! `turfquote services` and `turfquote quote`.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use turfquote_core::catalog::Catalog;
use turfquote_core::input::{FootageNotice, footage_notice, parse_footage};
use turfquote_core::pricing::{
    ContactReason, LinePrice, QuoteRequest, QuoteResult, ServiceEstimate, compute_quote,
    estimate_services,
};

/// Parse a `--sq-ft` value, naming the flag in the error.
pub fn footage_arg(raw: Option<&str>) -> Result<Option<u32>> {
    match raw {
        Some(raw) => parse_footage(raw).context("invalid --sq-ft"),
        None => Ok(None),
    }
}

/// `$1,234`
pub fn format_money(amount: u32) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn describe(price: &LinePrice) -> String {
    match price {
        LinePrice::Priced { amount } => format_money(*amount),
        LinePrice::ContactRequired {
            reason: ContactReason::Consultation,
        } => "contact for pricing".to_owned(),
        LinePrice::ContactRequired {
            reason: ContactReason::AboveCeiling,
        } => "custom quote required".to_owned(),
        LinePrice::ContactRequired {
            reason: ContactReason::BelowMinimum,
        } => "enter sufficient square footage".to_owned(),
    }
}

pub fn render_services(estimates: &[ServiceEstimate], notice: Option<FootageNotice>) -> String {
    let mut out = String::new();
    let id_width = estimates
        .iter()
        .map(|e| e.service_id.len())
        .max()
        .unwrap_or(0);

    for e in estimates {
        let _ = writeln!(
            out,
            "  {:<id_width$}  {:<28}  {}",
            e.service_id,
            describe(&e.estimate),
            e.label
        );
    }
    if let Some(notice) = notice {
        let _ = writeln!(out);
        let _ = writeln!(out, "Note: {notice}");
    }
    out
}

pub fn render_quote(
    result: &QuoteResult,
    footage: Option<u32>,
    notice: Option<FootageNotice>,
) -> String {
    let mut out = String::new();
    match footage {
        Some(sq_ft) => {
            let _ = writeln!(out, "Quote for {sq_ft} sq ft");
        }
        None => {
            let _ = writeln!(out, "Quote (no square footage entered)");
        }
    }
    let _ = writeln!(out);

    if result.lines.is_empty() {
        let _ = writeln!(out, "  No known services selected.");
    }
    for line in &result.lines {
        let _ = writeln!(out, "  {:<36} {}", line.label, describe(&line.price));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<36} {}", "Estimated total", format_money(result.total));
    if result.overall_contact_required {
        let _ = writeln!(
            out,
            "  Some selected services need a custom quote; we will contact you."
        );
    }
    if let Some(notice) = notice {
        let _ = writeln!(out, "  Note: {notice}");
    }
    out
}

pub fn run_services(catalog: &Catalog, sq_ft: Option<&str>) -> Result<()> {
    let footage = footage_arg(sq_ft)?;
    let estimates = estimate_services(footage, catalog);
    let notice = footage_notice(footage, catalog);
    print!("{}", render_services(&estimates, notice));
    Ok(())
}

pub fn run_quote(catalog: &Catalog, sq_ft: Option<&str>, services: &[String], json: bool) -> Result<()> {
    let footage = footage_arg(sq_ft)?;
    for id in services {
        if catalog.service(id).is_none() {
            tracing::warn!(service = %id, "unknown service ignored");
        }
    }

    let request = QuoteRequest::new(footage, services.iter().cloned());
    let result = compute_quote(&request, catalog);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialize quote")?
        );
    } else {
        let notice = footage_notice(footage, catalog);
        print!("{}", render_quote(&result, footage, notice));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn money_gets_thousands_separators() {
        assert_eq!(format_money(0), "$0");
        assert_eq!(format_money(175), "$175");
        assert_eq!(format_money(3575), "$3,575");
        assert_eq!(format_money(1_234_567), "$1,234,567");
    }

    #[test]
    fn footage_arg_rejects_letters() {
        let err = footage_arg(Some("12ft")).unwrap_err();
        assert!(format!("{err:#}").contains("--sq-ft"));
        assert_eq!(footage_arg(None).unwrap(), None);
        assert_eq!(footage_arg(Some("")).unwrap(), None);
        assert_eq!(footage_arg(Some("1200")).unwrap(), Some(1200));
    }

    #[test]
    fn quote_text_lists_lines_and_total() {
        let request = QuoteRequest::new(Some(1200), ["lawn-cutting", "yard-cleanup"]);
        let catalog = catalog();
        let result = compute_quote(&request, &catalog);
        let text = render_quote(&result, Some(1200), footage_notice(Some(1200), &catalog));

        assert!(text.contains("Quote for 1200 sq ft"));
        assert!(text.contains("Lawn Cutting"));
        assert!(text.contains("$175"));
        assert!(text.contains("contact for pricing"));
        assert!(text.contains("custom quote"));
    }

    #[test]
    fn quote_text_explains_small_footage() {
        let request = QuoteRequest::new(Some(40), ["garden-edging"]);
        let catalog = catalog();
        let result = compute_quote(&request, &catalog);
        let text = render_quote(&result, Some(40), footage_notice(Some(40), &catalog));
        assert!(text.contains("enter sufficient square footage"));
        assert!(text.contains("Minimum 100 sq ft"));
    }

    #[test]
    fn services_text_flags_large_properties() {
        let catalog = catalog();
        let estimates = estimate_services(Some(7000), &catalog);
        let text = render_services(&estimates, footage_notice(Some(7000), &catalog));
        assert_eq!(text.matches("custom quote required").count(), 4);
        assert!(text.contains("5,000 sq ft or larger"));
    }

    #[test]
    fn services_text_uses_catalog_minimum() {
        let catalog = turfquote_core::catalog::parse_catalog_toml(
            r#"
[[services]]
id = "edging"
label = "Edging"
kind = "tiered"
brackets = [{ min_sq_ft = 50, max_sq_ft = 999, price = 30 }]
"#,
        )
        .unwrap();

        let estimates = estimate_services(Some(60), &catalog);
        let text = render_services(&estimates, footage_notice(Some(60), &catalog));
        assert!(text.contains("$30"));
        assert!(!text.contains("Note:"));

        let text = render_services(&[], footage_notice(Some(20), &catalog));
        assert!(text.contains("Minimum 50 sq ft"));
    }
}
