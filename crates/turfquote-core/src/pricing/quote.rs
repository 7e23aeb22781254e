//! Instant quotes over a selection of catalog services.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::{Catalog, ServiceDefinition, ServiceKind};

use super::{Resolution, resolve};

/// What the customer entered: an optional footage and the services they
/// ticked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteRequest {
    /// `None` when the footage field is empty.
    pub square_footage: Option<u32>,
    pub selected_service_ids: BTreeSet<String>,
}

impl QuoteRequest {
    pub fn new<I, S>(square_footage: Option<u32>, selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            square_footage,
            selected_service_ids: selected.into_iter().map(Into::into).collect(),
        }
    }
}

/// Why a service could not be priced online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactReason {
    /// The service is always quoted by hand.
    Consultation,
    /// The property is at or above the online ceiling.
    AboveCeiling,
    /// The footage is missing or under the smallest bracket.
    BelowMinimum,
}

/// Price of one service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinePrice {
    Priced { amount: u32 },
    ContactRequired { reason: ContactReason },
}

impl LinePrice {
    pub fn amount(&self) -> Option<u32> {
        match self {
            Self::Priced { amount } => Some(*amount),
            Self::ContactRequired { .. } => None,
        }
    }
}

/// A selected service and its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub service_id: String,
    pub label: String,
    #[serde(flatten)]
    pub price: LinePrice,
}

/// Per-service breakdown plus the running total.
///
/// `total` only sums priced lines. `overall_contact_required` is set when
/// any selected line could not be priced, whatever the reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuoteResult {
    pub lines: Vec<QuoteLine>,
    pub total: u32,
    pub overall_contact_required: bool,
}

impl QuoteResult {
    /// The line for `service_id`, if it was selected.
    pub fn line(&self, service_id: &str) -> Option<&QuoteLine> {
        self.lines.iter().find(|l| l.service_id == service_id)
    }
}

/// Estimate shown next to a service before it is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEstimate {
    pub service_id: String,
    pub label: String,
    pub description: String,
    #[serde(flatten)]
    pub estimate: LinePrice,
}

fn price_service(service: &ServiceDefinition, square_footage: Option<u32>) -> LinePrice {
    let brackets = match &service.kind {
        ServiceKind::ContactRequired => {
            return LinePrice::ContactRequired {
                reason: ContactReason::Consultation,
            };
        }
        ServiceKind::Tiered { brackets } => brackets,
    };

    let resolution = match square_footage {
        Some(sq_ft) => resolve(sq_ft, brackets),
        None => Resolution::BelowMinimum,
    };

    match resolution {
        Resolution::Priced { amount } => LinePrice::Priced { amount },
        Resolution::BelowMinimum => LinePrice::ContactRequired {
            reason: ContactReason::BelowMinimum,
        },
        Resolution::RequiresContact => LinePrice::ContactRequired {
            reason: ContactReason::AboveCeiling,
        },
    }
}

/// Price every selected service and total the ones that resolve.
///
/// Lines follow catalog order. Selected IDs that are not in the catalog
/// are ignored.
pub fn compute_quote(request: &QuoteRequest, catalog: &Catalog) -> QuoteResult {
    let mut result = QuoteResult::default();

    for service in catalog.services() {
        if !request.selected_service_ids.contains(&service.id) {
            continue;
        }

        let price = price_service(service, request.square_footage);
        match price {
            LinePrice::Priced { amount } => result.total = result.total.saturating_add(amount),
            LinePrice::ContactRequired { .. } => result.overall_contact_required = true,
        }

        result.lines.push(QuoteLine {
            service_id: service.id.clone(),
            label: service.label.clone(),
            price,
        });
    }

    result
}

/// Estimate every catalog service for the given footage, selected or not.
pub fn estimate_services(square_footage: Option<u32>, catalog: &Catalog) -> Vec<ServiceEstimate> {
    catalog
        .services()
        .iter()
        .map(|service| ServiceEstimate {
            service_id: service.id.clone(),
            label: service.label.clone(),
            description: service.description.clone(),
            estimate: price_service(service, square_footage),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().expect("embedded catalog should be valid")
    }

    #[test]
    fn unselected_services_produce_no_lines() {
        let result = compute_quote(&QuoteRequest::new(Some(1200), ["hedge-trimming"]), &catalog());
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].service_id, "hedge-trimming");
        assert_eq!(result.total, 100);
        assert!(!result.overall_contact_required);
    }

    #[test]
    fn empty_selection_is_an_empty_quote() {
        let result = compute_quote(&QuoteRequest::new(Some(1200), Vec::<String>::new()), &catalog());
        assert_eq!(result, QuoteResult::default());
    }

    #[test]
    fn lines_follow_catalog_order() {
        let request = QuoteRequest::new(
            Some(800),
            ["garden-edging", "lawn-cutting", "seeding-aeration"],
        );
        let result = compute_quote(&request, &catalog());
        let ids: Vec<&str> = result.lines.iter().map(|l| l.service_id.as_str()).collect();
        assert_eq!(ids, ["lawn-cutting", "seeding-aeration", "garden-edging"]);
        assert_eq!(result.total, 150 + 200 + 30);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let request = QuoteRequest::new(Some(1200), ["lawn-cutting", "snow-removal"]);
        let result = compute_quote(&request, &catalog());
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.total, 175);
        assert!(!result.overall_contact_required);
    }

    #[test]
    fn contact_service_line_carries_consultation_reason() {
        let request = QuoteRequest::new(Some(1200), ["hardscaping"]);
        let result = compute_quote(&request, &catalog());
        assert_eq!(
            result.line("hardscaping").map(|l| l.price),
            Some(LinePrice::ContactRequired {
                reason: ContactReason::Consultation
            })
        );
        assert_eq!(result.total, 0);
        assert!(result.overall_contact_required);
    }

    #[test]
    fn small_footage_requires_contact_for_tiered_service() {
        let request = QuoteRequest::new(Some(50), ["lawn-cutting"]);
        let result = compute_quote(&request, &catalog());
        assert_eq!(
            result.line("lawn-cutting").map(|l| l.price),
            Some(LinePrice::ContactRequired {
                reason: ContactReason::BelowMinimum
            })
        );
        assert_eq!(result.total, 0);
        assert!(result.overall_contact_required);
    }

    #[test]
    fn missing_footage_requires_contact_for_tiered_service() {
        let request = QuoteRequest::new(None, ["lawn-cutting"]);
        let result = compute_quote(&request, &catalog());
        assert!(result.overall_contact_required);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn large_footage_line_reason_is_above_ceiling() {
        let request = QuoteRequest::new(Some(5000), ["hedge-trimming"]);
        let result = compute_quote(&request, &catalog());
        assert_eq!(
            result.line("hedge-trimming").map(|l| l.price),
            Some(LinePrice::ContactRequired {
                reason: ContactReason::AboveCeiling
            })
        );
    }

    #[test]
    fn estimates_cover_every_service() {
        let estimates = estimate_services(Some(2500), &catalog());
        assert_eq!(estimates.len(), 6);
        let amounts: Vec<Option<u32>> = estimates.iter().map(|e| e.estimate.amount()).collect();
        assert_eq!(
            amounts,
            [Some(225), Some(150), Some(375), Some(75), None, None]
        );
    }

    #[test]
    fn quote_line_serializes_flat() {
        let line = QuoteLine {
            service_id: "lawn-cutting".to_owned(),
            label: "Lawn Cutting".to_owned(),
            price: LinePrice::Priced { amount: 175 },
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "service_id": "lawn-cutting",
                "label": "Lawn Cutting",
                "status": "priced",
                "amount": 175,
            })
        );
    }
}
