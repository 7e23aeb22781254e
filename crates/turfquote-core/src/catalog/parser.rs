//! Catalog TOML parser with validation.
//!
//! Parses a catalog file into a [`Catalog`] and checks:
//! - Service IDs and plan slugs are unique.
//! - `kind` is `tiered` or `contact`; only tiered services have brackets.
//! - Every bracket table is ascending, contiguous, and stops below the
//!   contact ceiling.
//! - Every plan ends up with a seasonal table, its own or the shared one.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use super::toml_format::CatalogToml;
use super::{Catalog, ServiceDefinition, ServiceKind, SubscriptionPlan};
use crate::pricing::{Bracket, CONTACT_CEILING_SQ_FT};

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("duplicate service id: {0:?}")]
    DuplicateServiceId(String),

    #[error("duplicate plan slug: {0:?}")]
    DuplicatePlanSlug(String),

    #[error("invalid kind {value:?} on service {service:?} (expected tiered or contact)")]
    InvalidKind { service: String, value: String },

    #[error("tiered service {0:?} has no brackets")]
    MissingBrackets(String),

    #[error("contact service {0:?} must not define brackets")]
    UnexpectedBrackets(String),

    #[error("{table}: bracket {min}-{max} has min above max")]
    InvertedBracket { table: String, min: u32, max: u32 },

    #[error("{table}: bracket starting at {min} overlaps or precedes the bracket ending at {previous_max}")]
    OverlappingBrackets {
        table: String,
        min: u32,
        previous_max: u32,
    },

    #[error("{table}: gap between {previous_max} and {min}")]
    BracketGap {
        table: String,
        previous_max: u32,
        min: u32,
    },

    #[error("{table}: bracket ending at {max} reaches the {ceiling} sq ft custom-quote ceiling")]
    BracketAboveCeiling { table: String, max: u32, ceiling: u32 },

    #[error("plan {0:?} has no seasonal brackets and the catalog has no [seasonal] table")]
    MissingSeasonalBrackets(String),
}

/// Parse and validate a catalog TOML string.
pub fn parse_catalog_toml(content: &str) -> Result<Catalog, CatalogError> {
    let raw: CatalogToml = toml::from_str(content)?;
    build(raw)
}

fn build(raw: CatalogToml) -> Result<Catalog, CatalogError> {
    let shared_seasonal = match raw.seasonal {
        Some(seasonal) => {
            validate_brackets("seasonal", &seasonal.brackets)?;
            Some(seasonal.brackets)
        }
        None => None,
    };

    let mut seen = HashSet::new();
    let mut services = Vec::with_capacity(raw.services.len());
    for svc in raw.services {
        if !seen.insert(svc.id.clone()) {
            return Err(CatalogError::DuplicateServiceId(svc.id));
        }

        let kind = match svc.kind.as_str() {
            "tiered" => {
                if svc.brackets.is_empty() {
                    return Err(CatalogError::MissingBrackets(svc.id));
                }
                validate_brackets(&format!("service {}", svc.id), &svc.brackets)?;
                ServiceKind::Tiered {
                    brackets: svc.brackets,
                }
            }
            "contact" => {
                if !svc.brackets.is_empty() {
                    return Err(CatalogError::UnexpectedBrackets(svc.id));
                }
                ServiceKind::ContactRequired
            }
            other => {
                return Err(CatalogError::InvalidKind {
                    service: svc.id,
                    value: other.to_owned(),
                });
            }
        };

        services.push(ServiceDefinition {
            id: svc.id,
            label: svc.label,
            description: svc.description,
            kind,
        });
    }

    let mut seen = HashSet::new();
    let mut plans = Vec::with_capacity(raw.plans.len());
    for plan in raw.plans {
        if !seen.insert(plan.slug.clone()) {
            return Err(CatalogError::DuplicatePlanSlug(plan.slug));
        }

        let brackets = match plan.seasonal_brackets {
            Some(own) => {
                validate_brackets(&format!("plan {}", plan.slug), &own)?;
                own
            }
            None => shared_seasonal
                .clone()
                .ok_or_else(|| CatalogError::MissingSeasonalBrackets(plan.slug.clone()))?,
        };
        if brackets.is_empty() {
            return Err(CatalogError::MissingSeasonalBrackets(plan.slug));
        }

        plans.push(SubscriptionPlan {
            slug: plan.slug,
            name: plan.name,
            description: plan.description,
            features: plan.features,
            popular: plan.popular,
            is_premium_tier: plan.premium,
            seasonal_base_brackets: brackets,
        });
    }

    Ok(Catalog::from_parts(services, plans))
}

/// Check a bracket table is ascending, contiguous, and below the ceiling.
fn validate_brackets(table: &str, brackets: &[Bracket]) -> Result<(), CatalogError> {
    let mut previous: Option<&Bracket> = None;

    for bracket in brackets {
        if bracket.min_sq_ft > bracket.max_sq_ft {
            return Err(CatalogError::InvertedBracket {
                table: table.to_owned(),
                min: bracket.min_sq_ft,
                max: bracket.max_sq_ft,
            });
        }
        if bracket.max_sq_ft >= CONTACT_CEILING_SQ_FT {
            return Err(CatalogError::BracketAboveCeiling {
                table: table.to_owned(),
                max: bracket.max_sq_ft,
                ceiling: CONTACT_CEILING_SQ_FT,
            });
        }

        if let Some(prev) = previous {
            if bracket.min_sq_ft <= prev.max_sq_ft {
                return Err(CatalogError::OverlappingBrackets {
                    table: table.to_owned(),
                    min: bracket.min_sq_ft,
                    previous_max: prev.max_sq_ft,
                });
            }
            if bracket.min_sq_ft != prev.max_sq_ft + 1 {
                return Err(CatalogError::BracketGap {
                    table: table.to_owned(),
                    previous_max: prev.max_sq_ft,
                    min: bracket.min_sq_ft,
                });
            }
        }
        previous = Some(bracket);
    }

    Ok(())
}
