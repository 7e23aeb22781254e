//! TOML format types for catalog files.
//!
//! These types map directly to the `catalog.toml` on-disk format. They are
//! deliberately loose (string `kind`, optional brackets) so that
//! [`super::parser`] can report precise validation errors.

use serde::{Deserialize, Serialize};

use crate::pricing::Bracket;

/// Top-level structure of a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogToml {
    /// Shared seasonal base-price table, inherited by plans that do not
    /// define their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonal: Option<SeasonalToml>,
    #[serde(default)]
    pub services: Vec<ServiceToml>,
    #[serde(default)]
    pub plans: Vec<PlanToml>,
}

/// The `[seasonal]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalToml {
    pub brackets: Vec<Bracket>,
}

/// A single `[[services]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceToml {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// `"tiered"` or `"contact"`.
    pub kind: String,
    /// Required for tiered services, forbidden for contact services.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brackets: Vec<Bracket>,
}

/// A single `[[plans]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanToml {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Premium plans carry the seasonal surcharge.
    #[serde(default)]
    pub premium: bool,
    /// Highlighted as "Most Popular" on the plan cards.
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub features: Vec<String>,
    /// Overrides the catalog-level `[seasonal]` table for this plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonal_brackets: Option<Vec<Bracket>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_catalog() {
        let toml_str = r#"
[[services]]
id = "mow"
label = "Mow"
kind = "tiered"
brackets = [{ min_sq_ft = 100, max_sq_ft = 999, price = 40 }]
"#;
        let catalog: CatalogToml = toml::from_str(toml_str).expect("should parse");
        assert!(catalog.seasonal.is_none());
        assert!(catalog.plans.is_empty());
        assert_eq!(catalog.services.len(), 1);
        assert_eq!(catalog.services[0].description, "");
        assert_eq!(
            catalog.services[0].brackets,
            vec![Bracket::new(100, 999, 40)]
        );
    }

    #[test]
    fn plan_flags_default_to_false() {
        let toml_str = r#"
[[plans]]
slug = "basic"
name = "Basic"
"#;
        let catalog: CatalogToml = toml::from_str(toml_str).expect("should parse");
        let plan = &catalog.plans[0];
        assert!(!plan.premium);
        assert!(!plan.popular);
        assert!(plan.features.is_empty());
        assert!(plan.seasonal_brackets.is_none());
    }

    #[test]
    fn contact_service_needs_no_brackets() {
        let toml_str = r#"
[[services]]
id = "cleanup"
label = "Cleanup"
kind = "contact"
"#;
        let catalog: CatalogToml = toml::from_str(toml_str).expect("should parse");
        assert!(catalog.services[0].brackets.is_empty());
    }

    #[test]
    fn embedded_catalog_deserializes() {
        let catalog: CatalogToml =
            toml::from_str(super::super::BUILTIN_CATALOG_TOML).expect("embedded catalog");
        assert_eq!(catalog.services.len(), 6);
        assert_eq!(catalog.plans.len(), 2);
        assert_eq!(catalog.seasonal.map(|s| s.brackets.len()), Some(6));
    }
}
