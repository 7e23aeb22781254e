//! The service and plan catalog: the single source of every bracket table.
//!
//! A [`Catalog`] is built once at startup, either from the embedded
//! `catalog.toml` or from an operator-supplied file, and then passed by
//! reference to the pricing functions. It is never mutated afterwards.

pub mod parser;
pub mod toml_format;

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::pricing::Bracket;

pub use parser::{CatalogError, parse_catalog_toml};
pub use toml_format::{CatalogToml, PlanToml, SeasonalToml, ServiceToml};

/// The catalog compiled into the binary.
pub(crate) static BUILTIN_CATALOG_TOML: &str = include_str!("catalog.toml");

/// How a service is priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceKind {
    /// Priced by footage bracket.
    Tiered { brackets: Vec<Bracket> },
    /// No formula; always quoted by hand.
    ContactRequired,
}

/// A purchasable one-off service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: ServiceKind,
}

impl ServiceDefinition {
    pub fn is_tiered(&self) -> bool {
        matches!(self.kind, ServiceKind::Tiered { .. })
    }
}

/// A seasonal care package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionPlan {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub popular: bool,
    pub is_premium_tier: bool,
    /// Flat fee for the whole season, by footage.
    pub seasonal_base_brackets: Vec<Bracket>,
}

/// Validated services and plans, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    services: Vec<ServiceDefinition>,
    plans: Vec<SubscriptionPlan>,
}

impl Catalog {
    /// Assemble a catalog from parts that have already been validated.
    pub(crate) fn from_parts(services: Vec<ServiceDefinition>, plans: Vec<SubscriptionPlan>) -> Self {
        Self { services, plans }
    }

    /// Parse the catalog embedded in the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        parse_catalog_toml(BUILTIN_CATALOG_TOML)
    }

    /// Read and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = parse_catalog_toml(&content)?;
        info!(
            path = %path.display(),
            services = catalog.services.len(),
            plans = catalog.plans.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Load `path` when given, otherwise fall back to the embedded catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.plans
    }

    /// Look up a service by ID.
    pub fn service(&self, id: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Look up a plan by slug. `None` means "plan not found".
    pub fn plan(&self, slug: &str) -> Option<&SubscriptionPlan> {
        self.plans.iter().find(|p| p.slug == slug)
    }

    /// Smallest footage any bracket table prices, or `None` when the
    /// catalog has no bracket tables at all.
    pub fn online_minimum_sq_ft(&self) -> Option<u32> {
        let service_tables = self.services.iter().filter_map(|s| match &s.kind {
            ServiceKind::Tiered { brackets } => Some(brackets.as_slice()),
            ServiceKind::ContactRequired => None,
        });
        let plan_tables = self.plans.iter().map(|p| p.seasonal_base_brackets.as_slice());
        service_tables
            .chain(plan_tables)
            .filter_map(|table| table.first())
            .map(|b| b.min_sq_ft)
            .min()
    }
}
