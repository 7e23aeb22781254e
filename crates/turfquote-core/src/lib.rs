pub mod catalog;
pub mod identity;
pub mod input;
pub mod pricing;

pub use catalog::{Catalog, CatalogError, ServiceDefinition, ServiceKind, SubscriptionPlan};
pub use pricing::{QuoteRequest, QuoteResult, Resolution, compute_quote, compute_seasonal_price};
