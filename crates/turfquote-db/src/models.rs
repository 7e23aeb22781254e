use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Subscription tier recorded on a user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Basic,
    Premium,
}

impl SubscriptionTier {
    pub const ALL: [Self; 3] = [Self::Free, Self::Basic, Self::Premium];
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
        };
        f.write_str(s)
    }
}

impl FromStr for SubscriptionTier {
    type Err = SubscriptionTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            other => Err(SubscriptionTierParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SubscriptionTier`] string.
#[derive(Debug, Clone)]
pub struct SubscriptionTierParseError(pub String);

impl fmt::Display for SubscriptionTierParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid subscription tier: {:?} (expected free, basic, or premium)",
            self.0
        )
    }
}

impl std::error::Error for SubscriptionTierParseError {}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A user record keyed by the identity provider's user ID.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// The identity provider's ID for this user.
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subscription_tier: SubscriptionTier,
    /// Payment-processor customer reference; empty until checkout exists.
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined with a space, trimmed when either is empty.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
