//! Database query functions for the `users` table.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::debug;

use crate::models::{SubscriptionTier, User};

/// Fields supplied when creating a user. Everything except the identity
/// and email falls back to the column default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub external_id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
}

/// Which unique column an insert collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    ExternalId,
    Email,
}

/// A user insert hit a unique constraint. Returned inside the `anyhow`
/// error so callers can `downcast_ref` it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConflict {
    pub field: ConflictField,
    pub value: String,
}

impl fmt::Display for UserConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            ConflictField::ExternalId => write!(f, "user {} already exists", self.value),
            ConflictField::Email => write!(f, "email {} is already registered", self.value),
        }
    }
}

impl std::error::Error for UserConflict {}

fn insert_error(err: sqlx::Error, new: &NewUser) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let conflict = if db_err.constraint() == Some("users_email_key") {
                UserConflict {
                    field: ConflictField::Email,
                    value: new.email.clone(),
                }
            } else {
                UserConflict {
                    field: ConflictField::ExternalId,
                    value: new.external_id.clone(),
                }
            };
            return conflict.into();
        }
    }
    anyhow::Error::new(err).context(format!("failed to create user {}", new.external_id))
}

/// Insert a new user. Returns the stored row with server-generated
/// defaults (id, created_at, customer_id).
///
/// A taken `external_id` or email fails with a [`UserConflict`].
pub async fn create_user(pool: &PgPool, new: &NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (external_id, email, first_name, last_name, subscription_tier) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(&new.external_id)
    .bind(&new.email)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(new.subscription_tier)
    .fetch_one(pool)
    .await
    .map_err(|e| insert_error(e, new))?;

    debug!(external_id = %user.external_id, "user created");
    Ok(user)
}

/// Insert a user unless one with the same `external_id` is already stored.
///
/// `Ok(None)` means the row already existed; concurrent deliveries of the
/// same account settle on a single row. An email owned by another account
/// still fails with a [`UserConflict`].
pub async fn insert_user_if_absent(pool: &PgPool, new: &NewUser) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (external_id, email, first_name, last_name, subscription_tier) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (external_id) DO NOTHING \
         RETURNING *",
    )
    .bind(&new.external_id)
    .bind(&new.email)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(new.subscription_tier)
    .fetch_optional(pool)
    .await
    .map_err(|e| insert_error(e, new))?;

    match &user {
        Some(u) => debug!(external_id = %u.external_id, "user created"),
        None => debug!(external_id = %new.external_id, "user already present"),
    }
    Ok(user)
}

/// Fetch a user by the identity provider's ID.
pub async fn get_user(pool: &PgPool, external_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
        .bind(external_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Change a user's subscription tier. Fails if the user does not exist.
pub async fn update_subscription_tier(
    pool: &PgPool,
    external_id: &str,
    tier: SubscriptionTier,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users \
         SET subscription_tier = $1, updated_at = now() \
         WHERE external_id = $2 \
         RETURNING *",
    )
    .bind(tier)
    .bind(external_id)
    .fetch_optional(pool)
    .await
    .context("failed to update subscription tier")?;

    user.with_context(|| format!("user {external_id} not found"))
}

/// Number of users on each tier, in tier order, including empty tiers.
pub async fn count_by_tier(pool: &PgPool) -> Result<Vec<(SubscriptionTier, i64)>> {
    let rows: Vec<(SubscriptionTier, i64)> = sqlx::query_as(
        "SELECT subscription_tier, COUNT(*) FROM users GROUP BY subscription_tier",
    )
    .fetch_all(pool)
    .await
    .context("failed to count users by tier")?;

    Ok(SubscriptionTier::ALL
        .iter()
        .map(|tier| {
            let count = rows
                .iter()
                .find(|(t, _)| t == tier)
                .map_or(0, |(_, n)| *n);
            (*tier, count)
        })
        .collect())
}
