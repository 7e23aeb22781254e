//! CLI handlers for `turfquote user` subcommands.

use anyhow::{Context, Result, bail};
use sqlx::PgPool;

use turfquote_db::models::{SubscriptionTier, User};
use turfquote_db::queries::users::{self, NewUser};

use crate::UserCommands;

pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Create {
            external_id,
            email,
            first_name,
            last_name,
        } => {
            let new = NewUser {
                external_id,
                email,
                first_name,
                last_name,
                subscription_tier: SubscriptionTier::Free,
            };
            let user = cmd_create(pool, &new).await?;
            println!("User created.");
            println!();
            print!("{}", render_user(&user));
        }
        UserCommands::Show { external_id } => {
            let user = users::get_user(pool, &external_id)
                .await?
                .with_context(|| format!("user not found: {external_id}"))?;
            print!("{}", render_user(&user));
        }
        UserCommands::SetTier { external_id, tier } => {
            let user = cmd_set_tier(pool, &external_id, &tier).await?;
            println!(
                "User {} is now on the {} tier.",
                user.external_id, user.subscription_tier
            );
        }
    }
    Ok(())
}

async fn cmd_create(pool: &PgPool, new: &NewUser) -> Result<User> {
    if new.external_id.trim().is_empty() {
        bail!("external ID must not be empty");
    }
    if !new.email.contains('@') {
        bail!("invalid email address: {}", new.email);
    }
    users::create_user(pool, new).await
}

async fn cmd_set_tier(pool: &PgPool, external_id: &str, tier: &str) -> Result<User> {
    let tier: SubscriptionTier = tier.parse()?;
    users::update_subscription_tier(pool, external_id, tier).await
}

pub fn render_user(user: &User) -> String {
    let name = user.display_name();
    format!(
        "  External ID:  {}\n  Email:        {}\n  Name:         {}\n  Tier:         {}\n  Created:      {}\n",
        user.external_id,
        user.email,
        if name.is_empty() { "-" } else { name.as_str() },
        user.subscription_tier,
        user.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use turfquote_test_utils::TestDb;

    #[tokio::test]
    async fn create_rejects_blank_identity() {
        let db = TestDb::create().await;

        let new = NewUser {
            external_id: "  ".to_owned(),
            email: "a@example.com".to_owned(),
            ..NewUser::default()
        };
        let err = cmd_create(&db.pool, &new).await.unwrap_err();
        assert!(err.to_string().contains("external ID"));

        let new = NewUser {
            external_id: "user_1".to_owned(),
            email: "not-an-email".to_owned(),
            ..NewUser::default()
        };
        let err = cmd_create(&db.pool, &new).await.unwrap_err();
        assert!(err.to_string().contains("invalid email"));

        db.teardown().await;
    }

    #[tokio::test]
    async fn create_then_render() {
        let db = TestDb::create().await;

        let new = NewUser {
            external_id: "user_render".to_owned(),
            email: "render@example.com".to_owned(),
            first_name: "Robin".to_owned(),
            ..NewUser::default()
        };
        let user = cmd_create(&db.pool, &new).await.unwrap();
        let text = render_user(&user);
        assert!(text.contains("user_render"));
        assert!(text.contains("Robin"));
        assert!(text.contains("Tier:         free"));

        db.teardown().await;
    }

    #[tokio::test]
    async fn set_tier_parses_name() {
        let db = TestDb::create().await;
        db.seed_user("user_tier").await;

        let user = cmd_set_tier(&db.pool, "user_tier", "premium").await.unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Premium);

        let err = cmd_set_tier(&db.pool, "user_tier", "gold").await.unwrap_err();
        assert!(err.to_string().contains("invalid subscription tier"));

        let err = cmd_set_tier(&db.pool, "nobody", "basic").await.unwrap_err();
        assert!(err.to_string().contains("not found"));

        db.teardown().await;
    }
}
