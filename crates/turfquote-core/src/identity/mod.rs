//! Identity-provider webhooks.
//!
//! The sign-in provider posts account events as JSON. Each delivery carries
//! an HMAC-SHA256 of the raw body, hex-encoded, in [`SIGNATURE_HEADER`].
//! Only `user.created` has any effect; it becomes a stored user on the
//! free tier.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use turfquote_db::models::SubscriptionTier;
use turfquote_db::queries::users::NewUser;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-turfquote-signature";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing x-turfquote-signature header")]
    Missing,

    #[error("signature is not valid hex: {0}")]
    InvalidHex(String),

    #[error("signature does not match request body")]
    Mismatch,

    #[error("webhook secret is empty")]
    EmptySecret,
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }
    HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::EmptySecret)
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign_body(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = mac_for(secret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a delivery's signature header against its body.
///
/// Comparison is constant-time via [`Mac::verify_slice`].
pub fn verify_signature(
    secret: &[u8],
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let provided = header.map(str::trim).ok_or(SignatureError::Missing)?;
    if provided.is_empty() {
        return Err(SignatureError::Missing);
    }
    let provided = hex::decode(provided).map_err(|e| SignatureError::InvalidHex(e.to_string()))?;

    let mut mac = mac_for(secret)?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

/// Account payload as the provider sends it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A decoded delivery. Event types other than `user.created` are kept by
/// name so callers can log them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    UserCreated(IdentityUser),
    Other(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("user {0} has no email address")]
    NoEmail(String),
}

/// Decode a webhook body.
pub fn parse_event(body: &[u8]) -> Result<IdentityEvent, EventError> {
    let raw: RawEvent = serde_json::from_slice(body)?;
    match raw.event_type.as_str() {
        "user.created" => Ok(IdentityEvent::UserCreated(serde_json::from_value(raw.data)?)),
        _ => Ok(IdentityEvent::Other(raw.event_type)),
    }
}

/// Map a `user.created` payload to a row insert. The first listed email is
/// the primary one.
pub fn new_user_from_event(user: &IdentityUser) -> Result<NewUser, EventError> {
    let email = user
        .email_addresses
        .first()
        .map(|e| e.email_address.clone())
        .ok_or_else(|| EventError::NoEmail(user.id.clone()))?;

    Ok(NewUser {
        external_id: user.id.clone(),
        email,
        first_name: user.first_name.clone().unwrap_or_default(),
        last_name: user.last_name.clone().unwrap_or_default(),
        subscription_tier: SubscriptionTier::Free,
    })
}
