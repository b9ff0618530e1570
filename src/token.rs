//! Join credentials
//!
//! A fresh credential is requested for every connect and reconnect; they are
//! short-lived and scoped to one identity in one channel.

use anyhow::{bail, Context, Result};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEV_TOKEN_PREFIX: &str = "dev.";

/// A short-lived join credential
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub identity: String,
    pub channel: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Issues join credentials keyed by `(identity, channel)`
#[async_trait::async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, identity: &str, channel: &str) -> Result<Credential>;
}

/// Grants carried by a development token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGrant {
    pub identity: String,
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    /// Unique per issue so no two credentials are ever identical
    pub nonce: uuid::Uuid,
}

/// Unsigned development tokens for a local relay
///
/// Encodes the grant as base64url JSON. Only suitable for relays that run
/// with authentication disabled.
pub struct DevTokenIssuer {
    ttl: Duration,
}

impl DevTokenIssuer {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(1)),
        }
    }
}

impl Default for DevTokenIssuer {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(3600))
    }
}

#[async_trait::async_trait]
impl TokenIssuer for DevTokenIssuer {
    async fn issue_token(&self, identity: &str, channel: &str) -> Result<Credential> {
        if identity.is_empty() || channel.is_empty() {
            bail!("identity and channel are required");
        }

        let expires_at = Utc::now() + self.ttl;
        let grant = JoinGrant {
            identity: identity.to_string(),
            room: channel.to_string(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
            exp: expires_at.timestamp(),
            nonce: uuid::Uuid::new_v4(),
        };

        let payload = serde_json::to_vec(&grant)?;
        let token = format!(
            "{}{}",
            DEV_TOKEN_PREFIX,
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload)
        );

        debug!("Issued dev token for {} in {}", identity, channel);

        Ok(Credential {
            token,
            identity: grant.identity,
            channel: grant.room,
            expires_at,
        })
    }
}

/// Decode a development token back into its grant
pub fn decode_dev_token(token: &str) -> Result<JoinGrant> {
    let encoded = token
        .strip_prefix(DEV_TOKEN_PREFIX)
        .context("Not a development token")?;
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .context("Development token is not valid base64")?;
    let grant = serde_json::from_slice(&payload).context("Development token has no grant")?;
    Ok(grant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_token_carries_grant() {
        let issuer = DevTokenIssuer::default();
        let credential = issuer.issue_token("Nova", "channel-3").await.unwrap();

        let grant = decode_dev_token(&credential.token).unwrap();
        assert_eq!(grant.identity, "Nova");
        assert_eq!(grant.room, "channel-3");
        assert!(grant.room_join && grant.can_publish && grant.can_subscribe);
        assert!(!credential.is_expired());
    }

    #[tokio::test]
    async fn test_tokens_are_never_reused() {
        let issuer = DevTokenIssuer::default();
        let a = issuer.issue_token("Nova", "channel-1").await.unwrap();
        let b = issuer.issue_token("Nova", "channel-1").await.unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_decode_rejects_foreign_tokens() {
        assert!(decode_dev_token("eyJhbGciOi.x.y").is_err());
        assert!(decode_dev_token("dev.!!!").is_err());
    }
}
