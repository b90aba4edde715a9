//! Signing-key cache for the identity provider.
//!
//! Tokens are RS256-signed JWTs; the matching public keys are published as a
//! JWKS document. Keys are cached for a configurable TTL and refetched on
//! demand when a token names an unknown `kid`, with a one-second floor
//! between fetches so a flood of bad tokens cannot hammer the provider.

use anyhow::{bail, Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Claims;

const MIN_FETCH_INTERVAL: Duration = Duration::from_secs(1);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

#[derive(Clone)]
struct KeyEntry {
    key: DecodingKey,
    fetched_at: Instant,
}

#[derive(Default)]
struct KeySet {
    by_kid: HashMap<String, KeyEntry>,
    last_fetch: Option<Instant>,
}

/// Cached view of the identity provider's signing keys.
#[derive(Clone)]
pub struct JwksCache {
    keys: Arc<RwLock<KeySet>>,
    client: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwksCache {
    pub fn new(
        client: reqwest::Client,
        jwks_url: String,
        issuer: String,
        audience: String,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            keys: Arc::new(RwLock::new(KeySet::default())),
            client,
            jwks_url,
            issuer,
            audience,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Verifies signature, expiry, issuer and audience, returning the claims.
    pub async fn verify_token(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).context("Invalid JWT header")?;
        let kid = header.kid.context("JWT missing kid header")?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let data = decode::<Claims>(token, &key, &validation).context("JWT validation failed")?;
        Ok(data.claims)
    }

    /// Fetches the key set eagerly so the first request does not pay for it.
    pub async fn warm_cache(&self) -> Result<()> {
        self.refresh().await
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey> {
        {
            let keys = self.keys.read();
            if let Some(entry) = keys.by_kid.get(kid) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.key.clone());
                }
            }
        }

        self.refresh().await?;

        let keys = self.keys.read();
        keys.by_kid
            .get(kid)
            .map(|entry| entry.key.clone())
            .context("Signing key not present in JWKS")
    }

    async fn refresh(&self) -> Result<()> {
        {
            let keys = self.keys.read();
            if let Some(last) = keys.last_fetch {
                if last.elapsed() < MIN_FETCH_INTERVAL {
                    return Ok(());
                }
            }
        }

        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");
        let response = self
            .client
            .get(&self.jwks_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .context("Failed to fetch JWKS")?;
        if !response.status().is_success() {
            bail!("JWKS fetch failed with status {}", response.status());
        }
        let document: JwksDocument = response.json().await.context("Failed to parse JWKS")?;

        let now = Instant::now();
        let mut keys = self.keys.write();
        keys.last_fetch = Some(now);
        for jwk in document.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.by_kid.insert(
                        jwk.kid,
                        KeyEntry {
                            key,
                            fetched_at: now,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, error = %e, "Skipping unparseable JWK");
                }
            }
        }

        tracing::info!(keys = keys.by_kid.len(), "JWKS cache refreshed");
        Ok(())
    }
}
