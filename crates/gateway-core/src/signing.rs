//! # Checkout URL Signing
//!
//! Providers that delegate checkout UI to this system hand the payer a signed
//! URL: `{base}{checkout_path}/{provider}/{reference}?expires={unix}&signature={hex}`.
//! The signature is HMAC-SHA256 over `"{provider}:{reference}:{expires}"`.

use crate::error::{GatewayError, GatewayResult};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Parts of a verified checkout URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCheckout {
    pub provider: String,
    pub reference: String,
    /// Unix timestamp after which the URL is rejected
    pub expires_at: i64,
}

/// Signs and verifies checkout URLs
#[derive(Debug, Clone)]
pub struct UrlSigner {
    key: String,
    base_url: String,
    checkout_path: String,
}

impl UrlSigner {
    pub fn new(
        key: impl Into<String>,
        base_url: impl Into<String>,
        checkout_path: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            checkout_path: checkout_path.into(),
        }
    }

    /// Signed checkout URL valid for `ttl` from now
    pub fn sign(&self, provider: &str, reference: &str, ttl: Duration) -> String {
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        self.sign_until(provider, reference, expires_at)
    }

    /// Signed checkout URL valid until `expires_at`
    pub fn sign_until(&self, provider: &str, reference: &str, expires_at: i64) -> String {
        let signature = self.signature(provider, reference, expires_at);
        format!(
            "{}{}/{}/{}?expires={}&signature={}",
            self.base_url, self.checkout_path, provider, reference, expires_at, signature
        )
    }

    /// Check a signature against its parts and the current time
    pub fn verify(
        &self,
        provider: &str,
        reference: &str,
        expires_at: i64,
        signature: &str,
    ) -> GatewayResult<SignedCheckout> {
        let expected = self.signature(provider, reference, expires_at);
        if !constant_time_compare(signature, &expected) {
            return Err(GatewayError::InvalidSignature(
                "Signature mismatch".to_string(),
            ));
        }

        if Utc::now().timestamp() > expires_at {
            return Err(GatewayError::InvalidSignature(
                "Checkout link has expired".to_string(),
            ));
        }

        Ok(SignedCheckout {
            provider: provider.to_string(),
            reference: reference.to_string(),
            expires_at,
        })
    }

    /// Parse and verify a full checkout URL
    pub fn verify_url(&self, raw: &str) -> GatewayResult<SignedCheckout> {
        let url = Url::parse(raw)
            .map_err(|e| GatewayError::InvalidSignature(format!("Malformed URL: {}", e)))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let [.., provider, reference] = segments.as_slice() else {
            return Err(GatewayError::InvalidSignature(
                "Missing provider or reference".to_string(),
            ));
        };

        let mut expires_at = None;
        let mut signature = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "expires" => expires_at = value.parse::<i64>().ok(),
                "signature" => signature = Some(value.into_owned()),
                _ => {}
            }
        }

        let expires_at = expires_at.ok_or_else(|| {
            GatewayError::InvalidSignature("Missing expires parameter".to_string())
        })?;
        let signature = signature.ok_or_else(|| {
            GatewayError::InvalidSignature("Missing signature parameter".to_string())
        })?;

        self.verify(provider, reference, expires_at, &signature)
    }

    fn signature(&self, provider: &str, reference: &str, expires_at: i64) -> String {
        compute_hmac_sha256(
            &self.key,
            &format!("{}:{}:{}", provider, reference, expires_at),
        )
    }
}

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
