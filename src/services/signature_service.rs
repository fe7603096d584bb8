use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ApiError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header PayTabs uses to carry the body signature
pub const SIGNATURE_HEADER: &str = "signature";

/// Verifies PayTabs callback signatures
///
/// The provider signs the raw request body with the profile server key using
/// HMAC-SHA256 and sends the lowercase hex digest in the `signature` header.
pub struct SignatureVerifier {
    server_key: Option<String>,
}

impl SignatureVerifier {
    /// Verifier that checks every request against `server_key`
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: Some(server_key.into()),
        }
    }

    /// Verifier that accepts everything, for local development only
    pub fn disabled() -> Self {
        Self { server_key: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.server_key.is_some()
    }

    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mac = self.mac(body)?;
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check `signature` (hex) against `body`
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        let Some(mac) = self.mac(body) else {
            return Ok(());
        };

        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::InvalidSignature("Missing signature header".to_string()))?;

        let expected = hex::decode(signature)
            .map_err(|_| ApiError::InvalidSignature("Signature is not valid hex".to_string()))?;

        // Constant-time comparison
        mac.verify_slice(&expected)
            .map_err(|_| ApiError::InvalidSignature("Signature mismatch".to_string()))
    }

    fn mac(&self, body: &[u8]) -> Option<HmacSha256> {
        let key = self.server_key.as_deref()?;
        // HMAC accepts keys of any length, so this never fails
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
        mac.update(body);
        Some(mac)
    }
}
