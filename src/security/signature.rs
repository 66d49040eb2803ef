//! Ed25519 signature verification for Discord interactions.
//!
//! Discord signs `timestamp ‖ body` with the application's key and sends the
//! signature hex-encoded in `X-Signature-Ed25519`.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Failure of the verification primitive itself (not a bad signature).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifierError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Verification capability used by the security orchestrator.
///
/// `Ok(false)` means the signature does not match; `Err` means verification
/// could not be performed.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(
        &self,
        payload: &[u8],
        signature_hex: &str,
        timestamp: &str,
        public_key_hex: &str,
    ) -> Result<bool, VerifierError>;
}

/// `ed25519-dalek` backed verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    pub fn new() -> Self {
        Self
    }

    fn parse_key(public_key_hex: &str) -> Result<VerifyingKey, VerifierError> {
        let bytes = hex::decode(public_key_hex.trim())
            .map_err(|e| VerifierError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VerifierError::InvalidPublicKey("expected 32 bytes".to_string()))?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| VerifierError::InvalidPublicKey(e.to_string()))
    }
}

#[async_trait]
impl SignatureVerifier for Ed25519Verifier {
    async fn verify(
        &self,
        payload: &[u8],
        signature_hex: &str,
        timestamp: &str,
        public_key_hex: &str,
    ) -> Result<bool, VerifierError> {
        let key = Self::parse_key(public_key_hex)?;

        let signature = match hex::decode(signature_hex.trim())
            .ok()
            .and_then(|bytes| <[u8; 64]>::try_from(bytes).ok())
        {
            Some(bytes) => Signature::from_bytes(&bytes),
            None => return Ok(false),
        };

        let mut message = Vec::with_capacity(timestamp.len() + payload.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(payload);

        Ok(key.verify(&message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    #[tokio::test]
    async fn test_valid_signature() {
        let key = signing_key();
        let public = hex::encode(key.verifying_key().to_bytes());
        let body = br#"{"type":1}"#;
        let sig = sign(&key, "1700000000", body);

        let ok = Ed25519Verifier.verify(body, &sig, "1700000000", &public).await;
        assert_eq!(ok, Ok(true));
    }

    #[tokio::test]
    async fn test_timestamp_is_part_of_message() {
        let key = signing_key();
        let public = hex::encode(key.verifying_key().to_bytes());
        let body = br#"{"type":1}"#;
        let sig = sign(&key, "1700000000", body);

        let ok = Ed25519Verifier.verify(body, &sig, "1700000001", &public).await;
        assert_eq!(ok, Ok(false));
    }

    #[tokio::test]
    async fn test_garbage_signature_is_false_not_error() {
        let public = hex::encode(signing_key().verifying_key().to_bytes());
        let ok = Ed25519Verifier.verify(b"{}", "not-hex", "1", &public).await;
        assert_eq!(ok, Ok(false));

        let ok = Ed25519Verifier.verify(b"{}", "abcd", "1", &public).await;
        assert_eq!(ok, Ok(false));
    }

    #[tokio::test]
    async fn test_bad_public_key_is_error() {
        let result = Ed25519Verifier.verify(b"{}", "abcd", "1", "xyz").await;
        assert!(matches!(result, Err(VerifierError::InvalidPublicKey(_))));
    }
}
