//! Commerce webhook signature verification.
//!
//! The commerce platform signs the raw request body with HMAC-SHA256 and
//! sends the lowercase hex digest in the `X-Signature` header.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Verifier for commerce webhook signatures.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    /// Creates a new verifier with the shared webhook secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies `signature` against the raw `payload`.
    ///
    /// Accepts an optional `sha256=` prefix. A missing header is treated as
    /// a mismatch.
    pub fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), WebhookError> {
        let signature = signature.ok_or(WebhookError::InvalidSignature)?;
        let hex_digest = signature
            .trim()
            .strip_prefix("sha256=")
            .unwrap_or_else(|| signature.trim());
        let provided = hex::decode(hex_digest).map_err(|_| WebhookError::InvalidSignature)?;

        let expected = self.compute_signature(payload)?;

        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn compute_signature(&self, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex signature a sender would attach, for test fixtures.
#[cfg(test)]
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const PAYLOAD: &[u8] = br#"{"type":"subscription.created","data":{"user_id":"u1"}}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    #[test]
    fn valid_signature_verifies() {
        let signature = sign_payload(TEST_SECRET, PAYLOAD);
        assert!(verifier().verify(PAYLOAD, Some(&signature)).is_ok());
    }

    #[test]
    fn prefixed_signature_verifies() {
        let signature = format!("sha256={}", sign_payload(TEST_SECRET, PAYLOAD));
        assert!(verifier().verify(PAYLOAD, Some(&signature)).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let signature = sign_payload("other_secret", PAYLOAD);
        assert_eq!(
            verifier().verify(PAYLOAD, Some(&signature)),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_fails() {
        let signature = sign_payload(TEST_SECRET, PAYLOAD);
        let tampered = br#"{"type":"subscription.created","data":{"user_id":"u2"}}"#;
        assert!(verifier().verify(tampered, Some(&signature)).is_err());
    }

    #[test]
    fn missing_signature_fails() {
        assert_eq!(
            verifier().verify(PAYLOAD, None),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn non_hex_signature_fails() {
        assert!(verifier().verify(PAYLOAD, Some("not-hex")).is_err());
    }

    #[test]
    fn truncated_signature_fails() {
        let signature = sign_payload(TEST_SECRET, PAYLOAD);
        assert!(verifier().verify(PAYLOAD, Some(&signature[..32])).is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let debug = format!("{:?}", verifier());
        assert!(!debug.contains(TEST_SECRET));
    }
}
