use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check an `X-Hub-Signature-256` header (`sha256=<hex>`) against the payload.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str) -> Result<()> {
    let expected = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| AppError::WebhookVerification(format!("Missing {SIGNATURE_PREFIX} prefix")))
        .and_then(|hex_digest| {
            hex::decode(hex_digest)
                .map_err(|e| AppError::WebhookVerification(format!("Invalid hex in signature: {e}")))
        })?;

    signer(secret)?
        .chain_update(payload)
        .verify_slice(&expected)
        .map_err(|_| AppError::WebhookVerification("Signature mismatch".to_string()))
}

/// Produce the header value the forge would send for `payload`.
pub fn sign(secret: &str, payload: &[u8]) -> Result<String> {
    let digest = signer(secret)?.chain_update(payload).finalize().into_bytes();
    Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(digest)))
}

fn signer(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::WebhookVerification(format!("Invalid HMAC key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_payload_verifies() {
        let header = sign("hook-secret", b"{\"action\":\"opened\"}").unwrap();
        assert!(header.starts_with("sha256="));
        assert!(verify_signature("hook-secret", b"{\"action\":\"opened\"}", &header).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let header = sign("hook-secret", b"{\"action\":\"opened\"}").unwrap();
        assert!(verify_signature("hook-secret", b"{\"action\":\"closed\"}", &header).is_err());
        assert!(verify_signature("other-secret", b"{\"action\":\"opened\"}", &header).is_err());
    }

    #[test]
    fn test_malformed_header_fails() {
        assert!(verify_signature("hook-secret", b"x", "abcdef").is_err());
        assert!(verify_signature("hook-secret", b"x", "sha256=zz").is_err());
    }
}
