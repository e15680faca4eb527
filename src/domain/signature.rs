//! HMAC-SHA256 signatures over `"{gateway_order_id}|{payment_id}"`.

use crate::error::{OrderError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret used to sign and check payment callbacks.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn keyed(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| OrderError::Config(format!("unusable gateway secret: {}", e)))
    }

    fn mac(&self, gateway_order_id: &str, payment_id: &str) -> Result<HmacSha256> {
        let mut mac = self.keyed()?;
        mac.update(gateway_order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Ok(mac)
    }

    /// Lowercase hex signature the gateway sends for a completed payment.
    pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> Result<String> {
        let mac = self.mac(gateway_order_id, payment_id)?;
        Ok(to_hex(&mac.finalize().into_bytes()))
    }

    /// Checks `signature` in constant time. Hex case is ignored.
    pub fn verify(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> Result<()> {
        let supplied = decode_hex(signature.trim()).ok_or(OrderError::Signature)?;
        self.mac(gateway_order_id, payment_id)?
            .verify_slice(&supplied)
            .map_err(|_| OrderError::Signature)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc4231(key: &[u8], data: &[u8]) -> String {
        let mut mac = SignatureVerifier::new(key).keyed().unwrap();
        mac.update(data);
        to_hex(&mac.finalize().into_bytes())
    }

    #[test]
    fn test_hmac_matches_rfc4231_case_2() {
        assert_eq!(
            rfc4231(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_long_key_matches_rfc4231_case_6() {
        assert_eq!(
            rfc4231(
                &[0xaau8; 131],
                b"Test Using Larger Than Block-Size Key - Hash Key First"
            ),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn test_malformed_hex_rejected() {
        let verifier = SignatureVerifier::new("s3cret");
        let signature = verifier.sign("order_abc", "pay_123").unwrap();
        for bad in ["", "zz", &signature[1..], format!("{}é", &signature[..62]).as_str()] {
            assert!(matches!(
                verifier.verify("order_abc", "pay_123", bad),
                Err(OrderError::Signature)
            ));
        }
    }

    #[test]
    fn test_sign_then_verify() {
        let verifier = SignatureVerifier::new("s3cret");
        let signature = verifier.sign("order_abc", "pay_123").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verifier.verify("order_abc", "pay_123", &signature).is_ok());
        assert!(
            verifier
                .verify("order_abc", "pay_123", &signature.to_uppercase())
                .is_ok()
        );
    }

    #[test]
    fn test_tampered_inputs_rejected() {
        let verifier = SignatureVerifier::new("s3cret");
        let signature = verifier.sign("order_abc", "pay_123").unwrap();
        assert!(matches!(
            verifier.verify("order_abc", "pay_124", &signature),
            Err(OrderError::Signature)
        ));
        assert!(matches!(
            verifier.verify("order_abd", "pay_123", &signature),
            Err(OrderError::Signature)
        ));
        assert!(matches!(
            SignatureVerifier::new("other").verify("order_abc", "pay_123", &signature),
            Err(OrderError::Signature)
        ));
        assert!(matches!(
            verifier.verify("order_abc", "pay_123", "deadbeef"),
            Err(OrderError::Signature)
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = SignatureVerifier::new("s3cret");
        assert!(!format!("{verifier:?}").contains("s3cret"));
    }
}
