//! Interaction request signature verification.
//!
//! Discord signs every interaction delivery with the application's Ed25519
//! key: `X-Signature-Ed25519` carries a hex signature over
//! `timestamp || body` where the timestamp comes from
//! `X-Signature-Timestamp`. Unverified requests must be answered with 401 or
//! Discord rejects the endpoint URL.

use ed25519_dalek::Verifier as _;

/// Parses a hex string into a fixed-size byte array. Rejects wrong lengths
/// and non-hex digits.
fn parse_hex<const N: usize>(s: &str) -> Option<[u8; N]> {
    if s.len() != N * 2 {
        return None;
    }
    let mut res = [0; N];
    for (i, byte) in res.iter_mut().enumerate() {
        *byte = u8::from_str_radix(s.get(2 * i..2 * (i + 1))?, 16).ok()?;
    }
    Some(res)
}

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("public key must be a 64 digit hex string")]
    MalformedKey,
    #[error("invalid application public key: {0}")]
    InvalidKey(#[from] ed25519_dalek::SignatureError),
}

/// Verifies inbound interaction requests against the application public key
/// loaded once at startup.
pub struct SignatureVerifier {
    public_key: ed25519_dalek::VerifyingKey,
}

impl SignatureVerifier {
    /// Build a verifier from the application public key hex string.
    pub fn from_hex(public_key: &str) -> Result<Self, VerifierError> {
        let bytes: [u8; 32] = parse_hex(public_key.trim()).ok_or(VerifierError::MalformedKey)?;
        Ok(Self {
            public_key: ed25519_dalek::VerifyingKey::from_bytes(&bytes)?,
        })
    }

    /// Verify the detached hex `signature` over `timestamp || body`.
    /// Malformed input and verification failure both return false; failures
    /// are logged and never propagate. Signature bytes are not logged.
    pub fn verify(&self, signature: &str, timestamp: &str, body: &[u8]) -> bool {
        let Some(signature_bytes) = parse_hex(signature) else {
            log::debug!("rejecting interaction: signature is not a 128 digit hex string");
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&signature_bytes);
        let message = [timestamp.as_bytes(), body].concat();
        match self.public_key.verify(&message, &signature) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("rejecting interaction: signature verification failed");
                false
            }
        }
    }
}
