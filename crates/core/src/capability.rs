//! Per-job webhook capabilities.
//!
//! Each submission mints a random nonce and signs it with the server's
//! webhook secret (HMAC-SHA256). Both go into the callback URL handed to the
//! model service; a callback is only accepted when the signature verifies.
//! The prediction id is assigned remotely after the URL is fixed, so the
//! nonce is the job's binding instead of the id.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

/// Length of the generated nonce (alphanumeric characters).
pub const NONCE_LENGTH: usize = 32;

/// Length of a generated webhook secret when none is configured.
pub const SECRET_LENGTH: usize = 48;

type HmacSha256 = Hmac<Sha256>;

/// A minted nonce together with its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookCapability {
    pub nonce: String,
    pub signature: String,
}

impl WebhookCapability {
    /// Build the callback URL for this capability under `public_url`.
    pub fn callback_url(&self, public_url: &str) -> String {
        format!(
            "{}/webhook?nonce={}&sig={}",
            public_url.trim_end_matches('/'),
            self.nonce,
            self.signature
        )
    }
}

/// Mints and verifies webhook capabilities with one secret.
#[derive(Clone)]
pub struct WebhookSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for WebhookSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSigner").finish_non_exhaustive()
    }
}

impl WebhookSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// A signer with a random secret. Capabilities minted by it stop
    /// verifying once the process exits.
    pub fn random() -> Self {
        Self::new(random_alphanumeric(SECRET_LENGTH))
    }

    pub fn mint(&self) -> WebhookCapability {
        let nonce = random_alphanumeric(NONCE_LENGTH);
        let signature = self.sign(&nonce);
        WebhookCapability { nonce, signature }
    }

    /// Hex-encoded HMAC-SHA256 of `nonce`.
    pub fn sign(&self, nonce: &str) -> String {
        let mut mac = self.mac();
        mac.update(nonce.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of `signature` against `nonce`.
    pub fn verify(&self, nonce: &str, signature: &str) -> bool {
        let Some(expected) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(nonce.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}
