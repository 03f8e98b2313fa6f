//! Webhook signature validation for worker callbacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{DomainErrorKind, Error, InternalErrorKind, WebhookErrorKind};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the `sha256=<hex>` signature of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Trait for validating webhook signatures.
pub trait WebhookValidator: Send + Sync {
    /// Validate a webhook request.
    ///
    /// # Arguments
    ///
    /// * `signature` - Value of the signature header, if the request carried one
    /// * `body` - Raw request body bytes
    ///
    /// # Returns
    ///
    /// `true` if signature is valid, `false` otherwise.
    fn validate(&self, signature: Option<&str>, body: &[u8]) -> Result<bool, Error>;
}

/// HMAC-SHA256 webhook validator, as used by the generation workers.
pub struct HmacWebhookValidator {
    secret: String,
}

impl HmacWebhookValidator {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })
    }

    /// Produce the header value a worker would send for `body`.
    pub fn sign(&self, body: &[u8]) -> Result<String, Error> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }
}

impl WebhookValidator for HmacWebhookValidator {
    fn validate(&self, signature: Option<&str>, body: &[u8]) -> Result<bool, Error> {
        let signature =
            signature.ok_or_else(|| Error::webhook(WebhookErrorKind::MissingSignature))?;

        let expected_sig = hex::decode(signature.trim_start_matches("sha256="))
            .map_err(|_| Error::webhook(WebhookErrorKind::InvalidSignature))?;

        let mut mac = self.mac()?;
        mac.update(body);

        Ok(mac.verify_slice(&expected_sig).is_ok())
    }
}
