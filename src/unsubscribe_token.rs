use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Mints and verifies the signed tokens embedded in unsubscribe links.
///
/// A token is `{payload}.{tag}`: the contact id, base64url-encoded, followed
/// by an HMAC-SHA256 tag over the encoded payload. Both halves use the
/// unpadded URL-safe alphabet, so the whole token fits in a path segment.
/// Tokens do not expire; a link stops working only when the contact record
/// is gone.
pub struct UnsubscribeTokenCodec {
    key: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
#[error("The unsubscribe token is malformed or its signature does not match.")]
pub struct InvalidSignature;

impl UnsubscribeTokenCodec {
    pub fn new(key: Secret<String>) -> Self {
        Self { key }
    }

    pub fn mint(&self, contact_id: Uuid) -> String {
        let payload = URL_SAFE_NO_PAD.encode(contact_id.as_bytes());
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{payload}.{tag}")
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, InvalidSignature> {
        let (payload, tag) = token.split_once('.').ok_or(InvalidSignature)?;
        let tag = URL_SAFE_NO_PAD.decode(tag).map_err(|_| InvalidSignature)?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).map_err(|_| InvalidSignature)?;
        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| InvalidSignature)?;
        Uuid::from_slice(&raw).map_err(|_| InvalidSignature)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length")
    }
}
