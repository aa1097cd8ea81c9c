//! Voluntary Application Server Identification (RFC 8292)
//!
//! Each request to a push service carries an ES256 JWT scoped to the push
//! service origin, signed with the application server's P-256 key. The matching
//! public key is the one browsers were given when subscribing.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p256::{ecdsa::SigningKey, pkcs8::EncodePrivateKey};
use serde::Serialize;
use url::Url;

use super::encryption::decode_base64url;
use super::error::WebPushError;

/// Token lifetime; push services reject tokens valid for more than 24 hours
const TOKEN_LIFETIME_SECS: u64 = 12 * 60 * 60;

/// Push signing configuration read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidConfig {
    /// Contact URI (`mailto:` or `https:`) sent as the token subject
    pub subject: String,
    /// Uncompressed P-256 public key, base64url
    pub public_key: String,
    /// Raw 32-byte P-256 private scalar, base64url
    pub private_key: String,
}

#[derive(Serialize)]
struct Claims<'a> {
    aud: &'a str,
    exp: u64,
    sub: &'a str,
}

/// Signs VAPID tokens with the application server key
#[derive(Clone)]
pub struct VapidSigner {
    encoding_key: EncodingKey,
    public_key: String,
    subject: String,
}

impl std::fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidSigner")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl VapidSigner {
    /// Loads the key pair, checking that the public key belongs to the private key
    ///
    /// # Errors
    ///
    /// Returns `WebPushError::InvalidVapidKey` if either key cannot be decoded or
    /// the pair does not match
    pub fn from_config(config: &VapidConfig) -> Result<Self, WebPushError> {
        let private_bytes = decode_base64url(&config.private_key)
            .ok_or_else(|| WebPushError::InvalidVapidKey("private key is not base64url".into()))?;
        let signing_key = SigningKey::from_slice(&private_bytes)
            .map_err(|_| WebPushError::InvalidVapidKey("private key is not a P-256 scalar".into()))?;

        let derived = signing_key.verifying_key().to_encoded_point(false);
        let configured = decode_base64url(&config.public_key)
            .ok_or_else(|| WebPushError::InvalidVapidKey("public key is not base64url".into()))?;
        if derived.as_bytes() != configured.as_slice() {
            return Err(WebPushError::InvalidVapidKey(
                "public key does not match private key".into(),
            ));
        }

        let pkcs8 = signing_key
            .to_pkcs8_der()
            .map_err(|e| WebPushError::InvalidVapidKey(e.to_string()))?;

        Ok(Self {
            encoding_key: EncodingKey::from_ec_der(pkcs8.as_bytes()),
            public_key: URL_SAFE_NO_PAD.encode(derived.as_bytes()),
            subject: config.subject.clone(),
        })
    }

    /// Public key in the form browsers expect as `applicationServerKey`
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Builds the `Authorization` header value for a request to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns `WebPushError::InvalidEndpoint` if the endpoint is not an absolute
    /// URL, or `WebPushError::Signing` if the token cannot be signed
    pub fn authorization(&self, endpoint: &str) -> Result<String, WebPushError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let token = self.sign_token(endpoint, now + TOKEN_LIFETIME_SECS)?;

        Ok(format!("vapid t={token}, k={}", self.public_key))
    }

    fn sign_token(&self, endpoint: &str, exp: u64) -> Result<String, WebPushError> {
        let url = Url::parse(endpoint).map_err(|e| WebPushError::InvalidEndpoint(e.to_string()))?;
        let audience = url.origin().ascii_serialization();
        if audience == "null" {
            return Err(WebPushError::InvalidEndpoint(endpoint.to_string()));
        }

        let claims = Claims {
            aud: &audience,
            exp,
            sub: &self.subject,
        };

        Ok(encode(
            &Header::new(Algorithm::ES256),
            &claims,
            &self.encoding_key,
        )?)
    }
}
