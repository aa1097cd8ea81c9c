//! Message encryption for Web Push (RFC 8291, `aes128gcm` content coding)
//!
//! The body is a single record: a header carrying the salt, record size and the
//! sender's ephemeral public key, followed by the AES-128-GCM ciphertext of the
//! payload plus its padding delimiter.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use p256::{ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

use super::error::WebPushError;

/// Record size advertised in the header
pub const RECORD_SIZE: u32 = 4096;

/// Length of an uncompressed P-256 point
const PUBLIC_KEY_LEN: usize = 65;

const SALT_LEN: usize = 16;
const AUTH_SECRET_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Header: salt, record size, key id length, key id
pub const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;

/// Largest payload accepted: push services take at most 4096 bytes of body
pub const MAX_PAYLOAD_LEN: usize = 4096 - HEADER_LEN - TAG_LEN - 1;

/// Delimiter appended to the plaintext of the last (only) record
const LAST_RECORD_DELIMITER: u8 = 0x02;

/// Decodes base64url, also accepting padding and the standard alphabet
pub(crate) fn decode_base64url(value: &str) -> Option<Vec<u8>> {
    let normalized: String = value
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD.decode(normalized).ok()
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32], WebPushError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| WebPushError::Encryption)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Content encryption key and nonce for one message
struct RecordKeys {
    cek: [u8; 16],
    nonce: [u8; 12],
}

fn derive_record_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<RecordKeys, WebPushError> {
    // IKM = HKDF(auth_secret, ecdh_secret, "WebPush: info" || 0x00 || ua_public || as_public, 32)
    let prk_key = hmac_sha256(auth_secret, &[ecdh_secret])?;
    let ikm = hmac_sha256(
        &prk_key,
        &[b"WebPush: info\0", ua_public, as_public, &[0x01]],
    )?;

    let prk = hmac_sha256(salt, &[&ikm])?;
    let cek_block = hmac_sha256(&prk, &[b"Content-Encoding: aes128gcm\0", &[0x01]])?;
    let nonce_block = hmac_sha256(&prk, &[b"Content-Encoding: nonce\0", &[0x01]])?;

    let mut keys = RecordKeys {
        cek: [0; 16],
        nonce: [0; 12],
    };
    keys.cek.copy_from_slice(&cek_block[..16]);
    keys.nonce.copy_from_slice(&nonce_block[..12]);
    Ok(keys)
}

/// Encrypts `plaintext` for the subscription identified by `p256dh` and `auth`
///
/// # Errors
///
/// Returns `WebPushError::InvalidSubscriptionKeys` for malformed keys,
/// `WebPushError::PayloadTooLarge` when the payload does not fit in one record, and
/// `WebPushError::Encryption` if encryption fails.
pub fn encrypt_payload(plaintext: &[u8], p256dh: &str, auth: &str) -> Result<Vec<u8>, WebPushError> {
    let ua_public = decode_base64url(p256dh)
        .ok_or_else(|| WebPushError::InvalidSubscriptionKeys("p256dh is not base64url".into()))?;
    let auth_secret = decode_base64url(auth)
        .ok_or_else(|| WebPushError::InvalidSubscriptionKeys("auth is not base64url".into()))?;

    let as_secret = SecretKey::random(&mut OsRng);
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    encrypt_with(plaintext, &ua_public, &auth_secret, &as_secret, &salt)
}

/// Encryption with caller-provided ephemeral key and salt
fn encrypt_with(
    plaintext: &[u8],
    ua_public: &[u8],
    auth_secret: &[u8],
    as_secret: &SecretKey,
    salt: &[u8; SALT_LEN],
) -> Result<Vec<u8>, WebPushError> {
    if plaintext.len() > MAX_PAYLOAD_LEN {
        return Err(WebPushError::PayloadTooLarge(plaintext.len()));
    }
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err(WebPushError::InvalidSubscriptionKeys(format!(
            "auth must be {AUTH_SECRET_LEN} bytes, got {}",
            auth_secret.len()
        )));
    }

    let ua_key = PublicKey::from_sec1_bytes(ua_public)
        .map_err(|_| WebPushError::InvalidSubscriptionKeys("p256dh is not a P-256 point".into()))?;
    let ua_public = ua_key.to_encoded_point(false);
    let as_public = as_secret.public_key().to_encoded_point(false);

    let shared = diffie_hellman(as_secret.to_nonzero_scalar(), ua_key.as_affine());
    let keys = derive_record_keys(
        shared.raw_secret_bytes(),
        auth_secret,
        ua_public.as_bytes(),
        as_public.as_bytes(),
        salt,
    )?;

    let mut record = Vec::with_capacity(plaintext.len() + 1);
    record.extend_from_slice(plaintext);
    record.push(LAST_RECORD_DELIMITER);

    let cipher = Aes128Gcm::new_from_slice(&keys.cek).map_err(|_| WebPushError::Encryption)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&keys.nonce), record.as_slice())
        .map_err(|_| WebPushError::Encryption)?;

    let mut body = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    body.extend_from_slice(salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(as_public.as_bytes());
    body.extend_from_slice(&ciphertext);
    Ok(body)
}
