//! secp256k1 ECIES compatible with the dotenv `encrypted:` value format.
//!
//! Payload layout (base64, standard alphabet):
//! `ephemeral_pubkey (65, uncompressed) || nonce (16) || tag (16) || ciphertext`.
//! Key agreement, HKDF-SHA256 and AES-256-GCM are delegated to the `ecies` crate,
//! whose default configuration produces exactly this layout.

use base64::{Engine, engine::general_purpose::STANDARD};
use ecies::{PublicKey, SecretKey};

use crate::MARKER_PREFIX;
use crate::errors::{DecryptError, DecryptResult};

const MIN_PAYLOAD_LEN: usize = 65 + 16 + 16;

/// Decrypts a base64 payload (without the `encrypted:` marker) with a hex private key.
pub fn open(private_key_hex: &str, payload_b64: &str) -> DecryptResult<String> {
    let secret = parse_secret_key(private_key_hex)?;
    let data = STANDARD
        .decode(payload_b64.trim())
        .map_err(|err| DecryptError::InvalidCiphertext(format!("base64: {err}")))?;
    if data.len() < MIN_PAYLOAD_LEN {
        return Err(DecryptError::InvalidCiphertext("payload too short".into()));
    }

    let plaintext = ecies::decrypt(&secret.serialize(), &data)
        .map_err(|_| DecryptError::Crypto("message authentication failed".into()))?;

    String::from_utf8(plaintext)
        .map_err(|_| DecryptError::InvalidCiphertext("plaintext is not utf-8".into()))
}

/// Encrypts `plaintext` for a hex SEC1 public key, returning a marked value.
pub fn seal(public_key_hex: &str, plaintext: &str) -> DecryptResult<String> {
    let bytes = hex::decode(public_key_hex.trim())
        .map_err(|err| DecryptError::InvalidKey(format!("public key hex: {err}")))?;
    let receiver = PublicKey::parse_slice(&bytes, None)
        .map_err(|_| DecryptError::InvalidKey("public key is not a secp256k1 point".into()))?;

    let payload = ecies::encrypt(&receiver.serialize(), plaintext.as_bytes())
        .map_err(|err| DecryptError::Crypto(format!("failed to encrypt payload: {err:?}")))?;

    Ok(format!("{MARKER_PREFIX}{}", STANDARD.encode(payload)))
}

/// Fresh `(private_key_hex, compressed_public_key_hex)` pair.
pub fn generate_key_pair() -> (String, String) {
    let (secret, public) = ecies::utils::generate_keypair();
    (
        hex::encode(secret.serialize()),
        hex::encode(public.serialize_compressed()),
    )
}

fn parse_secret_key(private_key_hex: &str) -> DecryptResult<SecretKey> {
    let bytes = hex::decode(private_key_hex.trim())
        .map_err(|err| DecryptError::InvalidKey(format!("private key hex: {err}")))?;
    SecretKey::parse_slice(&bytes)
        .map_err(|_| DecryptError::InvalidKey("private key is not a secp256k1 scalar".into()))
}
