//! The decryption primitive consumed by the adapter.

pub mod ecies;

use std::collections::BTreeMap;

use crate::errors::{DecryptError, DecryptResult};
use crate::keys::KeyPair;
use crate::{MARKER_PREFIX, dotenv, is_marked};

pub use ecies::{generate_key_pair, open, seal};

/// Parses dotenv source and returns the recovered plaintext per name.
///
/// Implementations may omit names they cannot recover; callers treat an omitted
/// name as "leave the original value alone".
pub trait Decryptor: Send + Sync {
    fn parse(&self, src: &str, keys: &KeyPair) -> DecryptResult<BTreeMap<String, String>>;
}

impl<F> Decryptor for F
where
    F: Fn(&str, &KeyPair) -> DecryptResult<BTreeMap<String, String>> + Send + Sync,
{
    fn parse(&self, src: &str, keys: &KeyPair) -> DecryptResult<BTreeMap<String, String>> {
        self(src, keys)
    }
}

/// Dotenv parser that opens `encrypted:` values with secp256k1 ECIES.
///
/// Unmarked values are returned as written. Marked values are tried against each
/// private key in order; without any private key they are omitted. When every key
/// fails the last error is returned.
#[derive(Debug, Default, Clone, Copy)]
pub struct DotenvDecryptor;

impl DotenvDecryptor {
    pub fn new() -> Self {
        Self
    }

    fn open_marked(&self, value: &str, keys: &KeyPair) -> DecryptResult<Option<String>> {
        let Some(payload) = value.strip_prefix(MARKER_PREFIX) else {
            return Ok(Some(value.to_string()));
        };

        let mut last_err = None;
        for key in keys.private_keys() {
            match open(key, payload) {
                Ok(plaintext) => return Ok(Some(plaintext)),
                Err(err) => last_err = Some(err),
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

impl Decryptor for DotenvDecryptor {
    fn parse(&self, src: &str, keys: &KeyPair) -> DecryptResult<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for (name, value) in dotenv::parse(src)? {
            if !is_marked(&value) {
                out.insert(name, value);
                continue;
            }
            let opened = self
                .open_marked(&value, keys)
                .map_err(|err| tag_name(&name, err))?;
            if let Some(plaintext) = opened {
                out.insert(name, plaintext);
            }
        }
        Ok(out)
    }
}

fn tag_name(name: &str, err: DecryptError) -> DecryptError {
    match err {
        DecryptError::Crypto(reason) => DecryptError::Crypto(format!("{name}: {reason}")),
        DecryptError::InvalidCiphertext(reason) => {
            DecryptError::InvalidCiphertext(format!("{name}: {reason}"))
        }
        other => other,
    }
}
