use crate::crypto::Decryptor;
use crate::dotenv;
use crate::errors::DecryptResult;
use crate::keys::KeyPair;

/// Decrypts a single marked value through `decryptor`.
///
/// The value is handed over as a one-line `name="raw_value"` assignment. If the
/// decryptor recovers nothing for `name`, `raw_value` is returned unchanged.
/// Errors from the decryptor propagate; callers choose the fallback.
pub fn decrypt(
    decryptor: &dyn Decryptor,
    name: &str,
    raw_value: &str,
    keys: &KeyPair,
) -> DecryptResult<String> {
    let src = dotenv::assignment(name, raw_value);
    let mut parsed = decryptor.parse(&src, keys)?;
    Ok(parsed
        .remove(name)
        .unwrap_or_else(|| raw_value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecryptError;
    use std::collections::BTreeMap;

    #[test]
    fn hands_over_a_single_assignment() {
        let decryptor = |src: &str, keys: &KeyPair| -> DecryptResult<BTreeMap<String, String>> {
            assert_eq!(src, "MY_SECRET=\"encrypted:abc\"");
            assert_eq!(keys.private_keys(), ["k1"]);
            Ok(BTreeMap::from([("MY_SECRET".to_string(), "plaintext1".to_string())]))
        };
        let value = decrypt(
            &decryptor,
            "MY_SECRET",
            "encrypted:abc",
            &KeyPair::new("k1", None),
        )
        .unwrap();
        assert_eq!(value, "plaintext1");
    }

    #[test]
    fn returns_raw_value_when_nothing_recovered() {
        let decryptor =
            |_: &str, _: &KeyPair| -> DecryptResult<BTreeMap<String, String>> { Ok(BTreeMap::new()) };
        let value = decrypt(&decryptor, "NAME", "encrypted:abc", &KeyPair::new("k1", None)).unwrap();
        assert_eq!(value, "encrypted:abc");
    }

    #[test]
    fn propagates_decryptor_errors() {
        let decryptor = |_: &str, _: &KeyPair| -> DecryptResult<BTreeMap<String, String>> {
            Err(DecryptError::Crypto("message authentication failed".into()))
        };
        let err = decrypt(&decryptor, "NAME", "encrypted:abc", &KeyPair::new("k1", None)).unwrap_err();
        assert!(matches!(err, DecryptError::Crypto(_)));
    }
}
