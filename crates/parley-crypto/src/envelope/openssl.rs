//! OpenSSL-compatible salted AES-256-CBC envelope
//!
//! Matches `openssl enc -aes-256-cbc -md md5` and the browser client's crypto
//! library when given a passphrase: key and IV come from `EVP_BytesToKey`
//! (MD5, one iteration) over passphrase and salt, PKCS#7 padding, and the
//! salt travels behind an 8-byte `Salted__` marker.

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};
use zeroize::Zeroize;

use super::OpenFailure;

/// Size of the envelope salt (8 bytes)
pub const SALT_SIZE: usize = 8;

/// Marker preceding the salt
const MAGIC: &[u8; 8] = b"Salted__";

const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const BLOCK_SIZE: usize = 16;
const MD5_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt and serialize as base64.
pub(crate) fn seal(plaintext: &[u8], passphrase: &[u8], salt: [u8; SALT_SIZE]) -> String {
    let (mut key, mut iv) = evp_bytes_to_key(passphrase, &salt);
    let body = Aes256CbcEnc::new((&key).into(), (&iv).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    key.zeroize();
    iv.zeroize();

    let mut raw = Vec::with_capacity(MAGIC.len() + SALT_SIZE + body.len());
    raw.extend_from_slice(MAGIC);
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(&body);

    STANDARD.encode(raw)
}

/// Parse and decrypt.
///
/// # Errors
///
/// - `Malformed`: not base64, no salt marker, truncated or unaligned body
/// - `Rejected`: empty body or invalid padding (wrong key)
pub(crate) fn open(encoded: &str, passphrase: &[u8]) -> Result<Vec<u8>, OpenFailure> {
    let raw = STANDARD.decode(encoded).map_err(|_| OpenFailure::Malformed("not base64"))?;

    let Some(rest) = raw.strip_prefix(MAGIC) else {
        return Err(OpenFailure::Malformed("missing salt marker"));
    };
    if rest.len() < SALT_SIZE {
        return Err(OpenFailure::Malformed("truncated salt"));
    }

    let (salt_bytes, body) = rest.split_at(SALT_SIZE);
    if body.len() % BLOCK_SIZE != 0 {
        return Err(OpenFailure::Malformed("ciphertext is not block aligned"));
    }
    if body.is_empty() {
        return Err(OpenFailure::Rejected("empty ciphertext body"));
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(salt_bytes);

    let (mut key, mut iv) = evp_bytes_to_key(passphrase, &salt);
    let result = Aes256CbcDec::new((&key).into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|_| OpenFailure::Rejected("invalid padding"));
    key.zeroize();
    iv.zeroize();

    result
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
///
/// `D_i = MD5(D_{i-1} || passphrase || salt)`, concatenated until 48 bytes
/// are available; the first 32 are the key, the next 16 the IV.
fn evp_bytes_to_key(passphrase: &[u8], salt: &[u8; SALT_SIZE]) -> ([u8; KEY_SIZE], [u8; IV_SIZE]) {
    let mut material = [0u8; KEY_SIZE + IV_SIZE];
    let mut previous: Option<[u8; MD5_SIZE]> = None;

    for chunk in material.chunks_mut(MD5_SIZE) {
        let mut hasher = Md5::new();
        if let Some(prev) = &previous {
            hasher.update(prev);
        }
        hasher.update(passphrase);
        hasher.update(salt);

        let digest: [u8; MD5_SIZE] = hasher.finalize().into();
        chunk.copy_from_slice(&digest);
        previous = Some(digest);
    }

    let mut key = [0u8; KEY_SIZE];
    let mut iv = [0u8; IV_SIZE];
    key.copy_from_slice(&material[..KEY_SIZE]);
    iv.copy_from_slice(&material[KEY_SIZE..]);

    material.zeroize();
    if let Some(mut prev) = previous {
        prev.zeroize();
    }

    (key, iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    // hex(SHA-256("alice_bob"))
    const ALICE_BOB: &[u8] = b"611b6e0ab188c1b2b6ed16d9da695f5729488576753492d068ecbdfe282db569";
    // hex(SHA-256("alice_carol"))
    const ALICE_CAROL: &[u8] = b"b53cc518c9ec343e60677a40603f3babab0f79fd65265825df961556dab2c5ec";

    const SALT: [u8; SALT_SIZE] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn evp_bytes_to_key_known_answer() {
        let (key, iv) = evp_bytes_to_key(ALICE_BOB, &SALT);
        assert_eq!(
            hex::encode(key),
            "c715494f51a5319b0b7d46bf94d814681058f3a0e0653e6d1e5bb2ca6c207244"
        );
        assert_eq!(hex::encode(iv), "67c9a805ef29e3a68f0dddfb18996c98");
    }

    #[test]
    fn seal_matches_openssl_output() {
        // printf 'Hello' | openssl enc -aes-256-cbc -md md5 -S 0102030405060708 -pass pass:<key>
        let sealed = seal(b"Hello", ALICE_BOB, SALT);
        assert_eq!(sealed, "U2FsdGVkX18BAgMEBQYHCKDykrQd4KdJVwokg4TsRT4=");
    }

    #[test]
    fn open_browser_client_record() {
        let opened = open("U2FsdGVkX1+hssPU5fYHGLAtY5R6AFK9qvbJ7xWz1YrozmffHDD3V83V8006Q7g0", ALICE_BOB);
        assert_eq!(opened.unwrap(), b"This message was deleted.");
    }

    #[test]
    fn open_multibyte_record() {
        let opened = open("U2FsdGVkX18HBwcHBwcHB97nAMn6MHCIK0NYCUM7boqQxgJNI7yYx+WwrU6RP1zr", ALICE_BOB);
        assert_eq!(String::from_utf8(opened.unwrap()).unwrap(), "héllo wörld 👋");
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let sealed = seal(b"Hello", ALICE_BOB, SALT);
        assert_eq!(open(&sealed, ALICE_CAROL), Err(OpenFailure::Rejected("invalid padding")));
    }

    #[test]
    fn salt_changes_ciphertext() {
        let a = seal(b"same", ALICE_BOB, [0; SALT_SIZE]);
        let b = seal(b"same", ALICE_BOB, [1; SALT_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn same_salt_is_deterministic() {
        let a = seal(b"same", ALICE_BOB, SALT);
        let b = seal(b"same", ALICE_BOB, SALT);
        assert_eq!(a, b);
    }

    #[test]
    fn not_base64_is_malformed() {
        assert_eq!(open("hello world", ALICE_BOB), Err(OpenFailure::Malformed("not base64")));
    }

    #[test]
    fn missing_marker_is_malformed() {
        let encoded = STANDARD.encode([0u8; 32]);
        assert_eq!(open(&encoded, ALICE_BOB), Err(OpenFailure::Malformed("missing salt marker")));
    }

    #[test]
    fn truncated_salt_is_malformed() {
        let encoded = STANDARD.encode(b"Salted__1234");
        assert_eq!(open(&encoded, ALICE_BOB), Err(OpenFailure::Malformed("truncated salt")));
    }

    #[test]
    fn unaligned_body_is_malformed() {
        let mut raw = b"Salted__12345678".to_vec();
        raw.extend_from_slice(&[0u8; 15]);
        let encoded = STANDARD.encode(raw);
        assert_eq!(
            open(&encoded, ALICE_BOB),
            Err(OpenFailure::Malformed("ciphertext is not block aligned"))
        );
    }

    #[test]
    fn empty_body_is_rejected() {
        let encoded = STANDARD.encode(b"Salted__12345678");
        assert_eq!(open(&encoded, ALICE_BOB), Err(OpenFailure::Rejected("empty ciphertext body")));
    }

    #[test]
    fn ciphertext_is_padded_to_block() {
        let sealed = seal(b"0123456789abcdef", ALICE_BOB, SALT);
        let raw = STANDARD.decode(sealed).unwrap();
        // marker + salt + two blocks (full block of padding)
        assert_eq!(raw.len(), 8 + SALT_SIZE + 2 * BLOCK_SIZE);
    }
}
