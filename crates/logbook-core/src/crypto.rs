//! Segmented AES-256-GCM with per-file HKDF-SHA256 keys.
//!
//! Every write draws a fresh salt and nonce prefix, so each file gets its own
//! content key derived from the master key. The associated data (the file
//! name for entries, the namespace for prefs) is the HKDF info, which binds
//! a ciphertext to the name it was written under.
//!
//! Wire format:
//!   [ header_len (1) | salt (32) | nonce_prefix (7) ] [ segment 0 ] [ segment 1 ] ...
//!
//! Ciphertext segments are 4096 bytes, the first one shortened by the header
//! length; only the last segment may be shorter. Segment nonce:
//!   [ nonce_prefix (7) | segment index (u32 BE) | last-segment flag (1) ]

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 32;
pub const NONCE_PREFIX_LEN: usize = 7;
pub const TAG_LEN: usize = 16;
pub const HEADER_LEN: usize = 1 + SALT_LEN + NONCE_PREFIX_LEN;
pub const SEGMENT_SIZE: usize = 4096;

const PLAINTEXT_SEGMENT_SIZE: usize = SEGMENT_SIZE - TAG_LEN;
const FIRST_PLAINTEXT_SEGMENT_SIZE: usize = PLAINTEXT_SEGMENT_SIZE - HEADER_LEN;
const FIRST_SEGMENT_SIZE: usize = SEGMENT_SIZE - HEADER_LEN;

/// 256-bit master key. Zeroized on drop, never printed.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyUnavailable("stored key has wrong length".into()))?;
        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

fn derive_file_key(
    master: &MasterKey,
    salt: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(associated_data, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

fn segment_nonce(prefix: &[u8], index: usize, last: bool) -> Result<[u8; 12], CryptoError> {
    let index = u32::try_from(index).map_err(|_| CryptoError::AeadEncrypt)?;
    let mut nonce = [0u8; 12];
    nonce[..NONCE_PREFIX_LEN].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_LEN..11].copy_from_slice(&index.to_be_bytes());
    nonce[11] = u8::from(last);
    Ok(nonce)
}

fn plaintext_segments(plaintext: &[u8]) -> Vec<&[u8]> {
    if plaintext.len() <= FIRST_PLAINTEXT_SEGMENT_SIZE {
        return vec![plaintext];
    }
    let (first, rest) = plaintext.split_at(FIRST_PLAINTEXT_SEGMENT_SIZE);
    let mut segments = vec![first];
    segments.extend(rest.chunks(PLAINTEXT_SEGMENT_SIZE));
    segments
}

fn ciphertext_segments(body: &[u8]) -> Vec<&[u8]> {
    if body.len() <= FIRST_SEGMENT_SIZE {
        return vec![body];
    }
    let (first, rest) = body.split_at(FIRST_SEGMENT_SIZE);
    let mut segments = vec![first];
    segments.extend(rest.chunks(SEGMENT_SIZE));
    segments
}

/// Encrypt `plaintext` under a fresh file key derived from `master`.
pub fn encrypt(
    master: &MasterKey,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut prefix = [0u8; NONCE_PREFIX_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut prefix);

    let key = derive_file_key(master, &salt, associated_data)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::AeadEncrypt)?;

    let segments = plaintext_segments(plaintext);
    let mut out = Vec::with_capacity(HEADER_LEN + plaintext.len() + segments.len() * TAG_LEN);
    out.push(HEADER_LEN as u8);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&prefix);

    let last_index = segments.len() - 1;
    for (index, segment) in segments.into_iter().enumerate() {
        let nonce = segment_nonce(&prefix, index, index == last_index)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), segment)
            .map_err(|_| CryptoError::AeadEncrypt)?;
        out.extend_from_slice(&ciphertext);
    }
    Ok(out)
}

/// Decrypt bytes produced by [`encrypt`]. Any modification, truncation,
/// extension, or a different `associated_data` fails authentication.
pub fn decrypt(
    master: &MasterKey,
    data: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let Some(&header_len) = data.first() else {
        return Err(CryptoError::Truncated);
    };
    if header_len as usize != HEADER_LEN {
        return Err(CryptoError::MalformedHeader(format!(
            "header length {header_len}, expected {HEADER_LEN}"
        )));
    }
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(CryptoError::Truncated);
    }
    let salt = &data[1..1 + SALT_LEN];
    let prefix = &data[1 + SALT_LEN..HEADER_LEN];

    let key = derive_file_key(master, salt, associated_data)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::AeadDecrypt)?;

    let segments = ciphertext_segments(&data[HEADER_LEN..]);
    let last_index = segments.len() - 1;
    let mut plaintext = Zeroizing::new(Vec::with_capacity(data.len()));
    for (index, segment) in segments.into_iter().enumerate() {
        let nonce = segment_nonce(prefix, index, index == last_index)
            .map_err(|_| CryptoError::AeadDecrypt)?;
        let chunk = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce), segment)
                .map_err(|_| CryptoError::AeadDecrypt)?,
        );
        plaintext.extend_from_slice(&chunk);
    }
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn roundtrip_across_segment_boundaries() {
        let key = MasterKey::generate();
        for len in [
            0,
            1,
            FIRST_PLAINTEXT_SEGMENT_SIZE,
            FIRST_PLAINTEXT_SEGMENT_SIZE + 1,
            FIRST_PLAINTEXT_SEGMENT_SIZE + PLAINTEXT_SEGMENT_SIZE,
            20_000,
        ] {
            let plaintext = body(len);
            let ciphertext = encrypt(&key, &plaintext, b"entry").unwrap();
            let decrypted = decrypt(&key, &ciphertext, b"entry").unwrap();
            assert_eq!(&decrypted[..], &plaintext[..], "length {len}");
        }
    }

    #[test]
    fn every_write_uses_fresh_salt() {
        let key = MasterKey::generate();
        let a = encrypt(&key, b"same", b"entry").unwrap();
        let b = encrypt(&key, b"same", b"entry").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn flipped_byte_fails_authentication() {
        let key = MasterKey::generate();
        let mut ciphertext = encrypt(&key, b"Captain's log", b"entry").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        assert!(matches!(
            decrypt(&key, &ciphertext, b"entry"),
            Err(CryptoError::AeadDecrypt)
        ));
    }

    #[test]
    fn dropping_trailing_segment_is_detected() {
        let key = MasterKey::generate();
        let ciphertext = encrypt(&key, &body(10_000), b"entry").unwrap();
        let truncated = &ciphertext[..SEGMENT_SIZE];
        assert!(decrypt(&key, truncated, b"entry").is_err());
    }

    #[test]
    fn appended_bytes_are_detected() {
        let key = MasterKey::generate();
        let mut ciphertext = encrypt(&key, b"body", b"entry").unwrap();
        ciphertext.extend_from_slice(&[0u8; 32]);
        assert!(decrypt(&key, &ciphertext, b"entry").is_err());
    }

    #[test]
    fn associated_data_binds_ciphertext() {
        let key = MasterKey::generate();
        let ciphertext = encrypt(&key, b"body", b"2259.42").unwrap();
        assert!(decrypt(&key, &ciphertext, b"2259.43").is_err());
    }

    #[test]
    fn wrong_master_key_fails() {
        let ciphertext = encrypt(&MasterKey::generate(), b"body", b"entry").unwrap();
        assert!(decrypt(&MasterKey::generate(), &ciphertext, b"entry").is_err());
    }

    #[test]
    fn short_or_foreign_input_is_rejected() {
        let key = MasterKey::generate();
        assert!(matches!(decrypt(&key, &[], b"x"), Err(CryptoError::Truncated)));
        assert!(matches!(
            decrypt(&key, &[HEADER_LEN as u8; 10], b"x"),
            Err(CryptoError::Truncated)
        ));
        assert!(matches!(
            decrypt(&key, b"plain text file", b"x"),
            Err(CryptoError::MalformedHeader(_))
        ));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let key = MasterKey::from_bytes([7u8; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "MasterKey(<redacted>)");
    }
}
