//! AES-256-CBC encryption and PBKDF2-SHA256 key derivation for ColorCrypt
//! payloads.
//!
//! Key derivation: PBKDF2-HMAC-SHA256(password, salt, 100 000 rounds) → 32-byte key
//! Encryption:     AES-256-CBC with PKCS#7 padding
//!
//! Salt (32 B) and IV (16 B) are drawn from the OS RNG for every encryption
//! and stored in the encrypted header, not in the ciphertext.  The iteration
//! count and hash are part of the on-disk format and must not change.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::header::{Iv, Salt, IV_LEN, SALT_LEN};

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const KEY_LEN: usize = 32;
/// AES block size; ciphertext length is always a non-zero multiple of it.
pub const BLOCK_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Derived key, wiped from memory on drop.
pub type Key = Zeroizing<[u8; KEY_LEN]>;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Invalid password or corrupted data")]
    DecryptionFailed,
}

/// Derive a 256-bit key from a password and a salt using PBKDF2-HMAC-SHA256.
pub fn derive_key(password: &str, salt: &Salt) -> Key {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key[..]);
    key
}

pub fn random_salt() -> Salt {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn random_iv() -> Iv {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// AES-256-CBC encrypt with PKCS#7 padding.  Block-aligned input still gains
/// a full block of padding.
pub fn encrypt(key: &[u8; KEY_LEN], iv: &Iv, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Inverse of [`encrypt`].
///
/// Wrong keys and damaged ciphertext both surface as
/// [`CryptoError::DecryptionFailed`]; callers cannot tell them apart.
pub fn decrypt(key: &[u8; KEY_LEN], iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        assert_eq!(*derive_key("hunter2", &salt), *derive_key("hunter2", &salt));
        assert_ne!(*derive_key("hunter2", &salt), *derive_key("hunter3", &salt));
        assert_ne!(*derive_key("hunter2", &salt), *derive_key("hunter2", &[8u8; SALT_LEN]));
    }

    #[test]
    fn padding_lengths() {
        let key = [1u8; KEY_LEN];
        let iv = [2u8; IV_LEN];
        assert_eq!(encrypt(&key, &iv, b"").unwrap().len(), 16);
        assert_eq!(encrypt(&key, &iv, &[0u8; 15]).unwrap().len(), 16);
        // Block-aligned input gets a whole extra block.
        assert_eq!(encrypt(&key, &iv, &[0u8; 16]).unwrap().len(), 32);
    }

    #[test]
    fn roundtrip_with_key() {
        let key = [3u8; KEY_LEN];
        let iv = [4u8; IV_LEN];
        let ct = encrypt(&key, &iv, b"attack at dawn").unwrap();
        assert_eq!(decrypt(&key, &iv, &ct).unwrap(), b"attack at dawn");
    }

    #[test]
    fn salt_and_iv_are_fresh() {
        assert_ne!(random_salt(), random_salt());
        assert_ne!(random_iv(), random_iv());
    }

    #[test]
    fn bad_ciphertext_lengths_fail() {
        let key = [0u8; KEY_LEN];
        let iv = [0u8; IV_LEN];
        assert!(matches!(decrypt(&key, &iv, b""), Err(CryptoError::DecryptionFailed)));
        assert!(matches!(decrypt(&key, &iv, &[0u8; 17]), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn wrong_key_fails_or_garbles() {
        // PKCS#7 unpadding catches a wrong key with overwhelming but not total
        // probability, so only assert that the plaintext never comes back.
        let iv = [5u8; IV_LEN];
        let ct = encrypt(&[1u8; KEY_LEN], &iv, b"payload bytes").unwrap();
        match decrypt(&[2u8; KEY_LEN], &iv, &ct) {
            Err(CryptoError::DecryptionFailed) => {}
            Ok(pt) => assert_ne!(pt, b"payload bytes"),
            Err(e) => panic!("unexpected error {e}"),
        }
    }
}
