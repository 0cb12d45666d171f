//! File ↔ image codec: the two entry points everything else calls.
//!
//! # Encode
//! `header ++ body` is packed into a square RGBA image.  Without a password
//! the body is the file itself and the header is the plain (`ER`) variant.
//! With a password the body is AES-256-CBC ciphertext and the header is the
//! encrypted (`EC`) variant carrying the salt and IV.
//!
//! # Decode
//! The signature is read before anything else: `EC` without a password fails
//! with [`CodecError::PasswordRequired`] straight away.  The declared body is
//! then bounds-checked, its SHA-1 verified, and (if encrypted) decrypted.
//!
//! The digest always covers the bytes that follow the header, so a digest
//! failure means the image was damaged, while a wrong password only shows up
//! at decryption.  Header fields themselves are not authenticated.

use std::borrow::Cow;

use image::RgbaImage;
use sha1::{Digest as _, Sha1};
use thiserror::Error;
use tracing::debug;

use crate::crypto::{self, CryptoError};
use crate::header::{
    self, Digest, Header, HeaderError, HeaderFields, Iv, Salt, Signature, FILENAME_FIELD_LEN,
    SIGNATURE_LEN,
};
use crate::pixel::{self, PixelError};
use crate::png_io::{self, PngError};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Filename too long: {0} bytes UTF-8 (max {FILENAME_FIELD_LEN})")]
    FilenameTooLong(usize),
    #[error("Insufficient data for header: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },
    #[error("Image doesn't contain all declared data: need {needed} bytes, have {available}")]
    TruncatedImage { needed: u64, available: usize },
    #[error("Invalid signature {0:02x?}: not a ColorCrypt image")]
    UnrecognizedFormat([u8; SIGNATURE_LEN]),
    #[error("Embedded filename is not valid UTF-8")]
    InvalidFilename,
    #[error("SHA1 mismatch: data is corrupted or altered")]
    IntegrityMismatch,
    #[error("Image is password-protected; a password is required")]
    PasswordRequired,
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Invalid password or corrupted data")]
    DecryptionFailed,
    #[error(transparent)]
    Pixel(#[from] PixelError),
    #[error(transparent)]
    Png(#[from] PngError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<HeaderError> for CodecError {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::FilenameTooLong(n) => CodecError::FilenameTooLong(n),
            HeaderError::TruncatedHeader { needed, available } => {
                CodecError::TruncatedHeader { needed, available }
            }
            HeaderError::UnrecognizedFormat(sig) => CodecError::UnrecognizedFormat(sig),
            HeaderError::InvalidFilename => CodecError::InvalidFilename,
            HeaderError::Io(e) => CodecError::Io(e),
        }
    }
}

impl From<CryptoError> for CodecError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::EncryptionFailed => CodecError::EncryptionFailed,
            CryptoError::DecryptionFailed => CodecError::DecryptionFailed,
        }
    }
}

/// A recovered file.  `file_name` is exactly what the header stored; callers
/// must sanitise it before using it as a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub file_bytes: Vec<u8>,
    pub file_name:  String,
}

/// Password together with the salt and IV to encrypt under.
#[derive(Debug, Clone)]
pub struct EncryptionParams<'a> {
    pub password: &'a str,
    pub salt:     Salt,
    pub iv:       Iv,
}

impl<'a> EncryptionParams<'a> {
    /// Fresh random salt and IV.
    pub fn random(password: &'a str) -> Self {
        Self { password, salt: crypto::random_salt(), iv: crypto::random_iv() }
    }
}

fn sha1(data: &[u8]) -> Digest {
    Sha1::digest(data).into()
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Pack a file into an image, encrypting it first when `password` is given.
pub fn encode(
    file_bytes: &[u8],
    file_name:  &str,
    password:   Option<&str>,
) -> Result<RgbaImage, CodecError> {
    encode_with(file_bytes, file_name, password.map(EncryptionParams::random))
}

/// [`encode`] with caller-chosen salt and IV.  Reusing a salt/IV pair under
/// the same password leaks plaintext equality; use [`encode`] unless the
/// output must be reproducible.
pub fn encode_with(
    file_bytes: &[u8],
    file_name:  &str,
    encryption: Option<EncryptionParams<'_>>,
) -> Result<RgbaImage, CodecError> {
    let name = file_name.as_bytes();
    // Checked up front so a bad name never pays for key derivation.
    if name.len() > FILENAME_FIELD_LEN {
        return Err(CodecError::FilenameTooLong(name.len()));
    }

    let encrypted = encryption.is_some();
    let (header, body) = match encryption {
        Some(params) => {
            let key = crypto::derive_key(params.password, &params.salt);
            let ciphertext = crypto::encrypt(&key, &params.iv, file_bytes)?;
            let fields = HeaderFields {
                payload_len: ciphertext.len() as u64,
                file_name:   file_name.to_owned(),
                digest:      sha1(&ciphertext),
            };
            let header = Header::Encrypted { fields, salt: params.salt, iv: params.iv };
            (header, Cow::Owned(ciphertext))
        }
        None => {
            let fields = HeaderFields {
                payload_len: file_bytes.len() as u64,
                file_name:   file_name.to_owned(),
                digest:      sha1(file_bytes),
            };
            (Header::Plain(fields), Cow::Borrowed(file_bytes))
        }
    };
    let data = concat(&header.to_bytes()?, &body);

    let image = pixel::pack(&data)?;
    debug!(
        file_name,
        file_len  = file_bytes.len(),
        encrypted,
        side      = image.width(),
        "encoded file into image"
    );
    Ok(image)
}

fn concat(header: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(header.len() + body.len());
    out.extend_from_slice(header);
    out.extend_from_slice(body);
    out
}

// ── Decode ───────────────────────────────────────────────────────────────────

/// Recover the file packed into `image`, verifying its digest and decrypting
/// it when the header says it is encrypted.
pub fn decode(image: &RgbaImage, password: Option<&str>) -> Result<DecodedFile, CodecError> {
    let all = pixel::unpack(image);

    let signature = header::peek_signature(all)?;
    if signature == Signature::Encrypted && password.is_none() {
        return Err(CodecError::PasswordRequired);
    }

    let header = header::parse_header(all)?;
    let body = body_of(all, &header)?;
    let fields = header.fields();

    if sha1(body) != fields.digest {
        return Err(CodecError::IntegrityMismatch);
    }

    let file_bytes = match &header {
        Header::Plain(_) => {
            if password.is_some() {
                debug!("image is not encrypted; ignoring supplied password");
            }
            body.to_vec()
        }
        Header::Encrypted { salt, iv, .. } => {
            let password = password.ok_or(CodecError::PasswordRequired)?;
            let key = crypto::derive_key(password, salt);
            crypto::decrypt(&key, iv, body)?
        }
    };

    debug!(
        file_name = %fields.file_name,
        file_len  = file_bytes.len(),
        encrypted = header.is_encrypted(),
        "decoded image into file"
    );
    Ok(DecodedFile { file_bytes, file_name: fields.file_name.clone() })
}

/// Read the header of `image` without verifying or decrypting the body.
pub fn inspect(image: &RgbaImage) -> Result<Header, CodecError> {
    Ok(header::parse_header(pixel::unpack(image))?)
}

/// Slice the declared body out of the unpacked channel bytes.
fn body_of<'a>(all: &'a [u8], header: &Header) -> Result<&'a [u8], CodecError> {
    let offset = header.data_offset();
    let needed = (offset as u64).saturating_add(header.fields().payload_len);
    if needed > all.len() as u64 {
        return Err(CodecError::TruncatedImage { needed, available: all.len() });
    }
    Ok(&all[offset..needed as usize])
}

// ── PNG convenience ──────────────────────────────────────────────────────────

/// [`encode`] straight to PNG bytes.
pub fn encode_to_png(
    file_bytes: &[u8],
    file_name:  &str,
    password:   Option<&str>,
) -> Result<Vec<u8>, CodecError> {
    let image = encode(file_bytes, file_name, password)?;
    Ok(png_io::to_png_bytes(&image)?)
}

/// [`decode`] straight from PNG bytes.
pub fn decode_png(png: &[u8], password: Option<&str>) -> Result<DecodedFile, CodecError> {
    let image = png_io::from_png_bytes(png)?;
    decode(&image, password)
}
