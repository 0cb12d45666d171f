//! Fixed-layout header prefixed to every ColorCrypt payload.
//!
//! # Layout
//! ```text
//! off  size  field
//!   0     2  signature        "ER" (plain) | "EC" (encrypted)
//!   2     8  payload length   u64 little-endian
//!  10   256  file name        UTF-8, zero-padded
//! 266    20  SHA-1            digest of the bytes following the header
//! 286    32  salt             encrypted variant only
//! 318    16  IV               encrypted variant only
//! ```
//! The signature alone selects the header length and the parse path.
//! When encrypted, both the length and the digest describe the ciphertext.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

pub const SIGNATURE_PLAIN:     &[u8; 2] = b"ER";
pub const SIGNATURE_ENCRYPTED: &[u8; 2] = b"EC";

pub const SIGNATURE_LEN:      usize = 2;
pub const LENGTH_FIELD_LEN:   usize = 8;
pub const FILENAME_FIELD_LEN: usize = 256;
pub const DIGEST_LEN:         usize = 20;
pub const SALT_LEN:           usize = 32;
pub const IV_LEN:             usize = 16;

/// 286 bytes.
pub const PLAIN_HEADER_LEN: usize =
    SIGNATURE_LEN + LENGTH_FIELD_LEN + FILENAME_FIELD_LEN + DIGEST_LEN;
/// 334 bytes.
pub const ENCRYPTED_HEADER_LEN: usize = PLAIN_HEADER_LEN + SALT_LEN + IV_LEN;

pub type Digest = [u8; DIGEST_LEN];
pub type Salt   = [u8; SALT_LEN];
pub type Iv     = [u8; IV_LEN];

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Filename too long: {0} bytes UTF-8 (max {FILENAME_FIELD_LEN})")]
    FilenameTooLong(usize),
    #[error("Insufficient data for header: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },
    #[error("Invalid signature {0:02x?}: not a ColorCrypt image")]
    UnrecognizedFormat([u8; SIGNATURE_LEN]),
    #[error("Embedded filename is not valid UTF-8")]
    InvalidFilename,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Signature ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Plain,
    Encrypted,
}

impl Signature {
    pub fn from_bytes(bytes: &[u8; SIGNATURE_LEN]) -> Option<Self> {
        match bytes {
            b if b == SIGNATURE_PLAIN     => Some(Signature::Plain),
            b if b == SIGNATURE_ENCRYPTED => Some(Signature::Encrypted),
            _ => None,
        }
    }

    pub fn as_bytes(self) -> &'static [u8; SIGNATURE_LEN] {
        match self {
            Signature::Plain     => SIGNATURE_PLAIN,
            Signature::Encrypted => SIGNATURE_ENCRYPTED,
        }
    }

    /// Total header length implied by this signature.
    pub fn header_len(self) -> usize {
        match self {
            Signature::Plain     => PLAIN_HEADER_LEN,
            Signature::Encrypted => ENCRYPTED_HEADER_LEN,
        }
    }
}

/// Classify the first two bytes of `bytes` without parsing the rest.
pub fn peek_signature(bytes: &[u8]) -> Result<Signature, HeaderError> {
    if bytes.len() < SIGNATURE_LEN {
        return Err(HeaderError::TruncatedHeader {
            needed:    SIGNATURE_LEN,
            available: bytes.len(),
        });
    }
    let raw = [bytes[0], bytes[1]];
    Signature::from_bytes(&raw).ok_or(HeaderError::UnrecognizedFormat(raw))
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Fields shared by both header variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFields {
    /// Byte length of the body that follows the header.
    pub payload_len: u64,
    pub file_name:   String,
    /// SHA-1 of the body.
    pub digest:      Digest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Plain(HeaderFields),
    Encrypted {
        fields: HeaderFields,
        salt:   Salt,
        iv:     Iv,
    },
}

impl Header {
    pub fn signature(&self) -> Signature {
        match self {
            Header::Plain(_)          => Signature::Plain,
            Header::Encrypted { .. }  => Signature::Encrypted,
        }
    }

    pub fn fields(&self) -> &HeaderFields {
        match self {
            Header::Plain(f)                => f,
            Header::Encrypted { fields, .. } => fields,
        }
    }

    /// Offset of the first body byte.
    pub fn data_offset(&self) -> usize {
        self.signature().header_len()
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Header::Encrypted { .. })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, HeaderError> {
        let f = self.fields();
        let name = f.file_name.as_bytes();
        Ok(match self {
            Header::Plain(_) => {
                build_plain_header(f.payload_len, name, &f.digest)?.to_vec()
            }
            Header::Encrypted { salt, iv, .. } => {
                build_encrypted_header(f.payload_len, name, &f.digest, salt, iv)?.to_vec()
            }
        })
    }
}

// ── Build ────────────────────────────────────────────────────────────────────

pub fn build_plain_header(
    payload_len: u64,
    file_name:   &[u8],
    digest:      &Digest,
) -> Result<[u8; PLAIN_HEADER_LEN], HeaderError> {
    let mut out = [0u8; PLAIN_HEADER_LEN];
    write_common(&mut out[..], Signature::Plain, payload_len, file_name, digest)?;
    Ok(out)
}

pub fn build_encrypted_header(
    payload_len: u64,
    file_name:   &[u8],
    digest:      &Digest,
    salt:        &Salt,
    iv:          &Iv,
) -> Result<[u8; ENCRYPTED_HEADER_LEN], HeaderError> {
    let mut out = [0u8; ENCRYPTED_HEADER_LEN];
    let mut w = &mut out[..];
    write_common(&mut w, Signature::Encrypted, payload_len, file_name, digest)?;
    w.write_all(salt)?;
    w.write_all(iv)?;
    Ok(out)
}

fn write_common<W: Write>(
    mut writer:  W,
    signature:   Signature,
    payload_len: u64,
    file_name:   &[u8],
    digest:      &Digest,
) -> Result<(), HeaderError> {
    if file_name.len() > FILENAME_FIELD_LEN {
        return Err(HeaderError::FilenameTooLong(file_name.len()));
    }
    let mut name_field = [0u8; FILENAME_FIELD_LEN];
    name_field[..file_name.len()].copy_from_slice(file_name);

    writer.write_all(signature.as_bytes())?;
    writer.write_u64::<LittleEndian>(payload_len)?;
    writer.write_all(&name_field)?;
    writer.write_all(digest)?;
    Ok(())
}

// ── Parse ────────────────────────────────────────────────────────────────────

/// Parse the header at the start of `bytes`. Trailing body bytes are ignored.
pub fn parse_header(bytes: &[u8]) -> Result<Header, HeaderError> {
    let signature = peek_signature(bytes)?;
    let needed = signature.header_len();
    if bytes.len() < needed {
        return Err(HeaderError::TruncatedHeader { needed, available: bytes.len() });
    }

    let mut reader = &bytes[SIGNATURE_LEN..needed];
    let payload_len = reader.read_u64::<LittleEndian>()?;
    let mut name_field = [0u8; FILENAME_FIELD_LEN];
    reader.read_exact(&mut name_field)?;
    let mut digest = [0u8; DIGEST_LEN];
    reader.read_exact(&mut digest)?;

    let fields = HeaderFields {
        payload_len,
        file_name: decode_file_name(&name_field)?,
        digest,
    };

    Ok(match signature {
        Signature::Plain => Header::Plain(fields),
        Signature::Encrypted => {
            let mut salt = [0u8; SALT_LEN];
            reader.read_exact(&mut salt)?;
            let mut iv = [0u8; IV_LEN];
            reader.read_exact(&mut iv)?;
            Header::Encrypted { fields, salt, iv }
        }
    })
}

fn decode_file_name(field: &[u8]) -> Result<String, HeaderError> {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8(field[..end].to_vec()).map_err(|_| HeaderError::InvalidFilename)
}
