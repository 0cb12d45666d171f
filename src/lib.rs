pub mod header;
pub mod pixel;
pub mod crypto;
pub mod codec;
pub mod png_io;
pub mod chunk;
pub mod config;

pub use header::{Header, HeaderFields, Signature, parse_header};
pub use pixel::{pack, unpack};
pub use codec::{CodecError, DecodedFile, EncryptionParams, decode, encode, encode_with, inspect};
pub use config::Limits;
