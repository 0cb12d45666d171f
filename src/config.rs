//! Size limits for the command-line layer.
//!
//! The codec itself never enforces a size; these limits only decide how the
//! CLI splits large inputs into parts.  A limits file is plain JSON and any
//! field it omits keeps its default:
//!
//! ```json
//! { "chunk_size": 262144000, "max_chunks": 2000 }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// 500 MiB per part.
pub const DEFAULT_CHUNK_SIZE: u64 = 500 * 1024 * 1024;
pub const DEFAULT_MAX_CHUNKS: usize = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid limits file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("input is {size} bytes but at most {max} fit in {max_chunks} parts")]
    TooLarge { size: u64, max: u64, max_chunks: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Split files larger than `chunk_size` into several images.
    pub enable_auto_chunking: bool,
    pub chunk_size:           u64,
    pub max_chunks:           usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            enable_auto_chunking: true,
            chunk_size:           DEFAULT_CHUNK_SIZE,
            max_chunks:           DEFAULT_MAX_CHUNKS,
        }
    }
}

impl Limits {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let limits: Limits = serde_json::from_str(text)?;
        if limits.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(limits)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Largest input the CLI accepts: `chunk_size × max_chunks`.
    pub fn max_file_size(&self) -> u64 {
        self.chunk_size.saturating_mul(self.max_chunks as u64)
    }

    /// Reject inputs that would need more than `max_chunks` parts.  Without
    /// auto-chunking everything goes into one image and any size is accepted.
    pub fn check_file_size(&self, size: u64) -> Result<(), ConfigError> {
        if self.enable_auto_chunking && size > self.max_file_size() {
            return Err(ConfigError::TooLarge {
                size,
                max: self.max_file_size(),
                max_chunks: self.max_chunks,
            });
        }
        Ok(())
    }
}

/// Human-readable size with two decimals, e.g. `"1.50 KB"`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}
