//! Splitting large files into several images and joining them back.
//!
//! Each part is encoded independently; the only link between parts is the
//! name stored in each header: `"{name}.part{index:03}of{total:03}"`, with
//! 1-based indices.  A file that fits in one part keeps its bare name.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::codec::DecodedFile;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("file needs {needed} parts but at most {max} are allowed")]
    TooManyChunks { needed: usize, max: usize },
    #[error("'{name}': part {index} of {total} is missing")]
    MissingPart { name: String, index: usize, total: usize },
    #[error("'{name}': parts disagree on the total count or repeat an index")]
    MismatchedParts { name: String },
}

/// Split `data` into consecutive pieces of at most `chunk_size` bytes.
/// Empty input yields a single empty piece.
pub fn split(data: &[u8], chunk_size: usize, max_chunks: usize) -> Result<Vec<&[u8]>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if data.is_empty() {
        return Ok(vec![data]);
    }
    let needed = data.len().div_ceil(chunk_size);
    if needed > max_chunks {
        return Err(ChunkError::TooManyChunks { needed, max: max_chunks });
    }
    Ok(data.chunks(chunk_size).collect())
}

/// Name stored in the header of part `index` (0-based) of `total`.
pub fn part_name(name: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        name.to_owned()
    } else {
        format!("{name}.part{:03}of{:03}", index + 1, total)
    }
}

/// Inverse of [`part_name`] for multi-part names: `(base, index, total)` with
/// a 1-based index.
pub fn parse_part_name(name: &str) -> Option<(&str, usize, usize)> {
    let (base, suffix) = name.rsplit_once(".part")?;
    let (index, total) = suffix.split_once("of")?;
    if !is_counter(index) || !is_counter(total) {
        return None;
    }
    let index: usize = index.parse().ok()?;
    let total: usize = total.parse().ok()?;
    if base.is_empty() || index == 0 || index > total {
        return None;
    }
    Some((base, index, total))
}

fn is_counter(s: &str) -> bool {
    s.len() >= 3 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Join one file's decoded parts, in any order, into the original file.
///
/// The part count comes from untrusted headers, so nothing is sized by it;
/// parts are keyed by index and the first gap is reported.
pub fn reassemble(parts: Vec<DecodedFile>) -> Result<DecodedFile, ChunkError> {
    let mut slots: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
    let mut expected: Option<(String, usize)> = None;

    for part in parts {
        let (name, index, total) = parse_part_name(&part.file_name).ok_or_else(|| {
            ChunkError::MismatchedParts { name: part.file_name.clone() }
        })?;
        let (base, count) = expected.get_or_insert_with(|| (name.to_owned(), total));
        if base.as_str() != name || *count != total {
            return Err(ChunkError::MismatchedParts { name: base.clone() });
        }
        if slots.insert(index, part.file_bytes).is_some() {
            return Err(ChunkError::MismatchedParts { name: name.to_owned() });
        }
    }

    let (file_name, total) =
        expected.ok_or_else(|| ChunkError::MismatchedParts { name: String::new() })?;
    if slots.len() != total {
        // Indices are 1..=total and unique, so a short map has a gap.
        let index = (1..=total).find(|i| !slots.contains_key(i)).unwrap_or(total);
        return Err(ChunkError::MissingPart { name: file_name, index, total });
    }

    let mut file_bytes = Vec::with_capacity(slots.values().map(Vec::len).sum());
    for bytes in slots.into_values() {
        file_bytes.extend_from_slice(&bytes);
    }
    Ok(DecodedFile { file_bytes, file_name })
}

/// Reassemble every multi-part file in `files`; everything else passes
/// through.  A part name only counts as a part when at least two inputs share
/// its base name, so a lone file that merely looks like `x.part001of002`
/// keeps its name.  Output keeps the order in which each file (or its first
/// part) appeared.
pub fn collect(files: Vec<DecodedFile>) -> Result<Vec<DecodedFile>, ChunkError> {
    let mut order: Vec<Result<DecodedFile, String>> = Vec::new();
    let mut groups: BTreeMap<String, Vec<DecodedFile>> = BTreeMap::new();

    for file in files {
        match parse_part_name(&file.file_name) {
            Some((base, _, _)) => {
                let base = base.to_owned();
                if !groups.contains_key(&base) {
                    order.push(Err(base.clone()));
                }
                groups.entry(base).or_default().push(file);
            }
            None => order.push(Ok(file)),
        }
    }

    order
        .into_iter()
        .map(|entry| match entry {
            Ok(file) => Ok(file),
            Err(base) => {
                let mut group = groups.remove(&base).unwrap_or_default();
                match group.len() {
                    1 => Ok(group.remove(0)),
                    _ => reassemble(group),
                }
            }
        })
        .collect()
}
