//! File access for event exports, with transparent decompression.
//!
//! Archived log segments are often stored compressed. [`open_file`] picks a
//! decoder from the extension so callers always see plain bytes, and
//! [`first_line`]/[`last_line`] read the boundary lines of a segment without
//! walking the whole file when it is stored uncompressed.
//!
//! # Supported Formats
//!
//! - Plain text files
//! - Gzip compressed files (.gz)
//! - Zstandard compressed files (.zst)
//!
//! # Examples
//!
//! ```no_run
//! use seclog_audit_tools::utils::reader::open_file;
//! use std::io::{BufRead, BufReader};
//!
//! let reader = open_file("Archive-Security-2025-10-03-12-00-00-123.jsonl.gz").unwrap();
//! for line in BufReader::new(reader).lines() {
//!     let line = line.unwrap();
//!     // Process line...
//! }
//! ```

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const TAIL_BLOCK: u64 = 8 * 1024;

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

/// Whether the file at `path` is decompressed on read.
pub fn is_compressed(path: impl AsRef<Path>) -> bool {
    matches!(extension(path.as_ref()), "gz" | "zst")
}

/// Opens a file with automatic decompression based on extension.
///
/// - `.gz` → Gzip decompression
/// - `.zst` → Zstandard decompression
/// - Otherwise → Plain file
pub fn open_file(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    match extension(path) {
        "gz" => Ok(Box::new(GzDecoder::new(file))),
        "zst" => {
            let decoder = zstd::Decoder::new(file).with_context(|| {
                format!("Failed to create zstd decoder for: {}", path.display())
            })?;
            Ok(Box::new(decoder))
        }
        _ => Ok(Box::new(file)),
    }
}

/// First non-blank line of the file, if any.
pub fn first_line(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    let reader = BufReader::new(open_file(path)?);
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

/// Last non-blank line of the file, if any.
///
/// Plain files are read backwards from the end in fixed blocks. Compressed
/// files cannot seek and are streamed to their end.
pub fn last_line(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if is_compressed(path) {
        let reader = BufReader::new(open_file(path)?);
        let mut last = None;
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if !line.trim().is_empty() {
                last = Some(line);
            }
        }
        return Ok(last);
    }

    let mut file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let len = file
        .seek(SeekFrom::End(0))
        .with_context(|| format!("Failed to seek in {}", path.display()))?;

    let mut tail: Vec<u8> = Vec::new();
    let mut pos = len;
    while pos > 0 {
        let step = TAIL_BLOCK.min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut block = vec![0u8; step as usize];
        file.read_exact(&mut block)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        block.extend_from_slice(&tail);
        tail = block;

        // A complete last line needs a newline before its first byte
        let trimmed_end = tail
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        if trimmed_end == 0 {
            continue;
        }
        if let Some(start) = tail[..trimmed_end].iter().rposition(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(&tail[start + 1..trimmed_end]).to_string();
            return Ok(Some(line));
        }
    }

    let trimmed_end = tail
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    if trimmed_end == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&tail[..trimmed_end]).to_string()))
}
