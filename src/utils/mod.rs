//! Utility functions and helpers shared by the audit pipeline and commands.
//!
//! - [`format`] - Number and text formatting for report tables
//! - [`progress`] - Spinners for long source reads
//! - [`reader`] - File access with automatic decompression and boundary reads
//! - [`time`] - Timestamp parsing, day boundaries and report time zones
//!
//! # Examples
//!
//! ## Parsing timestamps
//!
//! ```
//! use seclog_audit_tools::utils::time::parse_timestamp;
//!
//! let timestamp = parse_timestamp("2025-10-20T10:30:00.000Z").unwrap();
//! assert_eq!(timestamp.to_rfc3339(), "2025-10-20T10:30:00+00:00");
//! ```
//!
//! ## Reading compressed segments
//!
//! ```no_run
//! use seclog_audit_tools::utils::reader::open_file;
//! use std::io::{BufRead, BufReader};
//!
//! // Automatically decompresses .gz and .zst files
//! let reader = open_file("Archive-Security-2025-10-03-12-00-00-123.jsonl.gz").unwrap();
//! for line in BufReader::new(reader).lines() {
//!     println!("{}", line.unwrap());
//! }
//! ```

pub mod format;
pub mod progress;
pub mod reader;
pub mod time;
