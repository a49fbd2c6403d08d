//! # Security Event Log Audit Tools
//!
//! Command-line tools for auditing authentication and account lifecycle
//! activity in Windows security event logs, across the live log and its
//! archived segments.
//!
//! ## Overview
//!
//! Security logs roll over into archive files named
//! `Archive-Security-YYYY-MM-DD-HH-MM-SS-fff.<ext>`. Answering "what did these
//! accounts do last month" means reading several of them plus the live log.
//! This crate does that in one pass:
//!
//! 1. each archive is probed for the day window it covers
//! 2. archives outside the requested range are skipped without being read
//! 3. the remaining sources are queried with one compiled predicate
//! 4. matching records are normalized into fixed-column rows
//! 5. every source gets its own CSV, plus an optional consolidated CSV and a
//!    per-account summary
//!
//! Sources are read as JSON-lines exports (`.jsonl`, optionally `.gz` or
//! `.zst`), one event per line:
//!
//! ```text
//! {"EventID":4771,"TimeCreated":"2025-10-02T08:15:00.000Z","EventData":{"TargetUserName":"alice","Status":"0x18"}}
//! ```
//!
//! ## Architecture
//!
//! - [`audit`] - pipeline stages and data structures
//! - [`commands`] - `auth` and `lifecycle` command implementations
//! - [`utils`] - shared utilities (file reading, progress, time parsing)
//!
//! ## Example Usage
//!
//! ```bash
//! # Failed logons for two accounts over October, newest first
//! seclog-audit auth --start 2025-10-01 --end 2025-10-31 \
//!     --accounts alice,bob --scope failure --order newest \
//!     --archive-dir /var/log/security --live Security.jsonl --summary
//!
//! # Account lifecycle changes, timestamps in UTC+2
//! seclog-audit lifecycle --start 2025-10-01 --end 2025-10-31 \
//!     --archive-dir /var/log/security --sources archives --utc-offset +02:00
//! ```
//!
//! ## Library Usage
//!
//! ```
//! use seclog_audit_tools::audit::predicate::{AccountFilter, QueryPredicate, TimeRange};
//! use seclog_audit_tools::audit::types::AuditMode;
//!
//! let range = TimeRange::parse("2025-10-01", "2025-10-31").unwrap();
//! let accounts = AccountFilter::from_names(["alice"]).unwrap();
//! let predicate = QueryPredicate::build(
//!     AuditMode::Authentication,
//!     &AuditMode::Authentication.default_kinds(),
//!     range,
//!     accounts,
//! )
//! .unwrap();
//! assert!(predicate.xpath().contains("'alice'"));
//! ```

pub mod audit;
pub mod commands;
pub mod utils;
