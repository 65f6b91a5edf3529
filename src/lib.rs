//! SEC EDGAR full-submission parser
//!
//! Recovers the submission header and the `<DOCUMENT>` blocks of an EDGAR
//! `.txt` submission in a single pass, without copying the input. Embedded
//! uuencoded attachments are decoded into owned buffers.
//!
//! ```no_run
//! let source = secsgml_scan::SubmissionSource::open("0000320193-24-000123.txt")?;
//! let parsed = secsgml_scan::parse_sgml(&source);
//! for doc in &parsed.documents.documents {
//!     println!("{} {} bytes", secsgml_scan::bytes_to_str(doc.meta.doc_type), doc.payload().len());
//! }
//! # Ok::<(), secsgml_scan::Error>(())
//! ```

mod bytes;
mod error;
pub mod header_mappings;
mod metadata;
mod parse;
mod standardize;
mod types;
pub mod uudecode;
pub mod write;

#[cfg(feature = "python")]
mod python;

pub use bytes::bytes_to_str;
pub use error::{Error, Result};
pub use metadata::parse_submission_metadata;
pub use parse::{parse_sgml, scan_documents, SubmissionSource};
pub use standardize::standardize;
pub use types::{
    ArenaSpan, Document, DocumentMeta, EventKind, ParseResult, ParseStats, ParsedSubmission,
    StandardizedEvent, StandardizedSubmissionMetadata, Status, SubmissionEvent, SubmissionFormat,
    SubmissionMetadata,
};
pub use write::{write_outputs, write_tar, WriteOptions};
