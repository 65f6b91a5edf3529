//! Core SGML scanning logic
//!
//! One pass over the buffer, jumping from `<` to `<` and dispatching on the
//! bytes that follow. Only a handful of tags matter; every other `<`, and any
//! recognized tag seen in the wrong state, is ignored.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use log::{debug, trace, warn};
use memchr::{memchr, memchr3, memmem};
use memmap2::Mmap;

use crate::bytes::{trim, trim_end, trim_start};
use crate::error::Result;
use crate::metadata::parse_submission_metadata;
use crate::standardize::standardize;
use crate::types::*;
use crate::uudecode;

/// Wrapper tags stripped from the edges of plain text content
const WRAPPERS: [(&[u8], &[u8]); 3] = [
    (b"<PDF>", b"</PDF>"),
    (b"<XBRL>", b"</XBRL>"),
    (b"<XML>", b"</XML>"),
];

/// Tags the scanner reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Document,
    EndDocument,
    Text,
    EndText,
    Type,
    Sequence,
    Filename,
    Description,
}

impl Tag {
    fn literal(self) -> &'static [u8] {
        match self {
            Tag::Document => b"<DOCUMENT>",
            Tag::EndDocument => b"</DOCUMENT>",
            Tag::Text => b"<TEXT>",
            Tag::EndText => b"</TEXT>",
            Tag::Type => b"<TYPE>",
            Tag::Sequence => b"<SEQUENCE>",
            Tag::Filename => b"<FILENAME>",
            Tag::Description => b"<DESCRIPTION>",
        }
    }

    /// Match a tag at the start of `rest`, which begins with `<`.
    ///
    /// `DOCUMENT`/`DESCRIPTION` and `TEXT`/`TYPE` share a first letter, as do
    /// the two closing tags, so the second byte after `<` breaks the tie.
    fn match_at(rest: &[u8]) -> Option<Tag> {
        let candidate = match (*rest.get(1)?, rest.get(2).copied()) {
            (b'D', Some(b'O')) => Tag::Document,
            (b'D', Some(b'E')) => Tag::Description,
            (b'T', Some(b'E')) => Tag::Text,
            (b'T', Some(b'Y')) => Tag::Type,
            (b'S', _) => Tag::Sequence,
            (b'F', _) => Tag::Filename,
            (b'/', Some(b'D')) => Tag::EndDocument,
            (b'/', Some(b'T')) => Tag::EndText,
            _ => return None,
        };
        rest.starts_with(candidate.literal()).then_some(candidate)
    }
}

/// Scanner state; the document under construction lives inside it.
enum ScanState<'a> {
    Between,
    InDocumentMeta(Document<'a>),
    InText {
        doc: Document<'a>,
        text_start: usize,
    },
}

/// Scan `data` for `<DOCUMENT>` blocks, in source order.
///
/// A document is only emitted when its `</DOCUMENT>` is reached; anything
/// unterminated at end of input is dropped.
pub fn scan_documents(data: &[u8]) -> ParseResult<'_> {
    scan_documents_with_limit(data, uudecode::UU_DECODE_MAX)
}

/// Like [`scan_documents`], with an explicit cap on each decoded payload.
pub(crate) fn scan_documents_with_limit(data: &[u8], limit: usize) -> ParseResult<'_> {
    let mut result = ParseResult::default();
    let mut state = ScanState::Between;
    let closing = memmem::Finder::new(b"</");

    let mut pos = 0;
    while pos < data.len() {
        // Inside a text block only closing tags can change anything.
        let found = match state {
            ScanState::InText { .. } => closing.find(&data[pos..]),
            _ => memchr(b'<', &data[pos..]),
        };
        let Some(offset) = found else {
            break;
        };
        let lt = pos + offset;

        let Some(tag) = Tag::match_at(&data[lt..]) else {
            pos = lt + 1;
            continue;
        };
        pos = lt + tag.literal().len();

        state = match (state, tag) {
            (ScanState::Between, Tag::Document) => ScanState::InDocumentMeta(Document::default()),

            (ScanState::InDocumentMeta(mut doc), Tag::Type) => {
                doc.meta.doc_type = value_to_eol(data, pos);
                ScanState::InDocumentMeta(doc)
            }
            (ScanState::InDocumentMeta(mut doc), Tag::Sequence) => {
                doc.meta.sequence = value_to_eol(data, pos);
                ScanState::InDocumentMeta(doc)
            }
            (ScanState::InDocumentMeta(mut doc), Tag::Filename) => {
                doc.meta.filename = value_to_eol(data, pos);
                ScanState::InDocumentMeta(doc)
            }
            (ScanState::InDocumentMeta(mut doc), Tag::Description) => {
                doc.meta.description = value_to_eol(data, pos);
                ScanState::InDocumentMeta(doc)
            }

            (ScanState::InDocumentMeta(doc), Tag::Text) => ScanState::InText {
                doc,
                text_start: pos,
            },
            (ScanState::InText { mut doc, text_start }, Tag::EndText) => {
                finalize_text(&mut doc, &data[text_start..lt], limit, &mut result);
                ScanState::InDocumentMeta(doc)
            }

            (ScanState::InDocumentMeta(doc) | ScanState::InText { doc, .. }, Tag::EndDocument) => {
                if result.documents.try_reserve(1).is_err() {
                    warn!(
                        "out of memory after {} documents, stopping scan",
                        result.documents.len()
                    );
                    result.status = Status::OutOfMemory;
                    return result;
                }
                trace!("committing document {} at byte {}", result.documents.len() + 1, lt);
                result.documents.push(doc);
                result.stats.doc_count += 1;
                ScanState::Between
            }

            (state, _) => state,
        };
    }

    result
}

/// Resolve the content of a finished `<TEXT>` block.
fn finalize_text<'a>(
    doc: &mut Document<'a>,
    text: &'a [u8],
    limit: usize,
    result: &mut ParseResult<'a>,
) {
    let Some(region) = uudecode::find_encoded_region(text) else {
        doc.content = strip_wrappers(text);
        doc.decoded = None;
        return;
    };

    let encoded = &text[region];
    doc.content = encoded;
    result.stats.uuencoded_count += 1;

    let decoded = uudecode::decode_with_limit(encoded, limit);
    debug!(
        "uudecoded {:?}: {} encoded bytes -> {} bytes ({:?})",
        crate::bytes::bytes_to_str(doc.meta.filename),
        encoded.len(),
        decoded.data.len(),
        decoded.status
    );
    result.status.escalate(decoded.status);
    doc.decoded = match decoded.status {
        Status::OutOfMemory => {
            warn!("out of memory decoding a uuencoded payload, keeping encoded text");
            None
        }
        _ => Some(decoded.data),
    };
}

/// Trimmed value between a metadata tag and the end of its line, or the
/// next tag when several share one line.
#[inline]
fn value_to_eol(data: &[u8], from: usize) -> &[u8] {
    let end = memchr3(b'\n', b'\r', b'<', &data[from..]).map_or(data.len(), |i| from + i);
    trim(&data[from..end])
}

/// Trim plain text and strip `<PDF>`, `<XBRL>` or `<XML>` wrappers.
///
/// Opening and closing tags are stripped independently of each other.
fn strip_wrappers(content: &[u8]) -> &[u8] {
    let mut content = trim(content);
    for (open, close) in WRAPPERS {
        if let Some(rest) = content.strip_prefix(open) {
            content = trim_start(rest);
        }
        if let Some(rest) = content.strip_suffix(close) {
            content = trim_end(rest);
        }
    }
    content
}

/// Parse everything in one call: documents, header events, and the
/// standardized header.
pub fn parse_sgml(data: &[u8]) -> ParsedSubmission<'_> {
    let metadata = parse_submission_metadata(data);
    let standardized = standardize(&metadata);
    let documents = scan_documents(data);

    ParsedSubmission {
        documents,
        metadata,
        standardized,
    }
}

/// Input bytes for a parse, memory mapped from disk.
pub enum SubmissionSource {
    Mapped(Mmap),
    Empty,
}

impl SubmissionSource {
    /// Map a submission file. Empty files yield an empty buffer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(SubmissionSource::Empty);
        }
        // SAFETY: the mapping is read-only; the file must not be truncated
        // while mapped, which is the usual contract for parsing from mmap.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(SubmissionSource::Mapped(mmap))
    }
}

impl Deref for SubmissionSource {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SubmissionSource::Mapped(mmap) => mmap,
            SubmissionSource::Empty => &[],
        }
    }
}
