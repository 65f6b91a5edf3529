//! Type definitions for parsed submissions
//!
//! Every span (`&'a [u8]`) borrows from the caller's input buffer, so nothing
//! produced by a parse can outlive the bytes it was parsed from. The only
//! owned data are decoded uuencode payloads and the standardizer's arena.

use serde::{Deserialize, Serialize};

/// Outcome of a parse or standardize call.
///
/// There is no "parse error": malformed markup is skipped. Results are
/// usable even when the status is not `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Ok,
    /// Growing a result structure failed.
    OutOfMemory,
    /// A uuencoded payload hit the size cap or decoded to an unexpected length.
    Truncated,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Record `other` unless a more severe status is already set.
    pub(crate) fn escalate(&mut self, other: Status) {
        match (*self, other) {
            (Status::OutOfMemory, _) | (_, Status::Ok) => {}
            _ => *self = other,
        }
    }
}

/// A `try_reserve` failed while growing a result structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutOfMemory;

impl From<std::collections::TryReserveError> for OutOfMemory {
    fn from(_: std::collections::TryReserveError) -> Self {
        OutOfMemory
    }
}

/// Header dialect detected from the first bytes of the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionFormat {
    /// Privacy-enhanced message banner followed by a tab-indented header
    TabPrivacy,
    /// `<SEC-DOCUMENT>` style tab-indented header
    TabDefault,
    /// Bracket-tag header with explicit closing tags
    #[default]
    Archive,
}

/// Per-document metadata captured between `<DOCUMENT>` and `<TEXT>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentMeta<'a> {
    pub doc_type: &'a [u8],
    pub sequence: &'a [u8],
    pub filename: &'a [u8],
    pub description: &'a [u8],
}

/// One `<DOCUMENT>` block.
///
/// `content` points into the input buffer: the trimmed, unwrapped text for
/// plain documents, or the encoded region for uuencoded ones. `decoded` holds
/// the decoded payload and is present exactly when the document is uuencoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document<'a> {
    pub meta: DocumentMeta<'a>,
    pub content: &'a [u8],
    pub decoded: Option<Vec<u8>>,
}

impl<'a> Document<'a> {
    pub fn is_uuencoded(&self) -> bool {
        self.decoded.is_some()
    }

    /// The bytes a writer should persist for this document.
    pub fn payload(&self) -> &[u8] {
        match &self.decoded {
            Some(decoded) => decoded,
            None => self.content,
        }
    }
}

/// Counters gathered while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseStats {
    pub doc_count: usize,
    pub uuencoded_count: usize,
}

/// Result of scanning a submission for documents
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseResult<'a> {
    pub documents: Vec<Document<'a>>,
    pub status: Status,
    pub stats: ParseStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    SectionStart,
    SectionEnd,
    KeyValue,
}

/// A depth-tagged header event. `value` is empty for section events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionEvent<'a> {
    pub kind: EventKind,
    pub key: &'a [u8],
    pub value: &'a [u8],
    pub depth: usize,
}

impl<'a> SubmissionEvent<'a> {
    pub fn key_value(key: &'a [u8], value: &'a [u8], depth: usize) -> Self {
        Self { kind: EventKind::KeyValue, key, value, depth }
    }

    pub fn section_start(key: &'a [u8], depth: usize) -> Self {
        Self { kind: EventKind::SectionStart, key, value: &[], depth }
    }

    pub fn section_end(key: &'a [u8], depth: usize) -> Self {
        Self { kind: EventKind::SectionEnd, key, value: &[], depth }
    }
}

/// Submission header as parsed: events borrow from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionMetadata<'a> {
    pub events: Vec<SubmissionEvent<'a>>,
    pub format: SubmissionFormat,
    pub status: Status,
}

/// Offset/length into a [`StandardizedSubmissionMetadata`] arena.
///
/// Offsets rather than slices so the arena can grow while events are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaSpan {
    pub start: usize,
    pub len: usize,
}

impl ArenaSpan {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn resolve<'a>(&self, arena: &'a [u8]) -> &'a [u8] {
        arena.get(self.start..self.start + self.len).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardizedEvent {
    pub kind: EventKind,
    pub key: ArenaSpan,
    pub value: ArenaSpan,
    pub depth: usize,
}

/// Header events with canonical keys, owning every string in one arena.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StandardizedSubmissionMetadata {
    pub arena: Vec<u8>,
    pub events: Vec<StandardizedEvent>,
    pub status: Status,
}

impl StandardizedSubmissionMetadata {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn key(&self, event: &StandardizedEvent) -> &[u8] {
        event.key.resolve(&self.arena)
    }

    pub fn value(&self, event: &StandardizedEvent) -> &[u8] {
        event.value.resolve(&self.arena)
    }

    /// Events as borrowed views into the arena.
    pub fn events(&self) -> impl Iterator<Item = SubmissionEvent<'_>> + '_ {
        self.events.iter().map(move |event| SubmissionEvent {
            kind: event.kind,
            key: self.key(event),
            value: self.value(event),
            depth: event.depth,
        })
    }
}

/// Everything parsed from one submission buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSubmission<'a> {
    pub documents: ParseResult<'a>,
    pub metadata: SubmissionMetadata<'a>,
    pub standardized: StandardizedSubmissionMetadata,
}
