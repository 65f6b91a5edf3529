//! Write parsed submissions to a directory or a TAR archive
//!
//! Both layouts carry the same artifacts:
//! - `submission_metadata.json`, rebuilt from the standardized header events
//!   (omitted when there are none)
//! - `document_metadata.csv`, one row per document
//! - one file per document, named from its sanitized `<FILENAME>`

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::bytes::bytes_to_str;
use crate::error::{Error, Result};
use crate::types::{Document, EventKind, ParseResult, StandardizedSubmissionMetadata, SubmissionEvent};

pub const METADATA_JSON: &str = "submission_metadata.json";
pub const DOCUMENT_CSV: &str = "document_metadata.csv";
const CSV_HEADER: &[u8] = b"TYPE,SEQUENCE,FILENAME,DESCRIPTION\n";

/// TAR block size
const BLOCK_SIZE: usize = 512;
const TAR_NAME_LEN: usize = 100;

/// Which documents to write.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Only write documents whose `<TYPE>` is listed. Empty means all.
    pub filter_document_types: Vec<String>,
    /// Keep CSV rows for documents the filter skipped.
    pub keep_filtered_metadata: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_document_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn keep_filtered_metadata(mut self, keep: bool) -> Self {
        self.keep_filtered_metadata = keep;
        self
    }

    pub(crate) fn selects(&self, doc: &Document<'_>) -> bool {
        self.filter_document_types.is_empty()
            || self
                .filter_document_types
                .iter()
                .any(|t| t.as_bytes() == doc.meta.doc_type)
    }

    pub(crate) fn lists(&self, doc: &Document<'_>) -> bool {
        self.keep_filtered_metadata || self.selects(doc)
    }
}

/// Write all artifacts into `dir`, creating it if needed.
///
/// A document that cannot be written is logged and skipped; the metadata
/// files are required.
pub fn write_outputs(
    dir: impl AsRef<Path>,
    result: &ParseResult<'_>,
    metadata: &StandardizedSubmissionMetadata,
    options: &WriteOptions,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| Error::OutputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    if let Some(json) = metadata_json(metadata)? {
        fs::write(dir.join(METADATA_JSON), json)?;
    }
    fs::write(dir.join(DOCUMENT_CSV), document_csv(result, options))?;

    for (index, doc) in result.documents.iter().enumerate() {
        if !options.selects(doc) {
            continue;
        }
        let path = dir.join(sanitize_filename(doc.meta.filename, index + 1));
        match fs::write(&path, doc.payload()) {
            Ok(()) => debug!("wrote {} ({} bytes)", path.display(), doc.payload().len()),
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }

    Ok(())
}

/// Write all artifacts into a single TAR file at `path`.
pub fn write_tar(
    path: impl AsRef<Path>,
    result: &ParseResult<'_>,
    metadata: &StandardizedSubmissionMetadata,
    options: &WriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| Error::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    write_tar_writer(&mut writer, result, metadata, options)?;
    writer.flush()?;
    Ok(())
}

/// Write the TAR stream to any destination
pub fn write_tar_writer<W: Write>(
    writer: &mut W,
    result: &ParseResult<'_>,
    metadata: &StandardizedSubmissionMetadata,
    options: &WriteOptions,
) -> Result<()> {
    if let Some(json) = metadata_json(metadata)? {
        write_tar_entry(writer, METADATA_JSON, &json)?;
    }
    write_tar_entry(writer, DOCUMENT_CSV, &document_csv(result, options))?;

    for (index, doc) in result.documents.iter().enumerate() {
        if options.selects(doc) {
            let name = sanitize_filename(doc.meta.filename, index + 1);
            write_tar_entry(writer, &name, doc.payload())?;
        }
    }

    // End-of-archive: two zero blocks
    writer.write_all(&[0u8; BLOCK_SIZE * 2])?;
    Ok(())
}

fn metadata_json(metadata: &StandardizedSubmissionMetadata) -> Result<Option<Vec<u8>>> {
    if metadata.is_empty() {
        return Ok(None);
    }
    let events: Vec<SubmissionEvent<'_>> = metadata.events().collect();
    Ok(Some(serde_json::to_vec_pretty(&events_to_json(&events))?))
}

/// Rebuild a nested JSON object from depth-tagged events.
///
/// A section's members are the events one level deeper up to the next
/// `SectionEnd` at the section's own depth. Keys seen more than once at one
/// level become an array at the position of their first occurrence.
pub fn events_to_json(events: &[SubmissionEvent<'_>]) -> Value {
    Value::Object(object_from_range(events, 0))
}

fn object_from_range(events: &[SubmissionEvent<'_>], depth: usize) -> Map<String, Value> {
    let mut object = Map::new();
    let mut i = 0;

    while i < events.len() {
        let event = &events[i];
        i += 1;
        if event.depth != depth {
            continue;
        }

        let value = match event.kind {
            EventKind::SectionEnd => continue,
            EventKind::KeyValue => Value::String(bytes_to_str(event.value).into_owned()),
            EventKind::SectionStart => {
                let end = events[i..]
                    .iter()
                    .position(|e| e.kind == EventKind::SectionEnd && e.depth == depth)
                    .map_or(events.len(), |offset| i + offset);
                let section = object_from_range(&events[i..end], depth + 1);
                i = end;
                Value::Object(section)
            }
        };

        insert_collapsing(&mut object, bytes_to_str(event.key).into_owned(), value);
    }

    object
}

fn insert_collapsing(object: &mut Map<String, Value>, key: String, value: Value) {
    match object.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            object.insert(key, value);
        }
    }
}

/// `document_metadata.csv` contents
pub fn document_csv(result: &ParseResult<'_>, options: &WriteOptions) -> Vec<u8> {
    let mut csv = CSV_HEADER.to_vec();
    for doc in result.documents.iter().filter(|doc| options.lists(doc)) {
        let meta = &doc.meta;
        let cells = [meta.doc_type, meta.sequence, meta.filename, meta.description];
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                csv.push(b',');
            }
            push_csv_cell(&mut csv, cell);
        }
        csv.push(b'\n');
    }
    csv
}

fn push_csv_cell(out: &mut Vec<u8>, cell: &[u8]) {
    if !cell.iter().any(|b| matches!(b, b'"' | b',' | b'\r' | b'\n')) {
        out.extend_from_slice(cell);
        return;
    }
    out.push(b'"');
    for &b in cell {
        if b == b'"' {
            out.push(b'"');
        }
        out.push(b);
    }
    out.push(b'"');
}

/// File name for a document: `\ / : * ? " < > |` become `_`, and an empty
/// name becomes `doc_<n>.bin` (`n` is 1-based).
pub fn sanitize_filename(filename: &[u8], n: usize) -> String {
    if filename.is_empty() {
        return format!("doc_{n}.bin");
    }
    bytes_to_str(filename)
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Calculate padding needed to reach next block boundary
fn pad_to_block(size: usize) -> usize {
    match size % BLOCK_SIZE {
        0 => 0,
        remainder => BLOCK_SIZE - remainder,
    }
}

/// Write a single TAR entry (header + content + padding)
fn write_tar_entry<W: Write>(writer: &mut W, name: &str, content: &[u8]) -> Result<()> {
    writer.write_all(&build_tar_header(name, content.len()))?;
    writer.write_all(content)?;
    writer.write_all(&[0u8; BLOCK_SIZE][..pad_to_block(content.len())])?;
    Ok(())
}

/// Build a USTAR header for a regular file. Names longer than 100 bytes are
/// cut.
fn build_tar_header(name: &str, size: usize) -> [u8; BLOCK_SIZE] {
    let mut header = [0u8; BLOCK_SIZE];

    let name = name.as_bytes();
    let name_len = name.len().min(TAR_NAME_LEN);
    header[..name_len].copy_from_slice(&name[..name_len]);

    // mode, uid, gid: NUL-terminated octal
    header[100..107].copy_from_slice(b"0000644");
    header[108..115].copy_from_slice(b"0000000");
    header[116..123].copy_from_slice(b"0000000");

    header[124..135].copy_from_slice(format!("{size:011o}").as_bytes());
    // mtime
    header[136..147].copy_from_slice(b"00000000000");

    // Checksum is computed with its own field set to spaces.
    header[148..156].copy_from_slice(b"        ");
    header[156] = b'0';
    header[257..263].copy_from_slice(b"ustar\0");
    header[263..265].copy_from_slice(b"00");

    let checksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
    header[148..156].copy_from_slice(format!("{checksum:06o}\0 ").as_bytes());

    header
}
