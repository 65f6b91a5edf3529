//! Submission header parsing
//!
//! The header is everything before the first `<DOCUMENT>`. It comes in two
//! dialects, both turned into the same flat stream of depth-tagged events:
//!
//! - archive: `<KEY>value` lines, sections opened by empty values and closed
//!   by `</KEY>`
//! - tab: `KEY: value` lines nested by leading tabs, optionally preceded by a
//!   privacy-enhanced message banner
//!
//! Sections still open at the end of the header are closed with synthetic
//! `SectionEnd` events (empty key).

use log::{trace, warn};
use memchr::{memchr, memmem};

use crate::bytes::{lines, trim, trim_end, trim_start};
use crate::types::{OutOfMemory, Status, SubmissionEvent, SubmissionFormat, SubmissionMetadata};

const DOC_START: &[u8] = b"<DOCUMENT>";
const PRIVACY_KEY: &[u8] = b"PRIVACY-ENHANCED-MESSAGE";
/// Wrapper tag whose opening line is dropped in archive headers
const SUBMISSION_TAG: &[u8] = b"SUBMISSION";

/// Parse the submission header of `data` into events.
pub fn parse_submission_metadata(data: &[u8]) -> SubmissionMetadata<'_> {
    let header_end = memmem::find(data, DOC_START).unwrap_or(data.len());
    let header = trim_start(&data[..header_end]);
    let format = detect_format(header);

    let mut parser = EventParser::default();
    let parsed = match format {
        SubmissionFormat::TabPrivacy => parser.parse_privacy(header),
        SubmissionFormat::TabDefault => parser.parse_tab(header),
        SubmissionFormat::Archive => parser.parse_archive(header),
    };

    let status = match parsed {
        Ok(()) => Status::Ok,
        Err(OutOfMemory) => {
            warn!(
                "out of memory after {} header events",
                parser.events.len()
            );
            Status::OutOfMemory
        }
    };
    trace!("{:?} header: {} events", format, parser.events.len());

    SubmissionMetadata {
        events: parser.events,
        format,
        status,
    }
}

/// Detect the header dialect from its first bytes (already left-trimmed)
fn detect_format(header: &[u8]) -> SubmissionFormat {
    if header.starts_with(b"-") {
        SubmissionFormat::TabPrivacy
    } else if header.starts_with(b"<SE") {
        SubmissionFormat::TabDefault
    } else {
        SubmissionFormat::Archive
    }
}

/// Split a `<KEY>value` line into trimmed key and value.
fn split_tag(line: &[u8]) -> Option<(&[u8], &[u8])> {
    if line.first() != Some(&b'<') {
        return None;
    }
    let gt = memchr(b'>', line)?;
    Some((trim(&line[1..gt]), trim(&line[gt + 1..])))
}

/// Find the first blank line, returning where it starts and ends.
fn find_blank_line(data: &[u8]) -> Option<(usize, usize)> {
    let lf = memmem::find(data, b"\n\n").map(|i| (i, i + 2));
    let crlf = memmem::find(data, b"\r\n\r\n").map(|i| (i, i + 4));
    [lf, crlf].into_iter().flatten().min_by_key(|&(start, _)| start)
}

#[derive(Default)]
struct EventParser<'a> {
    events: Vec<SubmissionEvent<'a>>,
    depth: usize,
}

impl<'a> EventParser<'a> {
    fn push(&mut self, event: SubmissionEvent<'a>) -> Result<(), OutOfMemory> {
        self.events.try_reserve(1)?;
        self.events.push(event);
        Ok(())
    }

    /// Close sections until at most `depth` remain open.
    fn close_to(&mut self, depth: usize) -> Result<(), OutOfMemory> {
        while self.depth > depth {
            self.depth -= 1;
            self.push(SubmissionEvent::section_end(&[], self.depth))?;
        }
        Ok(())
    }

    /// Apply the bracket-tag rules shared by both dialects.
    fn push_tag(&mut self, key: &'a [u8], value: &'a [u8]) -> Result<(), OutOfMemory> {
        if key.starts_with(b"/") {
            self.depth = self.depth.saturating_sub(1);
            self.push(SubmissionEvent::section_end(key, self.depth))
        } else if value.is_empty() {
            self.push(SubmissionEvent::section_start(key, self.depth))?;
            self.depth += 1;
            Ok(())
        } else {
            self.push(SubmissionEvent::key_value(key, value, self.depth))
        }
    }

    fn parse_archive(&mut self, header: &'a [u8]) -> Result<(), OutOfMemory> {
        for line in lines(header) {
            let Some((key, value)) = split_tag(trim_start(line)) else {
                continue;
            };
            // The opening SUBMISSION tag is dropped and does not nest; its
            // closing tag still goes through the normal rule.
            if key == SUBMISSION_TAG {
                continue;
            }
            self.push_tag(key, value)?;
        }
        self.close_to(0)
    }

    fn parse_privacy(&mut self, header: &'a [u8]) -> Result<(), OutOfMemory> {
        let rest = match find_blank_line(header) {
            Some((start, end)) if start > 0 && end < header.len() => {
                self.push(SubmissionEvent::key_value(
                    PRIVACY_KEY,
                    trim_end(&header[..start]),
                    0,
                ))?;
                trim_start(&header[end..])
            }
            _ => header,
        };
        self.parse_tab(rest)
    }

    fn parse_tab(&mut self, header: &'a [u8]) -> Result<(), OutOfMemory> {
        for line in lines(header) {
            let indent = line.iter().take_while(|&&b| b == b'\t').count();
            let content = trim(&line[indent..]);
            if content.is_empty() {
                continue;
            }

            self.close_to(indent)?;

            if let Some((key, value)) = split_tag(content) {
                self.push_tag(key, value)?;
            } else if let Some(colon) = memchr(b':', content) {
                let key = trim(&content[..colon]);
                let value = trim(&content[colon + 1..]);
                if value.is_empty() {
                    self.push(SubmissionEvent::section_start(key, self.depth))?;
                    self.depth += 1;
                } else {
                    self.push(SubmissionEvent::key_value(key, value, self.depth))?;
                }
            }
        }
        self.close_to(0)
    }
}
