//! Property-based tests for the scanner, the header parser and the uuencode
//! decoder
//!
//! These check invariants that must hold for any input, not just
//! well-formed submissions.

use proptest::prelude::*;
use secsgml_scan::uudecode::{decode, decode_scalar};
use secsgml_scan::{
    parse_submission_metadata, scan_documents, standardize, EventKind, Status, SubmissionEvent,
    SubmissionFormat,
};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

/// Encode with 45-byte lines and a `` ` `` terminator line.
fn uuencode(data: &[u8]) -> Vec<u8> {
    let enc = |v: u8| if v == 0 { b'`' } else { v + b' ' };
    let mut out = Vec::new();
    for chunk in data.chunks(45) {
        out.push(enc(chunk.len() as u8));
        for group in chunk.chunks(3) {
            let b = [group[0], *group.get(1).unwrap_or(&0), *group.get(2).unwrap_or(&0)];
            out.push(enc(b[0] >> 2));
            out.push(enc(((b[0] & 0x03) << 4) | (b[1] >> 4)));
            out.push(enc(((b[1] & 0x0f) << 2) | (b[2] >> 6)));
            out.push(enc(b[2] & 0x3f));
        }
        out.push(b'\n');
    }
    out.extend_from_slice(b"`\n");
    out
}

/// Depth of every event must equal the number of sections open before it.
///
/// Lenient: a closing tag with nothing open is tolerated, as random tag soup
/// produces them.
fn assert_well_nested(events: &[SubmissionEvent<'_>]) {
    let mut open = 0usize;
    for event in events {
        match event.kind {
            EventKind::SectionStart => {
                assert_eq!(event.depth, open);
                open += 1;
            }
            EventKind::SectionEnd => {
                open = open.saturating_sub(1);
                assert_eq!(event.depth, open);
            }
            EventKind::KeyValue => assert_eq!(event.depth, open),
        }
    }
    assert_eq!(open, 0, "sections left open");
}

/// Every `SectionEnd` must pop a matching open `SectionStart`.
fn assert_strictly_nested(events: &[SubmissionEvent<'_>]) {
    let mut open: Vec<&[u8]> = Vec::new();
    for event in events {
        match event.kind {
            EventKind::SectionStart => {
                assert_eq!(event.depth, open.len());
                open.push(event.key);
            }
            EventKind::SectionEnd => {
                let start = open
                    .pop()
                    .unwrap_or_else(|| panic!("unmatched section end {event:?}"));
                assert_eq!(event.depth, open.len());
                if let Some(name) = event.key.strip_prefix(b"/") {
                    assert_eq!(name, start);
                }
            }
            EventKind::KeyValue => assert_eq!(event.depth, open.len()),
        }
    }
    assert!(open.is_empty(), "sections left open");
}

/// A header entry: a single field or a section holding more entries
#[derive(Debug, Clone)]
enum Entry {
    Field(String, String),
    Section(String, Vec<Entry>),
}

type OwnedEvent = (EventKind, Vec<u8>, Vec<u8>, usize);

fn entry_key() -> impl Strategy<Value = String> {
    "[A-Z][A-Z-]{0,8}".prop_filter("reserved tag", |key| key != "DOCUMENT")
}

fn entry() -> impl Strategy<Value = Entry> {
    let field = (entry_key(), "[a-z0-9]{1,8}").prop_map(|(key, value)| Entry::Field(key, value));
    field.prop_recursive(4, 64, 6, |inner| {
        (entry_key(), prop::collection::vec(inner, 0..6))
            .prop_map(|(key, children)| Entry::Section(key, children))
    })
}

/// Render `<KEY>value` lines with explicit closing tags, recording the
/// events the parser should produce.
fn render_archive(
    entries: &[Entry],
    depth: usize,
    text: &mut String,
    events: &mut Vec<OwnedEvent>,
) {
    for entry in entries {
        match entry {
            Entry::Field(key, value) => {
                text.push_str(&format!("<{key}>{value}\n"));
                events.push((EventKind::KeyValue, key.clone().into(), value.clone().into(), depth));
            }
            Entry::Section(key, children) => {
                text.push_str(&format!("<{key}>\n"));
                events.push((EventKind::SectionStart, key.clone().into(), Vec::new(), depth));
                render_archive(children, depth + 1, text, events);
                text.push_str(&format!("</{key}>\n"));
                events.push((EventKind::SectionEnd, format!("/{key}").into(), Vec::new(), depth));
            }
        }
    }
}

/// Render tab-indented `KEY: value` lines; sections close through indentation.
fn render_tab(
    entries: &[Entry],
    depth: usize,
    text: &mut String,
    events: &mut Vec<OwnedEvent>,
) {
    let indent = "\t".repeat(depth);
    for entry in entries {
        match entry {
            Entry::Field(key, value) => {
                text.push_str(&format!("{indent}{key}:\t{value}\n"));
                events.push((EventKind::KeyValue, key.clone().into(), value.clone().into(), depth));
            }
            Entry::Section(key, children) => {
                text.push_str(&format!("{indent}{key}:\n"));
                events.push((EventKind::SectionStart, key.clone().into(), Vec::new(), depth));
                render_tab(children, depth + 1, text, events);
                events.push((EventKind::SectionEnd, Vec::new(), Vec::new(), depth));
            }
        }
    }
}

fn owned(events: &[SubmissionEvent<'_>]) -> Vec<OwnedEvent> {
    events
        .iter()
        .map(|event| (event.kind, event.key.to_vec(), event.value.to_vec(), event.depth))
        .collect()
}

/// Uuencoded lines: a length char followed by characters from the alphabet
fn uu_line() -> impl Strategy<Value = Vec<u8>> {
    (b'!'..=b'M', prop::collection::vec(b' '..=b'`', 0..64)).prop_map(|(len, mut body)| {
        body.insert(0, len);
        body.push(b'\n');
        body
    })
}

/// Header lines in either dialect
fn header_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "\t{0,3}[A-Z ]{1,12}:\t*[a-z0-9 ]{0,8}",
        "<[A-Z-]{1,10}>[a-z0-9]{0,6}",
        "</[A-Z-]{1,10}>",
        "[a-z ]{0,10}",
    ]
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn scanner_never_panics(input in prop::collection::vec(any::<u8>(), 0..2000)) {
        let result = scan_documents(&input);
        prop_assert_eq!(result.stats.doc_count, result.documents.len());
    }

    #[test]
    fn scanner_never_panics_on_tag_soup(
        input in "(<DOCUMENT>|</DOCUMENT>|<TEXT>|</TEXT>|<TYPE>x\n|<FILENAME>f\n|begin 644 a\n|#0V%T\n|end\n|[a-z \n<>/]{0,8}){0,40}"
    ) {
        let result = scan_documents(input.as_bytes());
        let closes = input.matches("</DOCUMENT>").count();
        prop_assert!(result.documents.len() <= closes);
    }

    #[test]
    fn vector_and_scalar_decoders_agree(lines in prop::collection::vec(uu_line(), 0..40)) {
        let encoded = lines.concat();
        prop_assert_eq!(decode(&encoded), decode_scalar(&encoded));
    }

    #[test]
    fn decode_recovers_encoded_bytes(payload in prop::collection::vec(any::<u8>(), 0..2000)) {
        let decoded = decode(&uuencode(&payload));
        prop_assert_eq!(decoded.status, Status::Ok);
        prop_assert_eq!(decoded.data, payload);
    }

    #[test]
    fn header_events_are_well_nested(lines in prop::collection::vec(header_line(), 0..40)) {
        for prefix in ["", "<SEC-HEADER>x\n", "-----BEGIN\nProc-Type: 1\n\n"] {
            let header = format!("{prefix}{}", lines.join("\n"));
            let metadata = parse_submission_metadata(header.as_bytes());
            prop_assert_eq!(metadata.status, Status::Ok);
            assert_well_nested(&metadata.events);
        }
    }

    #[test]
    fn archive_header_follows_its_sections(entries in prop::collection::vec(entry(), 0..8)) {
        let mut header = String::from("<ACCESSION-NUMBER>0001\n");
        let mut expected = vec![(
            EventKind::KeyValue,
            b"ACCESSION-NUMBER".to_vec(),
            b"0001".to_vec(),
            0,
        )];
        render_archive(&entries, 0, &mut header, &mut expected);

        let metadata = parse_submission_metadata(header.as_bytes());
        prop_assert_eq!(metadata.format, SubmissionFormat::Archive);
        assert_strictly_nested(&metadata.events);
        prop_assert_eq!(owned(&metadata.events), expected);
    }

    #[test]
    fn tab_header_follows_its_indentation(entries in prop::collection::vec(entry(), 0..8)) {
        let mut header = String::from("<SEC-HEADER>x\n");
        let mut expected = vec![(EventKind::KeyValue, b"SEC-HEADER".to_vec(), b"x".to_vec(), 0)];
        render_tab(&entries, 0, &mut header, &mut expected);

        let metadata = parse_submission_metadata(header.as_bytes());
        prop_assert_eq!(metadata.format, SubmissionFormat::TabDefault);
        assert_strictly_nested(&metadata.events);
        prop_assert_eq!(owned(&metadata.events), expected);
    }

    #[test]
    fn standardize_keeps_structure(lines in prop::collection::vec(header_line(), 0..40)) {
        let header = format!("<SEC-HEADER>x\n{}", lines.join("\n"));
        let metadata = parse_submission_metadata(header.as_bytes());
        let standardized = standardize(&metadata);

        prop_assert_eq!(standardized.len(), metadata.events.len());
        for (raw, std) in metadata.events.iter().zip(standardized.events()) {
            prop_assert_eq!(raw.kind, std.kind);
            prop_assert_eq!(raw.depth, std.depth);
            prop_assert_eq!(raw.key.starts_with(b"/"), std.key.starts_with(b"/"));
        }
    }
}
