//! UU-encoding detection and decoding
//!
//! SEC filings embed binary files (PDF, images, etc.) using UU-encoding:
//! - First line: `begin 644 <filename>`
//! - Data lines: first char is the decoded length (32 + n), then 4 chars per 3 bytes
//! - A zero-length line (`` ` `` or space) ends the data, followed by `end`
//!
//! Decoding runs in two passes. The first sums the per-line lengths so the
//! output is allocated exactly once; the second decodes, sending full 45-byte
//! lines through a vector kernel and everything else through the scalar
//! bit accumulator. Both paths produce identical bytes.

mod scalar;
mod simd;

use std::ops::Range;

use log::trace;
use thiserror::Error;

use crate::bytes::{find_eol, is_space, lines, skip_eol};
use crate::types::Status;

pub use scalar::a2b_uu;

/// Largest decoded payload produced for a single document.
pub const UU_DECODE_MAX: usize = 256 * 1024 * 1024;

/// Encoded characters on a full line (after the length char).
pub(crate) const FULL_LINE_CHARS: usize = 60;
/// Decoded bytes on a full line.
pub(crate) const FULL_LINE_BYTES: usize = 45;
/// Length char announcing a full line: `b' ' + 45`.
const FULL_LINE_MARKER: u8 = b'M';

const BEGIN_644: &[u8] = b"begin 644";
/// How many lines at the top of a text block may precede `begin 644`.
const BEGIN_SEARCH_LINES: usize = 3;

/// Errors from the strict single-line decoder [`a2b_uu`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UuDecodeError {
    #[error("Illegal char")]
    IllegalChar,
    #[error("Trailing garbage")]
    TrailingGarbage,
}

/// Decoded payload plus whether it was cut short.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UuDecoded {
    pub data: Vec<u8>,
    pub status: Status,
}

/// Number of bytes announced by a line's length character.
#[inline]
pub(crate) fn line_byte_count(len_char: u8) -> usize {
    (len_char.wrapping_sub(b' ') & 0x3f) as usize
}

/// Locate the encoded region of a `<TEXT>` block.
///
/// Looks for a `begin 644` line among the first three lines; the region
/// starts on the following line and stops before the first `end` line, or at
/// the end of the block when there is none.
pub fn find_encoded_region(text: &[u8]) -> Option<Range<usize>> {
    let mut pos = 0;
    for _ in 0..BEGIN_SEARCH_LINES {
        if pos >= text.len() {
            break;
        }
        let eol = find_eol(text, pos);
        if is_begin_line(&text[pos..eol]) {
            let start = skip_eol(text, eol);
            let mut scan = start;
            let mut end = text.len();
            while scan < text.len() {
                let line_end = find_eol(text, scan);
                if is_end_line(&text[scan..line_end]) {
                    end = scan;
                    break;
                }
                scan = skip_eol(text, line_end);
            }
            return Some(start..end);
        }
        pos = skip_eol(text, eol);
    }
    None
}

fn is_begin_line(line: &[u8]) -> bool {
    line.starts_with(BEGIN_644)
        && line.get(BEGIN_644.len()).map_or(true, |&b| is_space(b))
}

fn is_end_line(line: &[u8]) -> bool {
    line.starts_with(b"end") && line.get(3).map_or(true, |&b| is_space(b))
}

/// Exact decoded size of `encoded`, capped at `limit`.
///
/// Returns the size and whether the cap was reached.
pub fn decoded_size(encoded: &[u8], limit: usize) -> (usize, bool) {
    let mut total = 0usize;
    for line in lines(encoded) {
        let Some(&len_char) = line.first() else {
            continue;
        };
        let nbytes = line_byte_count(len_char);
        if nbytes == 0 {
            break;
        }
        // `total <= limit` holds on every iteration.
        if nbytes > limit - total {
            return (limit, true);
        }
        total += nbytes;
    }
    (total, false)
}

/// Decode a uuencoded region (the lines between `begin` and `end`).
pub fn decode(encoded: &[u8]) -> UuDecoded {
    decode_with_limit(encoded, UU_DECODE_MAX)
}

/// Like [`decode`], with an explicit output cap.
pub fn decode_with_limit(encoded: &[u8], limit: usize) -> UuDecoded {
    decode_using(encoded, limit, simd::full_line_decoder())
}

/// Reference decoder: never uses vector instructions.
pub fn decode_scalar(encoded: &[u8]) -> UuDecoded {
    decode_using(encoded, UU_DECODE_MAX, scalar::decode_full_line)
}

fn decode_using(encoded: &[u8], limit: usize, full_line: simd::FullLineFn) -> UuDecoded {
    let (expected, capped) = decoded_size(encoded, limit);

    let mut data = Vec::new();
    if data.try_reserve_exact(expected).is_err() {
        return UuDecoded {
            data,
            status: Status::OutOfMemory,
        };
    }

    decode_lines(encoded, expected, full_line, &mut data);

    let status = if capped || data.len() != expected {
        trace!(
            "uudecode truncated: expected {} bytes, produced {} (capped: {})",
            expected,
            data.len(),
            capped
        );
        Status::Truncated
    } else {
        Status::Ok
    };
    UuDecoded { data, status }
}

fn decode_lines(encoded: &[u8], cap: usize, full_line: simd::FullLineFn, out: &mut Vec<u8>) {
    let mut block = [0u8; FULL_LINE_BYTES];

    for line in lines(encoded) {
        let Some((&len_char, body)) = line.split_first() else {
            continue;
        };
        let mut nbytes = line_byte_count(len_char);
        if nbytes == 0 {
            break;
        }

        let room = cap - out.len();
        if room == 0 {
            break;
        }
        let out_full = nbytes > room;
        if out_full {
            nbytes = room;
        }

        match body.first_chunk::<FULL_LINE_CHARS>() {
            Some(chunk) if !out_full && len_char == FULL_LINE_MARKER => {
                full_line(chunk, &mut block);
                out.extend_from_slice(&block);
            }
            _ => scalar::decode_line(body, nbytes, out),
        }

        if out_full {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode with the classic 45-bytes-per-line layout, using `` ` `` for zero.
    fn encode(data: &[u8]) -> Vec<u8> {
        let enc = |v: u8| if v == 0 { b'`' } else { v + b' ' };
        let mut out = Vec::new();
        for chunk in data.chunks(FULL_LINE_BYTES) {
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

    #[test]
    fn test_decode_cat() {
        let decoded = decode(b"#0V%T\n`\n");
        assert_eq!(decoded.data, b"Cat");
        assert_eq!(decoded.status, Status::Ok);
    }

    #[test]
    fn test_end_sentinel_stops_decoding() {
        let decoded = decode(b"#0V%T\n`\n#0V%T\n");
        assert_eq!(decoded.data, b"Cat");

        let decoded = decode(b"#0V%T\r\n \r\n#0V%T\r\n");
        assert_eq!(decoded.data, b"Cat");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let decoded = decode(b"\n#0V%T\n\n#0V%T\n");
        assert_eq!(decoded.data, b"CatCat");
        assert_eq!(decoded.status, Status::Ok);
    }

    #[test]
    fn test_full_lines_match_scalar() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(45 * 7 + 13).collect();
        let encoded = encode(&payload);

        let fast = decode(&encoded);
        let slow = decode_scalar(&encoded);
        assert_eq!(fast, slow);
        assert_eq!(fast.data, payload);
        assert_eq!(fast.status, Status::Ok);
    }

    #[test]
    fn test_short_line_padded_with_zero() {
        // Length says 3 bytes but only two data chars are present.
        let decoded = decode(b"#0V\n");
        assert_eq!(decoded.data.len(), 3);
        assert_eq!(&decoded.data[..1], b"C");
        assert_eq!(decoded.status, Status::Ok);
    }

    #[test]
    fn test_limit_truncates() {
        let payload = vec![0xAB; 100];
        let encoded = encode(&payload);

        let (size, capped) = decoded_size(&encoded, 50);
        assert_eq!((size, capped), (50, true));

        let decoded = decode_with_limit(&encoded, 50);
        assert_eq!(decoded.status, Status::Truncated);
        assert_eq!(decoded.data.len(), 50);
        assert_eq!(decoded.data, payload[..50]);
    }

    #[test]
    fn test_limit_smaller_than_first_line() {
        assert_eq!(decoded_size(b"#0V%T\n`\n", 2), (2, true));

        let decoded = decode_with_limit(b"#0V%T\n`\n", 2);
        assert_eq!(decoded.data, b"Ca");
        assert_eq!(decoded.status, Status::Truncated);

        let decoded = decode_with_limit(&encode(&[7u8; 45]), 10);
        assert_eq!(decoded.data, [7u8; 10]);
        assert_eq!(decoded.status, Status::Truncated);
    }

    #[test]
    fn test_zero_limit() {
        assert_eq!(decoded_size(b"#0V%T\n`\n", 0), (0, true));

        let decoded = decode_with_limit(b"#0V%T\n`\n", 0);
        assert!(decoded.data.is_empty());
        assert_eq!(decoded.status, Status::Truncated);

        // Nothing to decode is not a truncation.
        assert_eq!(decoded_size(b"`\n", 0), (0, false));
        assert_eq!(decode_with_limit(b"`\n", 0).status, Status::Ok);
    }

    #[test]
    fn test_limit_at_line_boundary_is_not_truncation() {
        let decoded = decode_with_limit(b"#0V%T\n`\n", 3);
        assert_eq!(decoded.data, b"Cat");
        assert_eq!(decoded.status, Status::Ok);
    }

    #[test]
    fn test_decoded_size_matches_output() {
        let payload: Vec<u8> = (0..200u8).collect();
        let encoded = encode(&payload);
        assert_eq!(decoded_size(&encoded, UU_DECODE_MAX), (200, false));
        assert_eq!(decode(&encoded).data.len(), 200);
    }

    #[test]
    fn test_find_encoded_region() {
        let text = b"\nbegin 644 image.jpg\n#0V%T\n`\nend\n";
        let region = find_encoded_region(text).unwrap();
        assert_eq!(&text[region], b"#0V%T\n`\n");
    }

    #[test]
    fn test_find_encoded_region_without_end() {
        let text = b"begin 644 a.pdf\r\n#0V%T\r\n";
        let region = find_encoded_region(text).unwrap();
        assert_eq!(&text[region], b"#0V%T\r\n");
    }

    #[test]
    fn test_begin_must_be_in_first_three_lines() {
        assert!(find_encoded_region(b"\n\nbegin 644 x\n#0V%T\n").is_some());
        assert!(find_encoded_region(b"\n\n\nbegin 644 x\n#0V%T\n").is_none());
        assert!(find_encoded_region(b"begin 6445 x\n").is_none());
        assert!(find_encoded_region(b"begin 755 x\n").is_none());
        assert!(find_encoded_region(b"begin 644").is_some());
    }

    #[test]
    fn test_end_line_with_trailing_text_is_not_end() {
        let text = b"begin 644 x\n#0V%T\nending\nend \n";
        let region = find_encoded_region(text).unwrap();
        assert_eq!(&text[region], b"#0V%T\nending\n");
    }
}
