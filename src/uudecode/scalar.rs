//! Scalar uudecode kernels
//!
//! These are the reference implementation; the vector kernels must agree
//! with them byte for byte.

use super::{line_byte_count, UuDecodeError, FULL_LINE_BYTES, FULL_LINE_CHARS};

#[inline]
fn sextet(ch: u8) -> u8 {
    ch.wrapping_sub(b' ') & 0x3f
}

/// Decode `nbytes` from the data characters of one line.
///
/// Uses a bit accumulator: each character shifts in 6 bits and a byte is
/// emitted whenever 8 are available. Missing characters count as zero.
pub(crate) fn decode_line(body: &[u8], nbytes: usize, out: &mut Vec<u8>) {
    let mut chars = body.iter().map(|&ch| sextet(ch));
    let mut leftchar: u32 = 0;
    let mut leftbits = 0u32;
    let mut remaining = nbytes;

    while remaining > 0 {
        let ch = chars.next().unwrap_or(0);
        leftchar = (leftchar << 6) | ch as u32;
        leftbits += 6;

        if leftbits >= 8 {
            leftbits -= 8;
            out.push((leftchar >> leftbits) as u8);
            leftchar &= (1 << leftbits) - 1;
            remaining -= 1;
        }
    }
}

/// Turn 15 groups of four 6-bit values into 45 bytes.
#[inline]
pub(crate) fn unpack_groups(sextets: &[u8], out: &mut [u8; FULL_LINE_BYTES]) {
    for (group, bytes) in sextets.chunks_exact(4).zip(out.chunks_exact_mut(3)) {
        let (a, b, c, d) = (group[0], group[1], group[2], group[3]);
        bytes[0] = (a << 2) | (b >> 4);
        bytes[1] = (b << 4) | (c >> 2);
        bytes[2] = (c << 6) | d;
    }
}

pub(crate) fn decode_full_line(line: &[u8; FULL_LINE_CHARS], out: &mut [u8; FULL_LINE_BYTES]) {
    let mut sextets = [0u8; FULL_LINE_CHARS];
    for (dst, &ch) in sextets.iter_mut().zip(line.iter()) {
        *dst = sextet(ch);
    }
    unpack_groups(&sextets, out);
}

/// Strictly decode a single uuencoded line.
///
/// Valid characters are in range [32, 96] (space through backtick). Anything
/// after the characters the length requires must be padding (space or
/// backtick), otherwise the line is rejected.
pub fn a2b_uu(line: &[u8]) -> Result<Vec<u8>, UuDecodeError> {
    let end = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |p| p + 1);
    let line = &line[..end];

    let Some((&len_char, body)) = line.split_first() else {
        return Ok(Vec::new());
    };

    let bin_len = line_byte_count(len_char);
    let chars_needed = (bin_len * 8 + 5) / 6;
    let (data, trailing) = body.split_at(chars_needed.min(body.len()));

    if data.iter().any(|&b| !(b' '..=b'`').contains(&b)) {
        return Err(UuDecodeError::IllegalChar);
    }
    if trailing.iter().any(|&b| b != b' ' && b != b'`') {
        return Err(UuDecodeError::TrailingGarbage);
    }

    let mut out = Vec::with_capacity(bin_len);
    decode_line(data, bin_len, &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a2b_uu() {
        assert_eq!(a2b_uu(b"#0V%T\n").unwrap(), b"Cat");
        assert_eq!(a2b_uu(b"").unwrap(), b"");
        assert_eq!(a2b_uu(b"`").unwrap(), b"");
    }

    #[test]
    fn test_a2b_uu_allows_padding() {
        assert_eq!(a2b_uu(b"#0V%T``\r\n").unwrap(), b"Cat");
    }

    #[test]
    fn test_a2b_uu_rejects_garbage() {
        assert_eq!(a2b_uu(b"#0V%Tx"), Err(UuDecodeError::TrailingGarbage));
        assert_eq!(a2b_uu(b"#0v%T"), Err(UuDecodeError::IllegalChar));
    }

    #[test]
    fn test_full_line_matches_accumulator() {
        let line: Vec<u8> = (0..FULL_LINE_CHARS).map(|i| b' ' + (i * 7 % 64) as u8).collect();
        let chunk: &[u8; FULL_LINE_CHARS] = line.as_slice().try_into().unwrap();

        let mut block = [0u8; FULL_LINE_BYTES];
        decode_full_line(chunk, &mut block);

        let mut expected = Vec::new();
        decode_line(&line, FULL_LINE_BYTES, &mut expected);
        assert_eq!(block.as_slice(), expected.as_slice());
    }
}
