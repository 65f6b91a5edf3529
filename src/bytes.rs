//! Byte-slice helpers shared by the scanners

use std::borrow::Cow;

#[inline]
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Index of the first CR or LF at or after `from`, or `data.len()`.
#[inline]
pub(crate) fn find_eol(data: &[u8], from: usize) -> usize {
    memchr::memchr2(b'\n', b'\r', &data[from..]).map_or(data.len(), |i| from + i)
}

/// Step over one line terminator (CR, LF or CRLF) starting at `pos`.
#[inline]
pub(crate) fn skip_eol(data: &[u8], mut pos: usize) -> usize {
    if data.get(pos) == Some(&b'\r') {
        pos += 1;
    }
    if data.get(pos) == Some(&b'\n') {
        pos += 1;
    }
    pos
}

/// Iterate lines terminated by CR, LF or CRLF, without the terminator.
pub(crate) fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= data.len() {
            return None;
        }
        let eol = find_eol(data, pos);
        let line = &data[pos..eol];
        pos = skip_eol(data, eol);
        Some(line)
    })
}

pub(crate) fn trim_start(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| !is_space(b)).unwrap_or(data.len());
    &data[start..]
}

pub(crate) fn trim_end(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| !is_space(b)).map_or(0, |p| p + 1);
    &data[..end]
}

pub(crate) fn trim(data: &[u8]) -> &[u8] {
    trim_end(trim_start(data))
}

/// Decode as UTF-8, falling back to Latin-1 (every byte is valid).
pub fn bytes_to_str(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(data.iter().map(|&b| b as char).collect()),
    }
}
