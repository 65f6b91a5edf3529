//! Header field name mappings for standardization

use std::collections::HashMap;
use std::sync::OnceLock;

use memchr::{memchr, memmem};

use crate::bytes::is_space;

/// Value extraction applied to a KeyValue event before it is copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// `... 1934 Act` → `34`
    SecAct,
    /// `... [2841]` → `2841`
    Sic,
}

impl Extract {
    /// The extracted sub-span of `value`, or `None` when nothing matches.
    pub fn apply(self, value: &[u8]) -> Option<&[u8]> {
        match self {
            Extract::SecAct => extract_sec_act(value),
            Extract::Sic => extract_sic(value),
        }
    }
}

/// Mapping entry with an optional value extraction rule
#[derive(Debug)]
pub struct HeaderMapping {
    pub to: &'static [u8],
    pub extract: Option<Extract>,
}

impl HeaderMapping {
    const fn simple(to: &'static str) -> Self {
        Self { to: to.as_bytes(), extract: None }
    }

    const fn extracting(to: &'static str, extract: Extract) -> Self {
        Self { to: to.as_bytes(), extract: Some(extract) }
    }
}

static HEADER_MAPPINGS: OnceLock<HashMap<&'static [u8], HeaderMapping>> = OnceLock::new();

/// Known labels, keyed by their lowercase form.
pub fn get_header_mappings() -> &'static HashMap<&'static [u8], HeaderMapping> {
    HEADER_MAPPINGS.get_or_init(|| {
        let entries = [
            ("paper", HeaderMapping::simple("paper")),
            ("accession number", HeaderMapping::simple("accession-number")),
            ("conformed submission type", HeaderMapping::simple("type")),
            ("public document count", HeaderMapping::simple("public-document-count")),
            ("public document_count", HeaderMapping::simple("public-document-count")),
            ("conformed period of report", HeaderMapping::simple("period")),
            ("filed as of date", HeaderMapping::simple("filing-date")),
            ("date as of change", HeaderMapping::simple("date-of-filing-date-change")),
            ("effectiveness date", HeaderMapping::simple("effectiveness-date")),
            ("filer", HeaderMapping::simple("filer")),
            ("company data", HeaderMapping::simple("company-data")),
            ("company conformed name", HeaderMapping::simple("conformed-name")),
            ("central index key", HeaderMapping::simple("cik")),
            ("state of incorporation", HeaderMapping::simple("state-of-incorporation")),
            ("fiscal year end", HeaderMapping::simple("fiscal-year-end")),
            ("filing values", HeaderMapping::simple("filing-values")),
            ("form type", HeaderMapping::simple("form-type")),
            ("sec act", HeaderMapping::extracting("act", Extract::SecAct)),
            ("sec file number", HeaderMapping::simple("file-number")),
            ("film number", HeaderMapping::simple("film-number")),
            ("business address", HeaderMapping::simple("business-address")),
            ("street 1", HeaderMapping::simple("street1")),
            ("street 2", HeaderMapping::simple("street2")),
            ("city", HeaderMapping::simple("city")),
            ("state", HeaderMapping::simple("state")),
            ("zip", HeaderMapping::simple("zip")),
            ("business phone", HeaderMapping::simple("phone")),
            ("mail address", HeaderMapping::simple("mail-address")),
            ("former company", HeaderMapping::simple("former-company")),
            ("former conformed name", HeaderMapping::simple("former-conformed-name")),
            ("date of name change", HeaderMapping::simple("date-changed")),
            ("sros", HeaderMapping::simple("sros")),
            ("subject company", HeaderMapping::simple("subject-company")),
            (
                "standard industrial classification",
                HeaderMapping::extracting("assigned-sic", Extract::Sic),
            ),
            ("irs number", HeaderMapping::simple("irs-number")),
            ("filed by", HeaderMapping::simple("filed-by")),
            ("items", HeaderMapping::simple("items")),
            ("group members", HeaderMapping::simple("group-members")),
            ("organization name", HeaderMapping::simple("organization-name")),
            ("recieved date", HeaderMapping::simple("recieved-date")),
            ("action date", HeaderMapping::simple("action-date")),
            ("non us state territory", HeaderMapping::simple("non-us-state-territory")),
            (
                "address is a non us location",
                HeaderMapping::simple("address-is-a-non-us-location"),
            ),
            ("ein", HeaderMapping::simple("ein")),
            ("class-contract-ticker-symbol", HeaderMapping::simple("class-contract-ticker-symbol")),
            ("class-contract-name", HeaderMapping::simple("class-contract-name")),
            ("class-contract-id", HeaderMapping::simple("class-contract-id")),
            ("sec-document", HeaderMapping::simple("sec-document")),
            ("sec-header", HeaderMapping::simple("sec-header")),
            ("acceptance-datetime", HeaderMapping::simple("acceptance-datetime")),
            (
                "series-and-classes-contracts-data",
                HeaderMapping::simple("series-and-classes-contracts-data"),
            ),
            (
                "existing-series-and-classes-contracts",
                HeaderMapping::simple("existing-series-and-classes-contracts"),
            ),
            (
                "merger-series-and-classes-contracts",
                HeaderMapping::simple("merger-series-and-classes-contracts"),
            ),
            (
                "new-series-and-classes-contracts",
                HeaderMapping::simple("new-series-and-classes-contracts"),
            ),
            ("series", HeaderMapping::simple("series")),
            ("owner-cik", HeaderMapping::simple("owner-cik")),
            ("series-id", HeaderMapping::simple("series-id")),
            ("series-name", HeaderMapping::simple("series-name")),
            ("acquiring-data", HeaderMapping::simple("acquiring-data")),
            ("target-data", HeaderMapping::simple("target-data")),
            ("new-classes-contracts", HeaderMapping::simple("new-classes-contracts")),
            ("new-series", HeaderMapping::simple("new-series")),
            ("relationship", HeaderMapping::simple("relationship")),
        ];

        entries
            .into_iter()
            .map(|(label, mapping)| (label.as_bytes(), mapping))
            .collect()
    })
}

/// Look up an already-lowercased label.
pub fn lookup(lowercase_key: &[u8]) -> Option<&'static HeaderMapping> {
    get_header_mappings().get(lowercase_key)
}

pub fn fallback_key_len(key: &[u8]) -> usize {
    fallback_key_bytes(key).count()
}

/// Unknown label: lowercase it and collapse each whitespace run into `-`.
pub fn fallback_key_bytes(key: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let mut prev_was_space = false;
    key.iter().filter_map(move |&b| {
        if is_space(b) {
            let emit = !prev_was_space;
            prev_was_space = true;
            emit.then_some(b'-')
        } else {
            prev_was_space = false;
            Some(b.to_ascii_lowercase())
        }
    })
}

/// Two digits at offset 2..4 of the first 4-digit number followed by
/// whitespace and `Act`.
fn extract_sec_act(value: &[u8]) -> Option<&[u8]> {
    memmem::find_iter(value, b"Act").find_map(|act| {
        let digits_end = value[..act].iter().rposition(|&b| !is_space(b))? + 1;
        if digits_end == act || digits_end < 4 {
            return None;
        }
        let number = &value[digits_end - 4..digits_end];
        number
            .iter()
            .all(u8::is_ascii_digit)
            .then(|| &number[2..])
    })
}

/// Digits inside the first `[NNNN]` group.
fn extract_sic(value: &[u8]) -> Option<&[u8]> {
    memchr::memchr_iter(b'[', value).find_map(|open| {
        let inner = &value[open + 1..];
        let close = memchr(b']', inner)?;
        let digits = &inner[..close];
        (!digits.is_empty() && digits.iter().all(u8::is_ascii_digit)).then_some(digits)
    })
}
