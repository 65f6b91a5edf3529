//! Canonical key/value pass over header events
//!
//! Keys are looked up (case-insensitively) in [`crate::header_mappings`];
//! unknown labels are lowercased and hyphenated. Every output string is
//! appended to one arena owned by the result, so the standardized metadata
//! does not borrow from the input buffer.

use log::warn;

use crate::header_mappings::{fallback_key_bytes, fallback_key_len, lookup, HeaderMapping};
use crate::types::{
    ArenaSpan, EventKind, OutOfMemory, Status, StandardizedEvent, StandardizedSubmissionMetadata,
    SubmissionEvent, SubmissionMetadata,
};

/// Standardize header events. The input is left untouched.
///
/// A non-`Ok` input status is carried over to the output. If growing the
/// arena or the event list fails the status becomes `OutOfMemory` and the
/// partial result must not be relied on.
pub fn standardize(metadata: &SubmissionMetadata<'_>) -> StandardizedSubmissionMetadata {
    let mut builder = Builder::default();

    if let Err(OutOfMemory) = builder.run(&metadata.events) {
        warn!(
            "out of memory standardizing header after {} of {} events",
            builder.out.events.len(),
            metadata.events.len()
        );
        builder.out.status = Status::OutOfMemory;
        return builder.out;
    }

    builder.out.status = metadata.status;
    builder.out
}

#[derive(Default)]
struct Builder {
    out: StandardizedSubmissionMetadata,
    /// Scratch buffer for the lowercased lookup key
    lower: Vec<u8>,
}

impl Builder {
    fn run(&mut self, events: &[SubmissionEvent<'_>]) -> Result<(), OutOfMemory> {
        self.out.events.try_reserve_exact(events.len())?;
        for event in events {
            let (key, mapping) = self.push_key(event.key)?;
            let value = match (event.kind, mapping.and_then(|m| m.extract)) {
                (EventKind::KeyValue, Some(rule)) => {
                    self.push_bytes(rule.apply(event.value).unwrap_or(event.value))?
                }
                (EventKind::KeyValue, None) => self.push_bytes(event.value)?,
                _ => self.empty_span(),
            };

            self.out.events.push(StandardizedEvent {
                kind: event.kind,
                key,
                value,
                depth: event.depth,
            });
        }
        Ok(())
    }

    fn empty_span(&self) -> ArenaSpan {
        ArenaSpan { start: self.out.arena.len(), len: 0 }
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<ArenaSpan, OutOfMemory> {
        let start = self.out.arena.len();
        self.out.arena.try_reserve(bytes.len())?;
        self.out.arena.extend_from_slice(bytes);
        Ok(ArenaSpan { start, len: bytes.len() })
    }

    /// Append the canonical form of `key`, keeping a leading `/`.
    fn push_key(
        &mut self,
        key: &[u8],
    ) -> Result<(ArenaSpan, Option<&'static HeaderMapping>), OutOfMemory> {
        let (closing, label) = match key.strip_prefix(b"/") {
            Some(label) => (true, label),
            None => (false, key),
        };
        if label.is_empty() {
            return Ok((self.push_bytes(key)?, None));
        }

        self.lower.clear();
        self.lower.try_reserve(label.len())?;
        self.lower.extend(label.iter().map(u8::to_ascii_lowercase));
        let mapping = lookup(&self.lower);

        let start = self.out.arena.len();
        let arena = &mut self.out.arena;
        match mapping {
            Some(mapping) => {
                arena.try_reserve(usize::from(closing) + mapping.to.len())?;
                if closing {
                    arena.push(b'/');
                }
                arena.extend_from_slice(mapping.to);
            }
            None => {
                arena.try_reserve(usize::from(closing) + fallback_key_len(label))?;
                if closing {
                    arena.push(b'/');
                }
                arena.extend(fallback_key_bytes(label));
            }
        }

        let span = ArenaSpan { start, len: arena.len() - start };
        Ok((span, mapping))
    }
}
