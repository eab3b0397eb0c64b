//! Binary trace stream decoder.
//!
//! A trace is a headerless stream of signed 64-bit little-endian words,
//! consumed as a one-pass stack-machine encoding: `-1` opens a subtrace,
//! `-2` closes it into the current invocation, `-3` flushes the current
//! invocation and opens the next; any other word is a page address appended
//! to the open subtrace. Length is end-of-file.

use crate::trace::store::Invocation;
use crate::utils::config::{CLOSE_INVOCATION, CLOSE_SUBTRACE, OPEN_SUBTRACE};
use crate::utils::error::TraceError;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Accumulates one invocation while its delimited block is being decoded.
///
/// **Private** - pages are folded into a sorted set; the ordered subtraces
/// themselves are ephemeral and only their count survives.
struct InvocationBuilder {
    pages: BTreeSet<i64>,
    subtrace_count: usize,
}

impl InvocationBuilder {
    fn new() -> Self {
        Self {
            pages: BTreeSet::new(),
            subtrace_count: 0,
        }
    }

    fn fold_subtrace(&mut self, subtrace: Vec<i64>) {
        self.pages.extend(subtrace);
        self.subtrace_count += 1;
    }

    /// Finalize into an immutable invocation: sorted page set plus a
    /// structural hash of that set.
    fn finish(self, id: usize) -> Invocation {
        let pages: Vec<i64> = self.pages.into_iter().collect();
        let hash = hash_page_set(&pages);
        Invocation {
            id,
            pages,
            hash,
            subtrace_count: self.subtrace_count,
        }
    }
}

/// Hash a sorted, deduplicated page set.
///
/// **Private** - order-independence comes from the sorted input, so two
/// invocations touching the same pages in any order hash identically.
fn hash_page_set(pages: &[i64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for page in pages {
        page.hash(&mut hasher);
    }
    hasher.finish()
}

/// Decode a raw byte stream into the ordered invocation list
///
/// **Public (crate)** - entry point used by `TraceStore`
///
/// # Errors
/// * `TraceError::TruncatedStream` - byte length not a multiple of 8
/// * `TraceError::SubTraceOutsideInvocation` - `-1` or `-2` before any `-3`
/// * `TraceError::UnmatchedSubTraceClose` - `-2` with no open subtrace
/// * `TraceError::PageOutsideSubTrace` - page address with no open subtrace
pub(crate) fn decode_trace(bytes: &[u8]) -> Result<Vec<Invocation>, TraceError> {
    if bytes.len() % 8 != 0 {
        return Err(TraceError::TruncatedStream(bytes.len()));
    }

    let mut invocations = Vec::new();
    let mut current: Option<InvocationBuilder> = None;
    let mut open_subtrace: Option<Vec<i64>> = None;

    for (word, chunk) in bytes.chunks_exact(8).enumerate() {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        let value = i64::from_le_bytes(buf);

        match value {
            CLOSE_INVOCATION => {
                if let Some(builder) = current.take() {
                    invocations.push(builder.finish(invocations.len()));
                }
                current = Some(InvocationBuilder::new());
            }
            OPEN_SUBTRACE => {
                if current.is_none() {
                    return Err(TraceError::SubTraceOutsideInvocation(word));
                }
                open_subtrace = Some(Vec::new());
            }
            CLOSE_SUBTRACE => {
                let subtrace = open_subtrace
                    .take()
                    .ok_or(TraceError::UnmatchedSubTraceClose(word))?;
                match current.as_mut() {
                    Some(builder) => builder.fold_subtrace(subtrace),
                    None => return Err(TraceError::SubTraceOutsideInvocation(word)),
                }
            }
            page => match open_subtrace.as_mut() {
                Some(subtrace) => subtrace.push(page),
                None => return Err(TraceError::PageOutsideSubTrace(word)),
            },
        }
    }

    // The final invocation is flushed even without a trailing -3
    if let Some(builder) = current.take() {
        invocations.push(builder.finish(invocations.len()));
    }

    debug!("Decoded {} invocations from trace stream", invocations.len());

    Ok(invocations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(words: &[i64]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_two_invocations() {
        let bytes = encode(&[-3, -1, 0x1000, 0x2000, -2, -3, -1, 0x1000, -2]);
        let invocations = decode_trace(&bytes).unwrap();

        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].pages, vec![0x1000, 0x2000]);
        assert_eq!(invocations[1].pages, vec![0x1000]);
        assert_eq!(invocations[0].subtrace_count, 1);
    }

    #[test]
    fn test_decode_duplicate_pages_collapse() {
        let bytes = encode(&[-3, -1, 0x1000, 0x1000, -2, -1, 0x1000, -2]);
        let invocations = decode_trace(&bytes).unwrap();

        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].pages, vec![0x1000]);
        assert_eq!(invocations[0].subtrace_count, 2);
    }

    #[test]
    fn test_decode_hash_is_order_independent() {
        let forward = decode_trace(&encode(&[-3, -1, 1, 2, 3, -2])).unwrap();
        let backward = decode_trace(&encode(&[-3, -1, 3, 2, 1, -2])).unwrap();

        assert_eq!(forward[0].hash, backward[0].hash);
        assert_eq!(forward[0].pages, backward[0].pages);
    }

    #[test]
    fn test_decode_flushes_open_invocation_at_eof() {
        let bytes = encode(&[-3, -1, 7, -2]);
        let invocations = decode_trace(&bytes).unwrap();
        assert_eq!(invocations.len(), 1);
    }

    #[test]
    fn test_decode_empty_stream() {
        let invocations = decode_trace(&[]).unwrap();
        assert!(invocations.is_empty());
    }

    #[test]
    fn test_decode_truncated_stream() {
        let mut bytes = encode(&[-3, -1]);
        bytes.pop();
        assert!(matches!(
            decode_trace(&bytes),
            Err(TraceError::TruncatedStream(_))
        ));
    }

    #[test]
    fn test_decode_subtrace_outside_invocation() {
        let bytes = encode(&[-1, 0x1000, -2]);
        assert!(matches!(
            decode_trace(&bytes),
            Err(TraceError::SubTraceOutsideInvocation(0))
        ));
    }

    #[test]
    fn test_decode_page_outside_subtrace() {
        let bytes = encode(&[-3, 0x1000]);
        assert!(matches!(
            decode_trace(&bytes),
            Err(TraceError::PageOutsideSubTrace(1))
        ));
    }

    #[test]
    fn test_decode_unmatched_subtrace_close() {
        let bytes = encode(&[-3, -2]);
        assert!(matches!(
            decode_trace(&bytes),
            Err(TraceError::UnmatchedSubTraceClose(1))
        ));
    }
}
