// Pattern search over the source suffix array.
//
// Both strategies answer the same question: given a scan position in the
// target, what is the longest prefix of target[scan..] that occurs
// somewhere in the source, and at what source offset? They must agree on
// the length; the offset may differ only in tie-breaking.

pub(crate) mod lcp;
pub(crate) mod plain;

pub(crate) use lcp::LcpSearcher;
pub(crate) use plain::PlainSearcher;

/// A search strategy shared read-only by all scan workers.
pub(crate) trait Searcher: Sync {
    /// Returns `(pos, len)`: the longest prefix of `target[scan..]` found in
    /// the source starts at source offset `pos` and has length `len`.
    fn search(&self, scan: usize) -> (usize, usize);
}

/// Length of the common prefix of two byte slices.
#[inline]
pub(crate) fn matchlen(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
