// LCP-accelerated suffix-array search.
//
// Two precomputed tables avoid most byte comparisons:
//   - lcp: Kasai's array, lcp[i] = common prefix of SA[i] and SA[i+1];
//   - lcp_lr: for every interval (l, r) the binary search can visit, the
//     minimum of lcp[l..r-1], stored at the interval's midpoint. Build and
//     query must use the same midpoint arithmetic (m = l + (r - l) / 2) or
//     the addressing falls apart.
//
// During the search, lcp_l / lcp_r hold the number of pattern bytes known
// to match at the current bounds. Comparing those against the interval
// minima decides most steps without touching the text; only ties fall back
// to byte comparison, resumed past the known prefix.

use super::{matchlen, Searcher};
use crate::suffix::SaIndex;

pub(crate) struct LcpSearcher<'a, N: SaIndex> {
    source: &'a [u8],
    target: &'a [u8],
    sa: &'a [N],
    lcp: Vec<N>,
    lcp_lr: Vec<N>,
}

impl<'a, N: SaIndex> LcpSearcher<'a, N> {
    pub(crate) fn new(source: &'a [u8], target: &'a [u8], sa: &'a [N]) -> Self {
        let lcp = kasai(source, sa);
        let lcp_lr = build_lcp_lr(&lcp);
        Self {
            source,
            target,
            sa,
            lcp,
            lcp_lr,
        }
    }

    /// Guaranteed common prefix between the suffixes bounding (l, r).
    #[inline]
    fn lcp_offset(&self, l: usize, r: usize) -> usize {
        if r - l == 1 {
            self.lcp[l].to_usize()
        } else {
            self.lcp_lr[l + (r - l) / 2].to_usize()
        }
    }

    /// Extend a known match of `offset` bytes between the pattern and the
    /// suffix at `start` by direct comparison.
    #[inline]
    fn extend(&self, offset: usize, pattern: &[u8], start: usize) -> usize {
        offset + matchlen(&self.source[start + offset..], &pattern[offset..])
    }

    /// After diverging at `offset`, does the pattern order at or before the
    /// suffix at `start`? An exhausted pattern counts as smaller.
    #[inline]
    fn le_at(&self, offset: usize, pattern: &[u8], start: usize) -> bool {
        if offset == pattern.len() {
            return true;
        }
        start + offset < self.source.len() && pattern[offset] < self.source[start + offset]
    }
}

impl<N: SaIndex> Searcher for LcpSearcher<'_, N> {
    fn search(&self, scan: usize) -> (usize, usize) {
        let n = self.sa.len();
        if n == 0 || scan >= self.target.len() {
            return (0, 0);
        }
        let pattern = &self.target[scan..];

        let mut lpos = 0usize;
        let mut rpos = n;
        let mut lcp_l = self.extend(0, pattern, self.sa[0].to_usize());
        let mut lcp_r = self.extend(0, pattern, self.sa[n - 1].to_usize());

        while rpos - lpos > 1 {
            let mid = lpos + (rpos - lpos) / 2;
            let loff = self.lcp_offset(lpos, mid);
            let roff = self.lcp_offset(mid, rpos);

            if loff >= roff {
                if lcp_l < loff {
                    // Pattern diverges from the left bound before the interval
                    // does; the midpoint compares the same way the bound did.
                    lpos = mid;
                } else if lcp_l > loff {
                    rpos = mid;
                    lcp_r = loff;
                } else {
                    let off = self.extend(loff, pattern, self.sa[mid].to_usize());
                    if self.le_at(off, pattern, self.sa[mid].to_usize()) {
                        rpos = mid;
                        lcp_r = off;
                    } else {
                        lpos = mid;
                        lcp_l = off;
                    }
                }
            } else if lcp_r < roff {
                rpos = mid;
            } else if lcp_r > roff {
                lpos = mid;
                lcp_l = roff;
            } else {
                let off = self.extend(roff, pattern, self.sa[mid].to_usize());
                if self.le_at(off, pattern, self.sa[mid].to_usize()) {
                    rpos = mid;
                    lcp_r = off;
                } else {
                    lpos = mid;
                    lcp_l = off;
                }
            }
        }

        // If rpos never moved, lcp_r still refers to SA[n-1].
        let r_idx = if rpos == n { n - 1 } else { rpos };
        let lsuf = self.sa[lpos].to_usize();
        let rsuf = self.sa[r_idx].to_usize();
        let llen = self.extend(lcp_l, pattern, lsuf);
        let rlen = self.extend(lcp_r, pattern, rsuf);
        if rlen >= llen {
            (rsuf, rlen)
        } else {
            (lsuf, llen)
        }
    }
}

// ---------------------------------------------------------------------------
// Table construction
// ---------------------------------------------------------------------------

/// Kasai's LCP construction: O(n) by walking suffixes in text order and
/// reusing the previous length minus one.
pub(crate) fn kasai<N: SaIndex>(source: &[u8], sa: &[N]) -> Vec<N> {
    let n = source.len();
    let mut lcp = vec![N::from_usize(0); n];
    let mut rank = vec![N::from_usize(0); n];
    for (i, &s) in sa.iter().enumerate() {
        rank[s.to_usize()] = N::from_usize(i);
    }
    let mut k = 0usize;
    for i in 0..n {
        let r = rank[i].to_usize();
        if r == n - 1 {
            k = 0;
            continue;
        }
        let j = sa[r + 1].to_usize();
        while i + k < n && j + k < n && source[i + k] == source[j + k] {
            k += 1;
        }
        lcp[r] = N::from_usize(k);
        if k > 0 {
            k -= 1;
        }
    }
    lcp
}

/// Pre-order range minima over the binary-search recursion tree, addressed
/// by interval midpoints.
pub(crate) fn build_lcp_lr<N: SaIndex>(lcp: &[N]) -> Vec<N> {
    let n = lcp.len();
    let mut table = vec![N::from_usize(0); n];
    if n >= 2 {
        let mid = n / 2;
        let left = fill(lcp, &mut table, 0, mid);
        let right = fill(lcp, &mut table, mid, n);
        table[mid] = left.min(right);
    }
    table
}

fn fill<N: SaIndex>(lcp: &[N], table: &mut [N], start: usize, end: usize) -> N {
    if end - start == 1 {
        return lcp[start];
    }
    let mid = start + (end - start) / 2;
    let left = fill(lcp, table, start, mid);
    let right = fill(lcp, table, mid, end);
    let val = left.min(right);
    table[mid] = val;
    val
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_lcp(a: &[u8], b: &[u8]) -> usize {
        matchlen(a, b)
    }

    #[test]
    fn kasai_matches_naive() {
        for source in [
            &b"banana"[..],
            b"mississippi",
            b"aaaaaa",
            b"abcdefgh",
            b"abababab",
        ] {
            let sa = <i32 as SaIndex>::build(source).unwrap();
            let lcp = kasai(source, &sa);
            for i in 0..source.len().saturating_sub(1) {
                let expected = naive_lcp(
                    &source[sa[i] as usize..],
                    &source[sa[i + 1] as usize..],
                );
                assert_eq!(lcp[i] as usize, expected, "lcp[{i}] of {source:?}");
            }
        }
    }

    #[test]
    fn lcp_lr_holds_range_minima() {
        // Walk the same recursion tree the query uses; every visited interval
        // (l, r) must store min(lcp[l..r]) at its midpoint.
        fn check(lcp: &[i32], table: &[i32], l: usize, r: usize) {
            if r - l <= 1 {
                return;
            }
            let mid = l + (r - l) / 2;
            let expected = lcp[l..r].iter().copied().min().unwrap();
            assert_eq!(table[mid], expected, "interval ({l}, {r})");
            check(lcp, table, l, mid);
            check(lcp, table, mid, r);
        }

        for source in [&b"abracadabra abracadabra"[..], b"mississippi", b"aabbaabb"] {
            let sa = <i32 as SaIndex>::build(source).unwrap();
            let lcp = kasai(source, &sa);
            let table = build_lcp_lr(&lcp);
            check(&lcp, &table, 0, sa.len());
        }
    }

    #[test]
    fn single_byte_source() {
        let source = b"z";
        let sa = <i32 as SaIndex>::build(source).unwrap();
        let s = LcpSearcher::new(source, b"zzz", &sa);
        assert_eq!(s.search(0), (0, 1));
    }
}
