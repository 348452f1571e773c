// Greedy match-extension scan.
//
// The classical bsdiff heuristic: walk the target, look up the longest
// source match at each position, and keep a running score of how well the
// previous record's source alignment still explains the bytes being
// covered. A cut happens when a fresh match is exactly as good as the old
// alignment, or beats it by more than 8 bytes; the emitted record is then
// grown forward from the previous cut and backward from the new match,
// with an overlap sweep deciding the split when the two extents collide.
// These tie-breakers are load-bearing: the serializer's gap repair relies
// on the scan being a deterministic function of its resume state.

use crate::queue::SyncQueue;
use crate::search::Searcher;

/// One patch record plus the scan state needed to resume after it.
///
/// `ctrl`/`diff`/`extra` are the wire fields; `last_scan`/`last_pos` pin the
/// record to absolute positions, and `last_offset`/`scan` carry the rest of
/// the resume state the serializer needs to regenerate the chain across a
/// block boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Record {
    pub ctrl: i64,
    pub diff: i64,
    pub extra: i64,
    pub last_scan: i64,
    pub last_pos: i64,
    pub last_offset: i64,
    pub scan: i64,
}

impl Record {
    /// First target position not covered by this record.
    #[inline]
    pub fn end(&self) -> i64 {
        self.last_scan + self.ctrl + self.diff
    }

    /// Source cursor after the applier consumes this record.
    #[inline]
    pub fn next_pos(&self) -> i64 {
        self.last_pos + self.ctrl + self.extra
    }
}

/// Scan state a record chain continues from.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Resume {
    pub last_scan: i64,
    pub last_pos: i64,
    pub last_offset: i64,
}

impl From<&Record> for Resume {
    fn from(rec: &Record) -> Self {
        Resume {
            last_scan: rec.last_scan,
            last_pos: rec.last_pos,
            last_offset: rec.last_offset,
        }
    }
}

/// Scan `target` from `start`, emitting records into `records` until the
/// chain passes `end` (or the target is exhausted), then close the queue.
///
/// Workers call this once per block with a fresh resume state; the
/// serializer calls it again with the true upstream state to repair the
/// seams between blocks.
pub(crate) fn scan_range<S: Searcher>(
    source: &[u8],
    target: &[u8],
    searcher: &S,
    records: &SyncQueue<Record>,
    start: i64,
    end: i64,
    resume: Resume,
) {
    let tsize = target.len() as i64;
    let ssize = source.len() as i64;

    let mut lastscan = resume.last_scan;
    let mut lastpos = resume.last_pos;
    let mut lastoffset = resume.last_offset;

    let mut scan = start;
    let mut len: i64 = 0;
    let mut pos: i64 = 0;

    while scan < tsize {
        let mut oldscore: i64 = 0;
        scan += len;
        let mut scsc = scan;

        while scan < tsize {
            let (p, l) = searcher.search(scan as usize);
            pos = p as i64;
            len = l as i64;

            while scsc < scan + len {
                let shifted = scsc + lastoffset;
                if shifted >= 0 && shifted < ssize && source[shifted as usize] == target[scsc as usize]
                {
                    oldscore += 1;
                }
                scsc += 1;
            }

            if (len == oldscore && len != 0) || len > oldscore + 8 {
                break;
            }

            let shifted = scan + lastoffset;
            if shifted >= 0 && shifted < ssize && source[shifted as usize] == target[scan as usize] {
                oldscore -= 1;
            }
            scan += 1;
        }

        if len != oldscore || scan == tsize {
            // Forward extent: grow from the previous cut while more than
            // half the bytes still match.
            let mut s: i64 = 0;
            let mut sf: i64 = 0;
            let mut lenf: i64 = 0;
            let mut i: i64 = 0;
            while lastscan + i < scan && lastpos + i < ssize {
                if source[(lastpos + i) as usize] == target[(lastscan + i) as usize] {
                    s += 1;
                }
                i += 1;
                if s * 2 - i > sf * 2 - lenf {
                    sf = s;
                    lenf = i;
                }
            }

            // Backward extent from the new match.
            let mut lenb: i64 = 0;
            if scan < tsize {
                let mut s: i64 = 0;
                let mut sb: i64 = 0;
                let mut i: i64 = 1;
                while scan >= lastscan + i && pos >= i {
                    if source[(pos - i) as usize] == target[(scan - i) as usize] {
                        s += 1;
                    }
                    if s * 2 - i > sb * 2 - lenb {
                        sb = s;
                        lenb = i;
                    }
                    i += 1;
                }
            }

            // The extents overlap in the target: sweep the overlap and cut
            // where the balance of agreements flips.
            if lastscan + lenf > scan - lenb {
                let overlap = (lastscan + lenf) - (scan - lenb);
                let mut s: i64 = 0;
                let mut ss: i64 = 0;
                let mut lens: i64 = 0;
                for i in 0..overlap {
                    if target[(lastscan + lenf - overlap + i) as usize]
                        == source[(lastpos + lenf - overlap + i) as usize]
                    {
                        s += 1;
                    }
                    if target[(scan - lenb + i) as usize] == source[(pos - lenb + i) as usize] {
                        s -= 1;
                    }
                    if s > ss {
                        ss = s;
                        lens = i + 1;
                    }
                }
                lenf += lens - overlap;
                lenb -= lens;
            }

            records
                .push(Record {
                    ctrl: lenf,
                    diff: (scan - lenb) - (lastscan + lenf),
                    extra: (pos - lenb) - (lastpos + lenf),
                    last_scan: lastscan,
                    last_pos: lastpos,
                    last_offset: lastoffset,
                    scan,
                })
                .expect("record queue closed while its worker was running");

            lastoffset = pos - scan;
            lastscan = scan - lenb;
            lastpos = pos - lenb;

            if lastscan >= end {
                break;
            }
        }
    }

    records.close();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
