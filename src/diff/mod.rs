// Diff engine: suffix-array construction, block partitioning, the worker
// pool, and the stitching serializer, wrapped in the patch container.
//
// The pipeline: build the suffix array once (index width picked by input
// size), cut the target into fixed-size blocks, scan blocks on a thread
// pool with each block feeding its own record queue, and stitch the queues
// in block order into a single bzip2 stream.

mod serializer;
mod worker;

pub(crate) use worker::{Record, Resume};

use std::io::{self, Write};
use std::thread;

use bzip2::write::BzEncoder;
use bzip2::Compression;
use log::{debug, info, warn};

use crate::format::MAGIC;
use crate::queue::SyncQueue;
use crate::search::{LcpSearcher, PlainSearcher, Searcher};
use crate::suffix::{SaIndex, SuffixArrayError};
use serializer::Serializer;

/// Upper bound on a scan block; small targets get one block per thread.
const MAX_BLOCK_SIZE: i64 = 2 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Options and stats
// ---------------------------------------------------------------------------

/// Which pattern-search strategy the workers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearcherKind {
    /// Letter-bucketed binary search over the suffix array.
    #[default]
    Plain,
    /// Binary search accelerated by Kasai LCP + range-minimum tables.
    /// Costs two extra index-width arrays at build time.
    Lcp,
}

/// Configuration for a diff run.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub searcher: SearcherKind,
    /// Worker threads; 0 means one per available core.
    pub threads: usize,
    /// bzip2 level (1-9) for the patch payload.
    pub compression: u32,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            searcher: SearcherKind::Plain,
            threads: 0,
            compression: 9,
        }
    }
}

/// What a diff run did.
#[derive(Debug, Clone, Copy)]
pub struct DiffStats {
    /// Records written to the patch stream.
    pub records: u64,
    /// Scan blocks the target was cut into.
    pub blocks: u64,
    /// Worker threads used.
    pub threads: u64,
    /// Suffix-array index width in bits (32 or 64).
    pub index_width: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum DiffError {
    Io(io::Error),
    SuffixArray(SuffixArrayError),
    /// The stitched record stream did not cover the whole target.
    IncompletePatch { written: i64, expected: i64 },
}

impl std::fmt::Display for DiffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::SuffixArray(e) => write!(f, "suffix array construction failed: {e}"),
            Self::IncompletePatch { written, expected } => write!(
                f,
                "incomplete patch: covered {written} of {expected} target bytes"
            ),
        }
    }
}

impl std::error::Error for DiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::SuffixArray(e) => Some(e),
            Self::IncompletePatch { .. } => None,
        }
    }
}

impl From<io::Error> for DiffError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SuffixArrayError> for DiffError {
    fn from(e: SuffixArrayError) -> Self {
        Self::SuffixArray(e)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Write a patch transforming `source` into `target` with default options.
///
/// The patch applies via [`crate::patch::apply`] (or `apply_bytes`) to
/// reconstruct `target` byte for byte.
pub fn diff<W: Write>(source: &[u8], target: &[u8], writer: W) -> Result<DiffStats, DiffError> {
    diff_with_options(source, target, writer, &DiffOptions::default())
}

/// Write a patch with explicit options.
pub fn diff_with_options<W: Write>(
    source: &[u8],
    target: &[u8],
    mut writer: W,
    opts: &DiffOptions,
) -> Result<DiffStats, DiffError> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&(target.len() as i64).to_le_bytes())?;

    let level = opts.compression.clamp(1, 9);
    let mut payload = BzEncoder::new(writer, Compression::new(level));

    // 32-bit indexes halve the dominant allocation whenever both inputs
    // fit; the two paths are monomorphised from the same code.
    let stats = if source.len() < i32::MAX as usize && target.len() < i32::MAX as usize {
        run::<i32, _>(source, target, &mut payload, opts)?
    } else {
        run::<i64, _>(source, target, &mut payload, opts)?
    };

    payload.finish()?;
    Ok(stats)
}

fn run<N: SaIndex, W: Write>(
    source: &[u8],
    target: &[u8],
    writer: &mut W,
    opts: &DiffOptions,
) -> Result<DiffStats, DiffError> {
    let sa = N::build(source)?;
    info!(
        "diffing {} -> {} bytes with {}-bit indexes",
        source.len(),
        target.len(),
        N::WIDTH_BITS
    );
    let mut stats = match opts.searcher {
        SearcherKind::Plain => {
            let searcher = PlainSearcher::new(source, target, &sa);
            orchestrate(source, target, &searcher, writer, opts)?
        }
        SearcherKind::Lcp => {
            let searcher = LcpSearcher::new(source, target, &sa);
            orchestrate(source, target, &searcher, writer, opts)?
        }
    };
    stats.index_width = N::WIDTH_BITS;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

struct Block {
    index: usize,
    start: i64,
    end: i64,
}

fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    match thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            warn!("could not detect available parallelism ({e}); using one thread");
            1
        }
    }
}

fn orchestrate<S: Searcher, W: Write>(
    source: &[u8],
    target: &[u8],
    searcher: &S,
    writer: &mut W,
    opts: &DiffOptions,
) -> Result<DiffStats, DiffError> {
    let threads = resolve_threads(opts.threads);
    let tsize = target.len() as i64;

    let block_size = MAX_BLOCK_SIZE.min((tsize + 1) / threads as i64).max(1);
    let blocks = if tsize == 0 {
        0
    } else {
        (tsize / block_size).max(1) as usize
    };
    debug!("{blocks} blocks of up to {block_size} bytes on {threads} threads");

    let queues: Vec<SyncQueue<Record>> = (0..blocks).map(|_| SyncQueue::new()).collect();
    let dispatch: SyncQueue<Block> = SyncQueue::new();
    let mut start = 0i64;
    for index in 0..blocks {
        let end = if index + 1 == blocks {
            tsize
        } else {
            start + block_size
        };
        dispatch
            .push(Block { index, start, end })
            .expect("dispatch queue closed during setup");
        start = end;
    }
    dispatch.close();

    let result = thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                while let Some(block) = dispatch.wait_and_pop() {
                    worker::scan_range(
                        source,
                        target,
                        searcher,
                        &queues[block.index],
                        block.start,
                        block.end,
                        Resume {
                            last_scan: block.start,
                            last_pos: 0,
                            last_offset: 0,
                        },
                    );
                }
            });
        }

        let mut stitcher = Serializer::new(source, target, searcher, writer);
        let result = stitcher.drain(&queues);
        if result.is_err() {
            // Leave no queue non-empty behind: workers keep producing even
            // after a serializer failure, and they are about to be joined.
            for queue in &queues {
                while queue.wait_and_pop().is_some() {}
            }
        }
        result
    });

    let records = result?;
    Ok(DiffStats {
        records,
        blocks: blocks as u64,
        threads: threads as u64,
        index_width: 0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
