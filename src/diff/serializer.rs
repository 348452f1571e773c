// Record stitching and wire encoding.
//
// Workers scan their blocks with a locally-seeded state, so the records of
// adjacent blocks rarely meet cleanly: the tail of one block's chain can
// overshoot into the next (overlap), and the next block's seeded chain is
// untrusted until it converges with the written stream (gap). This module
// linearises the per-block queues into one contiguous record stream:
//
//   - a record strictly behind the stitch point is superseded: skip;
//   - a record exactly at the stitch point whose source cursor also lines
//     up extends the stream: write it;
//   - a record ahead of the stitch point exposes a seam: re-run the scan
//     from the last written record's resume state up to that record, write
//     the regenerated chain, and re-examine.
//
// The source-cursor check exists because the wire format carries no
// absolute source positions; the applier reconstructs the cursor from the
// accumulated ctrl/extra fields, so a record is only appendable when its
// last_pos equals that accumulated value.

use std::io::Write;

use super::worker::{self, Record, Resume};
use super::DiffError;
use crate::format::{offtout, CTRL_LEN};
use crate::queue::SyncQueue;
use crate::search::Searcher;

/// Transform buffer cap: patches for large targets stream through 16 MiB.
const SAVE_BUFFER_MAX: usize = 16 * 1024 * 1024;

pub(crate) struct Serializer<'a, W: Write, S: Searcher> {
    source: &'a [u8],
    target: &'a [u8],
    searcher: &'a S,
    writer: &'a mut W,
    buf: Vec<u8>,
    /// First target position not yet written.
    next_position: i64,
    /// Source cursor the applier will hold at `next_position`.
    source_cursor: i64,
    /// Last written record; its embedded state seeds gap repair.
    prev: Record,
    records: u64,
}

impl<'a, W: Write, S: Searcher> Serializer<'a, W, S> {
    pub(crate) fn new(
        source: &'a [u8],
        target: &'a [u8],
        searcher: &'a S,
        writer: &'a mut W,
    ) -> Self {
        let buf_len = (target.len() + 1).min(SAVE_BUFFER_MAX);
        Self {
            source,
            target,
            searcher,
            writer,
            buf: vec![0u8; buf_len],
            next_position: 0,
            source_cursor: 0,
            prev: Record::default(),
            records: 0,
        }
    }

    /// Drain the per-block queues in block order, stitching them into one
    /// gap-free stream. Returns the number of records written.
    pub(crate) fn drain(&mut self, queues: &[SyncQueue<Record>]) -> Result<u64, DiffError> {
        for queue in queues {
            while let Some(rec) = queue.wait_and_pop() {
                self.stitch(rec)?;
            }
        }
        // A final block whose chain never converged (or produced nothing)
        // leaves a tail; regenerate it like any other seam.
        let expected = self.target.len() as i64;
        if self.next_position < expected {
            self.fill_gap(expected)?;
        }
        if self.next_position != expected {
            return Err(DiffError::IncompletePatch {
                written: self.next_position,
                expected,
            });
        }
        Ok(self.records)
    }

    fn stitch(&mut self, rec: Record) -> Result<(), DiffError> {
        if rec.last_scan < self.next_position {
            return Ok(());
        }
        if rec.last_scan > self.next_position {
            self.fill_gap(rec.last_scan)?;
        }
        if rec.last_scan == self.next_position && rec.last_pos == self.source_cursor {
            self.write_record(&rec)?;
        }
        Ok(())
    }

    /// Regenerate the canonical chain from the last written record up to
    /// `until`. The scan restarted from a record's own resume state
    /// reproduces that record first and then continues deterministically,
    /// so the regenerated records either duplicate what is already written
    /// (skipped) or extend it exactly.
    fn fill_gap(&mut self, until: i64) -> Result<(), DiffError> {
        let local = SyncQueue::new();
        worker::scan_range(
            self.source,
            self.target,
            self.searcher,
            &local,
            self.prev.scan,
            until,
            Resume::from(&self.prev),
        );
        while let Some(rec) = local.wait_and_pop() {
            if rec.last_scan == self.next_position && rec.last_pos == self.source_cursor {
                self.write_record(&rec)?;
            }
        }
        Ok(())
    }

    fn write_record(&mut self, rec: &Record) -> Result<(), DiffError> {
        let mut ctrl = [0u8; CTRL_LEN];
        ctrl[0..8].copy_from_slice(&offtout(rec.ctrl));
        ctrl[8..16].copy_from_slice(&offtout(rec.diff));
        ctrl[16..24].copy_from_slice(&offtout(rec.extra));
        self.writer.write_all(&ctrl)?;

        // Diff stream: target minus source under the record's alignment.
        let mut done: i64 = 0;
        while done < rec.ctrl {
            let chunk = ((rec.ctrl - done) as usize).min(self.buf.len());
            let t = (rec.last_scan + done) as usize;
            let s = (rec.last_pos + done) as usize;
            for i in 0..chunk {
                self.buf[i] = self.target[t + i].wrapping_sub(self.source[s + i]);
            }
            self.writer.write_all(&self.buf[..chunk])?;
            done += chunk as i64;
        }

        // Extra stream: raw target literals.
        let lit = (rec.last_scan + rec.ctrl) as usize;
        self.writer
            .write_all(&self.target[lit..lit + rec.diff as usize])?;

        self.next_position = rec.end();
        self.source_cursor = rec.next_pos();
        self.prev = *rec;
        self.records += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
