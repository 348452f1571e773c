// File-level diff/apply helpers.
//
// Both diff inputs are read fully into memory (the suffix array needs the
// whole source anyway); the patch and the reconstructed output stream
// through buffered writers.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use crate::diff::{diff_with_options, DiffError, DiffOptions};
use crate::patch::{apply, PatchError};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by [`diff_file`].
#[derive(Debug, Clone)]
pub struct DiffFileStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Target file size in bytes.
    pub target_size: u64,
    /// Patch output size in bytes.
    pub patch_size: u64,
    /// Records in the patch stream.
    pub records: u64,
    /// Scan blocks used.
    pub blocks: u64,
    /// Worker threads used.
    pub threads: u64,
    /// Suffix-array index width in bits.
    pub index_width: u32,
}

/// Statistics returned by [`apply_file`].
#[derive(Debug, Clone)]
pub struct ApplyFileStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug)]
pub enum IoError {
    /// I/O error (file open, read, write).
    Io(io::Error),
    /// Diff engine error.
    Diff(DiffError),
    /// Patch application error.
    Patch(PatchError),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Diff(e) => write!(f, "diff error: {e}"),
            Self::Patch(e) => write!(f, "patch error: {e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Diff(e) => Some(e),
            Self::Patch(e) => Some(e),
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DiffError> for IoError {
    fn from(e: DiffError) -> Self {
        Self::Diff(e)
    }
}

impl From<PatchError> for IoError {
    fn from(e: PatchError) -> Self {
        Self::Patch(e)
    }
}

// ---------------------------------------------------------------------------
// diff_file
// ---------------------------------------------------------------------------

/// Diff two files and write the patch to `patch_path`.
pub fn diff_file(
    source_path: &Path,
    target_path: &Path,
    patch_path: &Path,
    opts: &DiffOptions,
) -> Result<DiffFileStats, IoError> {
    let source = std::fs::read(source_path)?;
    let target = std::fs::read(target_path)?;

    let patch_file = File::create(patch_path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, patch_file);

    let stats = diff_with_options(&source, &target, &mut writer, opts)?;
    writer.flush()?;
    let patch_size = writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();

    Ok(DiffFileStats {
        source_size: source.len() as u64,
        target_size: target.len() as u64,
        patch_size,
        records: stats.records,
        blocks: stats.blocks,
        threads: stats.threads,
        index_width: stats.index_width,
    })
}

// ---------------------------------------------------------------------------
// apply_file
// ---------------------------------------------------------------------------

/// Apply a patch file against `source_path`, writing to `output_path`.
pub fn apply_file(
    source_path: &Path,
    patch_path: &Path,
    output_path: &Path,
) -> Result<ApplyFileStats, IoError> {
    let source = std::fs::read(source_path)?;

    let patch_file = File::open(patch_path)?;
    let patch_size = patch_file.metadata()?.len();
    let patch_reader = BufReader::with_capacity(BUF_SIZE, patch_file);

    let output_file = File::create(output_path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, output_file);

    let output_size = apply(&source, patch_reader, &mut writer)?;
    writer.flush()?;

    Ok(ApplyFileStats {
        source_size: source.len() as u64,
        patch_size,
        output_size,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
