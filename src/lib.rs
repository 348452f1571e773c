//! bsdelta: parallel suffix-array binary diff/patch in the bsdiff family.
//!
//! The crate provides:
//! - The diff engine (`diff`): a suffix-array-driven greedy matcher running
//!   on a worker pool, with a serializer that stitches per-block record
//!   streams into one patch
//! - The patch applier (`patch`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! Patches are framed by a 16-byte magic, the target length, and a single
//! bzip2 stream of bsdiff-style records.
//!
//! # Quick Start
//!
//! ```
//! let source = b"hello old world";
//! let target = b"hello new world";
//!
//! let mut patch = Vec::new();
//! bsdelta::diff(source, target, &mut patch).unwrap();
//! let restored = bsdelta::apply_bytes(source, &patch).unwrap();
//! assert_eq!(restored, target);
//! ```

pub mod diff;
pub mod io;
pub mod patch;
pub mod queue;

mod format;
mod search;
mod suffix;

#[cfg(feature = "cli")]
pub mod cli;

pub use diff::{diff, diff_with_options, DiffError, DiffOptions, DiffStats, SearcherKind};
pub use patch::{apply, apply_bytes, PatchError};
pub use suffix::SuffixArrayError;
