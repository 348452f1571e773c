// Patch application.
//
// A linear transducer over the decompressed patch: for each record, add the
// diff-stream bytes to the source window at the running cursor, copy the
// literal bytes through, then move the cursor by the record's seek field.
// Every source access is bounds-checked; patches that read outside the
// source, end early, or disagree with the declared target length are
// rejected rather than trusted.

use std::io::{self, Read, Write};

use bzip2::read::BzDecoder;

use crate::format::{offtin, CTRL_LEN, MAGIC};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PatchError {
    /// I/O error reading the patch or writing the output.
    Io(io::Error),
    /// The input does not start with the bsdelta magic.
    BadMagic,
    /// Structurally invalid patch data.
    Corrupt(&'static str),
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::BadMagic => write!(f, "not a bsdelta patch (bad magic)"),
            Self::Corrupt(what) => write!(f, "corrupt patch: {what}"),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PatchError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reads that run out of patch mean truncation, not plain I/O failure.
fn truncated(e: io::Error) -> PatchError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        PatchError::Corrupt("truncated patch stream")
    } else {
        PatchError::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Apply a patch read from `patch` against `source`, writing the
/// reconstructed target to `out`. Returns the number of bytes written,
/// which always equals the length declared in the patch header.
pub fn apply<R: Read, W: Write>(
    source: &[u8],
    mut patch: R,
    mut out: W,
) -> Result<u64, PatchError> {
    let mut magic = [0u8; 16];
    patch.read_exact(&mut magic).map_err(truncated)?;
    if magic != MAGIC {
        return Err(PatchError::BadMagic);
    }

    let mut len_buf = [0u8; 8];
    patch.read_exact(&mut len_buf).map_err(truncated)?;
    let target_len = i64::from_le_bytes(len_buf);
    if target_len < 0 {
        return Err(PatchError::Corrupt("negative target length"));
    }

    let mut records = BzDecoder::new(patch);
    let mut buf = vec![0u8; BUF_SIZE];
    let mut cursor: i64 = 0;
    let mut written: i64 = 0;

    while written < target_len {
        let mut ctrl = [0u8; CTRL_LEN];
        records.read_exact(&mut ctrl).map_err(truncated)?;
        let add = offtin(ctrl[0..8].try_into().expect("slice is 8 bytes"));
        let copy = offtin(ctrl[8..16].try_into().expect("slice is 8 bytes"));
        let seek = offtin(ctrl[16..24].try_into().expect("slice is 8 bytes"));

        if add < 0 || copy < 0 {
            return Err(PatchError::Corrupt("negative record length"));
        }
        let record_len = add
            .checked_add(copy)
            .ok_or(PatchError::Corrupt("record length overflow"))?;
        if written + record_len > target_len {
            return Err(PatchError::Corrupt("record overruns declared length"));
        }

        if add > 0 {
            if cursor < 0 || cursor + add > source.len() as i64 {
                return Err(PatchError::Corrupt("source window out of range"));
            }
            let mut done: i64 = 0;
            while done < add {
                let chunk = ((add - done) as usize).min(buf.len());
                records.read_exact(&mut buf[..chunk]).map_err(truncated)?;
                let base = (cursor + done) as usize;
                for (i, b) in buf[..chunk].iter_mut().enumerate() {
                    *b = b.wrapping_add(source[base + i]);
                }
                out.write_all(&buf[..chunk])?;
                done += chunk as i64;
            }
        }
        cursor = cursor
            .checked_add(add)
            .ok_or(PatchError::Corrupt("source cursor overflow"))?;

        let mut done: i64 = 0;
        while done < copy {
            let chunk = ((copy - done) as usize).min(buf.len());
            records.read_exact(&mut buf[..chunk]).map_err(truncated)?;
            out.write_all(&buf[..chunk])?;
            done += chunk as i64;
        }

        written += record_len;
        cursor = cursor
            .checked_add(seek)
            .ok_or(PatchError::Corrupt("source cursor overflow"))?;
    }

    out.flush()?;
    Ok(written as u64)
}

/// Apply an in-memory patch and return the reconstructed target.
pub fn apply_bytes(source: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut out = Vec::new();
    apply(source, patch, &mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
