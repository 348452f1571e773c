// Patch container framing.
//
// A patch file is:
//   offset  size  field
//   0       16    magic
//   16      8     target length (little-endian signed 64-bit)
//   24      ...   bzip2 stream of records
//
// Each record inside the stream starts with three sign-magnitude encoded
// 64-bit integers (copy length, literal length, source seek), followed by
// the diff and extra byte runs.

/// Identifies a bsdelta patch. Deliberately distinct from "BSDIFF40".
pub(crate) const MAGIC: [u8; 16] = *b"BSDELTA-PATCH-01";

/// Bytes before the compressed payload: magic + target length.
pub(crate) const HEADER_LEN: usize = 24;

/// Size of the control triple at the head of every record.
pub(crate) const CTRL_LEN: usize = 24;

/// Encode a signed 64-bit value as magnitude plus a sign bit in the top
/// byte. This is the classical bsdiff representation, not two's complement;
/// `i64::MIN` has no encoding and is rejected by the engine's invariants
/// long before it could reach this function.
pub(crate) fn offtout(x: i64) -> [u8; 8] {
    let mut buf = x.unsigned_abs().to_le_bytes();
    if x < 0 {
        buf[7] |= 0x80;
    }
    buf
}

/// Decode the sign-magnitude representation produced by [`offtout`].
pub(crate) fn offtin(buf: [u8; 8]) -> i64 {
    let raw = u64::from_le_bytes(buf);
    let magnitude = (raw & !(1 << 63)) as i64;
    if raw & (1 << 63) != 0 {
        -magnitude
    } else {
        magnitude
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
