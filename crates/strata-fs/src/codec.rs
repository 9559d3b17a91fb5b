//! Fixed-width integer codec
//!
//! Values are widened to `i64` on read (sign- or zero-extended per the tag)
//! and truncated to the tag's width on write, wrapping like two's complement.

use strata_vfs::ErrorCode;

use crate::format::{Endian, FormatTag, Signedness, Width};
use crate::transfer::ByteStream;
use crate::vfs::VfsError;

/// Decode one scalar from exactly `tag.bytes()` bytes
pub fn decode(tag: FormatTag, bytes: &[u8]) -> i64 {
    let width = tag.bytes();
    debug_assert_eq!(bytes.len(), width);
    let mut raw = [0u8; 8];
    let value = match tag.endian {
        Endian::Little => {
            raw[..width].copy_from_slice(bytes);
            u64::from_le_bytes(raw)
        }
        Endian::Big => {
            raw[8 - width..].copy_from_slice(bytes);
            u64::from_be_bytes(raw)
        }
    };
    match tag.signedness {
        Signedness::Signed => {
            let shift = (64 - 8 * width) as u32;
            ((value << shift) as i64) >> shift
        }
        Signedness::Unsigned => value as i64,
    }
}

/// Encode one scalar. Returns the buffer and how many leading bytes are used.
pub fn encode(tag: FormatTag, value: i64) -> ([u8; 8], usize) {
    let width = tag.bytes();
    let raw = value as u64;
    let mut out = [0u8; 8];
    match tag.endian {
        Endian::Little => out[..width].copy_from_slice(&raw.to_le_bytes()[..width]),
        Endian::Big => out[..width].copy_from_slice(&raw.to_be_bytes()[8 - width..]),
    }
    (out, width)
}

/// Reinterpret a native-order integer as stored in the tag's byte order.
///
/// Converts a value read raw from memory into host order at the tag's width.
/// Single-byte tags leave the value alone.
pub fn swap(tag: FormatTag, value: i64) -> i64 {
    if tag.width == Width::W1 {
        return value;
    }
    let native = FormatTag::new(tag.width, Endian::NATIVE, tag.signedness);
    let (bytes, width) = encode(native, value);
    decode(tag, &bytes[..width])
}

/// Read one scalar with a single sized read.
///
/// A read that returns fewer bytes than the width fails; end of stream at a
/// value boundary reports `PAST_EOF` unless the backend said otherwise.
pub fn read_scalar<S: ByteStream + ?Sized>(stream: &mut S, tag: FormatTag) -> Result<i64, VfsError> {
    let mut buf = [0u8; 8];
    let width = tag.bytes();
    let n = stream.read_bytes(&mut buf[..width])?;
    if n < width {
        return Err(stream.shortfall(ErrorCode::PastEof));
    }
    Ok(decode(tag, &buf[..width]))
}

/// Write one scalar with a single sized write
pub fn write_scalar<S: ByteStream + ?Sized>(
    stream: &mut S,
    tag: FormatTag,
    value: i64,
) -> Result<(), VfsError> {
    let (bytes, width) = encode(tag, value);
    let n = stream.write_bytes(&bytes[..width])?;
    if n < width {
        return Err(stream.shortfall(ErrorCode::Io));
    }
    Ok(())
}
