//! Low-level chunk cursor over a RIFF byte stream.
//!
//! A RIFF container is a sequence of tagged, length-prefixed chunks, each
//! padded to an even byte boundary. This module reads the outer container
//! wrapper (RIFF tag + total size + variant tag) and then yields one
//! [`Chunk`] per inner chunk, supporting bounded body reads and
//! skip-to-next.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{WsigError, WsigResult};

// Chunk tags (little-endian u32 of the 4-byte ASCII id)
pub const RIFF_ID: u32 = 0x4646_4952; // "RIFF"
pub const WAVE_ID: u32 = 0x4556_4157; // "WAVE"
pub const WSIG_ID: u32 = 0x4749_5357; // "WSIG"
pub const FMT_ID: u32 = 0x2074_6d66; // "fmt "
pub const DATA_ID: u32 = 0x6174_6164; // "data"
pub const SDSC_ID: u32 = 0x6373_6473; // "sdsc"
pub const ADSC_ID: u32 = 0x6373_6461; // "adsc"
pub const LIST_ID: u32 = 0x5453_494c; // "LIST"

/// Which chunk dialect governs the file after the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Standard WAVE audio: `fmt ` + `data`.
    Wave,
    /// SESANE instrument recording: `sdsc` (+ optional `adsc`) + `data`.
    Wsig,
}

/// Render a chunk id as its 4-character ASCII form for diagnostics.
pub fn tag_name(id: u32) -> String {
    String::from_utf8_lossy(&id.to_le_bytes()).into_owned()
}

/// Read the outer container wrapper: `RIFF` tag, declared total size
/// (excluding the 8-byte tag+size prefix), and the variant tag.
pub fn read_container_header<R: Read>(source: &mut R) -> WsigResult<(Variant, u32)> {
    let mut tag = [0u8; 4];
    if read_full(source, &mut tag)? != 4 || u32::from_le_bytes(tag) != RIFF_ID {
        return Err(WsigError::NotAContainer);
    }

    let mut size = [0u8; 4];
    if read_full(source, &mut size)? != 4 {
        return Err(WsigError::NotAContainer);
    }
    let total_size = u32::from_le_bytes(size);

    let mut variant = [0u8; 4];
    if read_full(source, &mut variant)? != 4 {
        return Err(WsigError::UnsupportedVariant {
            tag: String::from_utf8_lossy(&variant).into_owned(),
        });
    }
    let variant = match u32::from_le_bytes(variant) {
        WAVE_ID => Variant::Wave,
        WSIG_ID => Variant::Wsig,
        _ => {
            return Err(WsigError::UnsupportedVariant {
                tag: String::from_utf8_lossy(&variant).into_owned(),
            })
        }
    };

    Ok((variant, total_size))
}

/// One inner chunk: id, declared payload size, and read progress.
#[derive(Debug)]
pub struct Chunk {
    id: u32,
    size: u32,
    /// Absolute offset of the first payload byte.
    start: u64,
    /// Payload bytes consumed so far.
    consumed: u32,
}

impl Chunk {
    /// Read the next chunk header. Returns `None` on a clean end of stream;
    /// an incomplete 8-byte header also counts as end of stream.
    pub fn next<R: Read + Seek>(source: &mut R) -> WsigResult<Option<Chunk>> {
        let mut header = [0u8; 8];
        if read_full(source, &mut header)? != 8 {
            return Ok(None);
        }

        let id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let start = source.stream_position()?;

        Ok(Some(Chunk {
            id,
            size,
            start,
            consumed: 0,
        }))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Declared payload size, excluding the pad byte.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Absolute offset of the first payload byte.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Payload bytes left inside the declared chunk boundary.
    pub fn remaining(&self) -> u32 {
        self.size - self.consumed
    }

    /// Read exactly `buf.len()` payload bytes, failing if that would cross
    /// the declared chunk boundary.
    pub fn read_exact<R: Read>(&mut self, source: &mut R, buf: &mut [u8]) -> WsigResult<()> {
        if buf.len() as u64 > self.remaining() as u64 {
            return Err(WsigError::TruncatedChunk {
                tag: tag_name(self.id),
                offset: self.start + self.consumed as u64,
                requested: buf.len(),
                available: self.remaining() as u64,
            });
        }
        source.read_exact(buf)?;
        self.consumed += buf.len() as u32;
        Ok(())
    }

    /// Advance past the rest of the payload, plus the pad byte when the
    /// declared size is odd (RIFF alignment rule).
    pub fn skip<R: Read + Seek>(&mut self, source: &mut R) -> WsigResult<()> {
        let mut rest = self.remaining() as i64;
        if self.size % 2 == 1 {
            rest += 1;
        }
        if rest > 0 {
            source.seek(SeekFrom::Current(rest))?;
        }
        self.consumed = self.size;
        Ok(())
    }
}

/// Read until `buf` is full or the source is exhausted; returns the number
/// of bytes actually read.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> WsigResult<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = source.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(variant: &[u8; 4], total: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(variant);
        out
    }

    #[test]
    fn test_container_header_wave() {
        let mut src = Cursor::new(header(b"WAVE", 36));
        let (variant, total) = read_container_header(&mut src).unwrap();
        assert_eq!(variant, Variant::Wave);
        assert_eq!(total, 36);
    }

    #[test]
    fn test_container_header_wsig() {
        let mut src = Cursor::new(header(b"WSIG", 200));
        let (variant, _) = read_container_header(&mut src).unwrap();
        assert_eq!(variant, Variant::Wsig);
    }

    #[test]
    fn test_container_header_rejects_wrong_tag() {
        let mut src = Cursor::new(b"XXXX\x24\x00\x00\x00WAVE".to_vec());
        let result = read_container_header(&mut src);
        assert!(matches!(result, Err(WsigError::NotAContainer)));
        // No further reads were attempted past the bad tag.
        assert_eq!(src.position(), 4);
    }

    #[test]
    fn test_container_header_rejects_unknown_variant() {
        let mut src = Cursor::new(header(b"AIFF", 0));
        match read_container_header(&mut src) {
            Err(WsigError::UnsupportedVariant { tag }) => assert_eq!(tag, "AIFF"),
            other => panic!("expected UnsupportedVariant, got {:?}", other),
        }
    }

    #[test]
    fn test_chunk_iteration_with_pad_byte() {
        // Two chunks; the first has an odd size and a pad byte.
        let mut data = Vec::new();
        data.extend_from_slice(b"odd ");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"abc\x00"); // 3 payload bytes + pad
        data.extend_from_slice(b"evn ");
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(b"xy");
        let mut src = Cursor::new(data);

        let mut chunk = Chunk::next(&mut src).unwrap().unwrap();
        assert_eq!(tag_name(chunk.id()), "odd ");
        assert_eq!(chunk.size(), 3);
        chunk.skip(&mut src).unwrap();

        let mut chunk = Chunk::next(&mut src).unwrap().unwrap();
        assert_eq!(tag_name(chunk.id()), "evn ");
        let mut body = [0u8; 2];
        chunk.read_exact(&mut src, &mut body).unwrap();
        assert_eq!(&body, b"xy");
        chunk.skip(&mut src).unwrap();

        assert!(Chunk::next(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_partial_header_is_end_of_stream() {
        let mut src = Cursor::new(b"abc".to_vec());
        assert!(Chunk::next(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_read_past_chunk_boundary() {
        let mut data = Vec::new();
        data.extend_from_slice(b"smol");
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"abcdXXXX");
        let mut src = Cursor::new(data);

        let mut chunk = Chunk::next(&mut src).unwrap().unwrap();
        let mut buf = [0u8; 6];
        match chunk.read_exact(&mut src, &mut buf) {
            Err(WsigError::TruncatedChunk {
                tag,
                requested,
                available,
                ..
            }) => {
                assert_eq!(tag, "smol");
                assert_eq!(requested, 6);
                assert_eq!(available, 4);
            }
            other => panic!("expected TruncatedChunk, got {:?}", other),
        }
    }
}
