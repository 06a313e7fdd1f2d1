//! Standard WAVE container writer.
//!
//! Serializes an in-memory sample buffer into a minimal `fmt ` + `data`
//! container using a two-pass length backpatch: the total-size field is
//! written as a zero placeholder, the body follows, and the placeholder is
//! overwritten once the true length is known. Only the standard variant is
//! ever produced; there is no write support for `WSIG`.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::cursor::{DATA_ID, FMT_ID, RIFF_ID, WAVE_ID};
use crate::error::{WsigError, WsigResult};

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Interleaved sample storage handed to the writer.
///
/// Samples are in native byte order; the writer serializes little-endian
/// regardless of host. Unsigned storage is only writable at single-byte
/// width; the multi-byte unsigned variants exist so callers holding such
/// buffers get a typed rejection instead of a silently wrong file.
#[derive(Debug, Clone, Copy)]
pub enum SampleData<'a> {
    Uint8(&'a [u8]),
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    Float32(&'a [f32]),
    Float64(&'a [f64]),
    Uint16(&'a [u16]),
    Uint32(&'a [u32]),
}

impl SampleData<'_> {
    /// Number of samples across all channels.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Uint8(s) => s.len(),
            SampleData::Int16(s) => s.len(),
            SampleData::Int32(s) => s.len(),
            SampleData::Float32(s) => s.len(),
            SampleData::Float64(s) => s.len(),
            SampleData::Uint16(s) => s.len(),
            SampleData::Uint32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per sample element.
    fn element_width(&self) -> u16 {
        match self {
            SampleData::Uint8(_) => 1,
            SampleData::Int16(_) | SampleData::Uint16(_) => 2,
            SampleData::Int32(_) | SampleData::Float32(_) | SampleData::Uint32(_) => 4,
            SampleData::Float64(_) => 8,
        }
    }

    /// Encoding tag for the format descriptor, or the typed rejection for
    /// kinds the container cannot represent.
    fn format_tag(&self) -> WsigResult<u16> {
        match self {
            SampleData::Uint8(_) | SampleData::Int16(_) | SampleData::Int32(_) => {
                Ok(WAVE_FORMAT_PCM)
            }
            SampleData::Float32(_) | SampleData::Float64(_) => Ok(WAVE_FORMAT_IEEE_FLOAT),
            SampleData::Uint16(_) => Err(WsigError::UnsupportedSampleKind {
                kind: "unsigned 16-bit",
            }),
            SampleData::Uint32(_) => Err(WsigError::UnsupportedSampleKind {
                kind: "unsigned 32-bit",
            }),
        }
    }
}

/// A sample buffer plus its channel shape.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    data: SampleData<'a>,
    channels: u16,
}

impl<'a> SampleBuffer<'a> {
    /// Single-channel buffer.
    pub fn mono(data: SampleData<'a>) -> Self {
        SampleBuffer { data, channels: 1 }
    }

    /// Channel-interleaved buffer. The sample count must be a whole number
    /// of frames.
    pub fn interleaved(data: SampleData<'a>, channels: u16) -> WsigResult<Self> {
        if channels == 0 || data.len() % channels as usize != 0 {
            return Err(WsigError::BadChannelCount);
        }
        Ok(SampleBuffer { data, channels })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> u64 {
        (self.data.len() / self.channels as usize) as u64
    }
}

/// Write a standard WAVE container to any seekable sink.
///
/// The element kind is validated before any bytes are written; an
/// unsupported buffer leaves the sink untouched. A crash between the body
/// write and the final backpatch leaves a file whose declared size field
/// disagrees with its actual size; accepted, not corrected.
pub fn write<W: Write + Seek>(
    sink: &mut W,
    sample_rate: u32,
    buffer: &SampleBuffer,
) -> WsigResult<()> {
    let format_tag = buffer.data.format_tag()?;
    let width = buffer.data.element_width();
    let channels = buffer.channels;
    let block_align = channels * width;
    let byte_rate = sample_rate * block_align as u32;
    let data_size = (buffer.data.len() * width as usize) as u32;

    let base = sink.stream_position()?;

    sink.write_all(&RIFF_ID.to_le_bytes())?;
    sink.write_all(&0u32.to_le_bytes())?; // total size, backpatched below
    sink.write_all(&WAVE_ID.to_le_bytes())?;

    sink.write_all(&FMT_ID.to_le_bytes())?;
    sink.write_all(&16u32.to_le_bytes())?;
    sink.write_all(&format_tag.to_le_bytes())?;
    sink.write_all(&channels.to_le_bytes())?;
    sink.write_all(&sample_rate.to_le_bytes())?;
    sink.write_all(&byte_rate.to_le_bytes())?;
    sink.write_all(&block_align.to_le_bytes())?;
    sink.write_all(&(width * 8).to_le_bytes())?;

    sink.write_all(&DATA_ID.to_le_bytes())?;
    sink.write_all(&data_size.to_le_bytes())?;
    write_payload(sink, &buffer.data)?;
    if data_size % 2 == 1 {
        sink.write_all(&[0])?;
    }

    let end = sink.stream_position()?;
    sink.seek(SeekFrom::Start(base + 4))?;
    sink.write_all(&((end - base - 8) as u32).to_le_bytes())?;
    sink.seek(SeekFrom::Start(end))?;

    Ok(())
}

/// Write a standard WAVE file at `path`.
pub fn write_path<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    buffer: &SampleBuffer,
) -> WsigResult<()> {
    let mut sink = BufWriter::new(File::create(path)?);
    write(&mut sink, sample_rate, buffer)?;
    sink.flush()?;
    Ok(())
}

/// Serialize the raw sample bytes little-endian.
fn write_payload<W: Write>(sink: &mut W, data: &SampleData) -> WsigResult<()> {
    fn le_bytes<W: Write, T, F, const N: usize>(
        sink: &mut W,
        samples: &[T],
        to_le: F,
    ) -> WsigResult<()>
    where
        T: Copy,
        F: Fn(T) -> [u8; N],
    {
        let mut out = Vec::with_capacity(samples.len() * N);
        for &sample in samples {
            out.extend_from_slice(&to_le(sample));
        }
        sink.write_all(&out)?;
        Ok(())
    }

    match data {
        SampleData::Uint8(s) => {
            sink.write_all(s)?;
            Ok(())
        }
        SampleData::Int16(s) => le_bytes(sink, s, i16::to_le_bytes),
        SampleData::Int32(s) => le_bytes(sink, s, i32::to_le_bytes),
        SampleData::Float32(s) => le_bytes(sink, s, f32::to_le_bytes),
        SampleData::Float64(s) => le_bytes(sink, s, f64::to_le_bytes),
        // Rejected by format_tag before any bytes are written.
        SampleData::Uint16(_) => Err(WsigError::UnsupportedSampleKind {
            kind: "unsigned 16-bit",
        }),
        SampleData::Uint32(_) => Err(WsigError::UnsupportedSampleKind {
            kind: "unsigned 32-bit",
        }),
    }
}
