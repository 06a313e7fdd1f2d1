//! Container scan and frame-level access.
//!
//! A single forward pass reads the container header and variant tag, then
//! scans the chunk stream, dispatching each chunk to its record decoder,
//! enforcing ordering rules, and locating the `data` payload. The resulting
//! reader exposes a frame-indexed cursor over the raw samples regardless of
//! which variant was read.
//!
//! Chunk ordering rules:
//! - `WAVE`: `fmt ` must precede `data`; `data` ends the scan.
//! - `WSIG`: `sdsc` must precede `data`; `adsc` is optional (a 16-bit mono
//!   layout is assumed when it is absent); a `LIST` metadata chunk always
//!   ends the scan, and the scan otherwise continues past `data` so a
//!   trailing `LIST` is captured.
//! - Unknown chunk tags are skipped.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, warn};

use crate::cursor::{
    self, tag_name, Chunk, Variant, ADSC_ID, DATA_ID, FMT_ID, LIST_ID, SDSC_ID,
};
use crate::error::{WsigError, WsigResult};
use crate::records::{decode_metadata, AcquisitionRecord, FormatRecord, SignalRecord};

/// Summary of the decoded stream parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WsigParams {
    pub channels: u16,
    pub sample_width: u16,
    pub sample_rate: u32,
    pub frames: u64,
    pub comp_type: &'static str,
    pub comp_name: &'static str,
    pub duration: f64,
}

/// Everything the chunk scan produces; immutable once built.
#[derive(Debug)]
struct ScanOutcome {
    variant: Variant,
    channels: u16,
    sample_width: u16,
    sample_rate: u32,
    frame_size: u64,
    frame_count: u64,
    data_start: u64,
    data_size: u32,
    format: Option<FormatRecord>,
    signal: Option<SignalRecord>,
    acquisition: Option<AcquisitionRecord>,
    metadata: Option<Vec<String>>,
}

/// Reader over a parsed container.
///
/// Construction performs the full chunk scan; afterwards only the frame
/// cursor mutates. The byte source is owned by the reader and released when
/// the reader is dropped or explicitly closed, including on every failure
/// path out of [`WsigReader::new`], where the source is dropped before the
/// error propagates.
pub struct WsigReader<R> {
    source: R,
    scan: ScanOutcome,
    /// Current frame-indexed cursor position, always in `0..=frame_count`.
    pos: u64,
    /// Set when the source must re-seek before the next payload read.
    seek_needed: bool,
}

/// Open a file on disk for reading.
pub fn open<P: AsRef<Path>>(path: P) -> WsigResult<WsigReader<BufReader<File>>> {
    let file = File::open(path)?;
    WsigReader::new(BufReader::new(file))
}

impl<R: Read + Seek> WsigReader<R> {
    /// Parse a container from any seekable byte source.
    pub fn new(mut source: R) -> WsigResult<Self> {
        let scan = scan_chunks(&mut source)?;
        Ok(WsigReader {
            source,
            scan,
            pos: 0,
            seek_needed: true,
        })
    }

    pub fn variant(&self) -> Variant {
        self.scan.variant
    }

    pub fn channel_count(&self) -> u16 {
        self.scan.channels
    }

    /// Bytes per single-channel sample.
    pub fn sample_width(&self) -> u16 {
        self.scan.sample_width
    }

    pub fn sample_rate(&self) -> u32 {
        self.scan.sample_rate
    }

    /// Total frames in the data payload (`data size / frame size`).
    pub fn frame_count(&self) -> u64 {
        self.scan.frame_count
    }

    /// Recording length in seconds.
    pub fn duration(&self) -> f64 {
        self.scan.frame_count as f64 / self.scan.sample_rate as f64
    }

    pub fn comp_type(&self) -> &'static str {
        "NONE"
    }

    pub fn comp_name(&self) -> &'static str {
        "not compressed"
    }

    pub fn params(&self) -> WsigParams {
        WsigParams {
            channels: self.channel_count(),
            sample_width: self.sample_width(),
            sample_rate: self.sample_rate(),
            frames: self.frame_count(),
            comp_type: self.comp_type(),
            comp_name: self.comp_name(),
            duration: self.duration(),
        }
    }

    /// The decoded format descriptor, when a `fmt ` chunk was present.
    pub fn format(&self) -> Option<&FormatRecord> {
        self.scan.format.as_ref()
    }

    /// The decoded signal descriptor (`WSIG` only).
    pub fn signal(&self) -> Option<&SignalRecord> {
        self.scan.signal.as_ref()
    }

    /// The decoded acquisition descriptor (`WSIG` only, optional).
    pub fn acquisition(&self) -> Option<&AcquisitionRecord> {
        self.scan.acquisition.as_ref()
    }

    /// Instrument metadata fields from the `LIST` chunk, in file order.
    pub fn metadata(&self) -> Option<&[String]> {
        self.scan.metadata.as_deref()
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.signal().map(|s| s.parameter_name.as_str())
    }

    pub fn unit_name(&self) -> Option<&str> {
        self.signal().map(|s| s.unit_name.as_str())
    }

    /// Calibration max minus calibration zero; non-zero on any calibratable
    /// file.
    pub fn signal_dynamic(&self) -> Option<f64> {
        self.signal().map(SignalRecord::signal_dynamic)
    }

    /// Physical value at the calibration maximum.
    pub fn value_at_max(&self) -> Option<f64> {
        self.signal().map(SignalRecord::value_at_max)
    }

    pub fn calibration_zero(&self) -> Option<i16> {
        self.signal().map(|s| s.calibration_zero)
    }

    /// Convert one raw sample into the parameter's physical unit.
    pub fn calibrate(&self, raw: i16) -> Option<f64> {
        self.signal().map(|s| s.calibrate(raw))
    }

    /// Current frame-indexed cursor position. Not convertible to a byte
    /// offset in the underlying source.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Reposition the frame cursor. Fails without mutating state when `pos`
    /// is past the end of the data; on success the cached byte offset is
    /// invalidated so the next read re-seeks.
    pub fn set_pos(&mut self, pos: u64) -> WsigResult<()> {
        if pos > self.scan.frame_count {
            return Err(WsigError::PositionOutOfRange {
                pos,
                max: self.scan.frame_count,
            });
        }
        self.pos = pos;
        self.seek_needed = true;
        Ok(())
    }

    /// Rewind the frame cursor to the start of the data.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.seek_needed = true;
    }

    /// Read up to `nframes` frames from the cursor position as raw bytes.
    ///
    /// A negative count reads everything remaining; zero returns an empty
    /// buffer without touching the source. Reads never extend past the
    /// declared data size, even when more bytes physically follow, and a
    /// physically short data chunk yields the complete frames actually
    /// present. Samples wider than one byte are returned in native byte
    /// order (the stored payload is little-endian).
    pub fn read_frames(&mut self, nframes: i64) -> WsigResult<Vec<u8>> {
        if nframes == 0 {
            return Ok(Vec::new());
        }

        if self.seek_needed {
            let byte_pos = self.scan.data_start + self.pos * self.scan.frame_size;
            self.source.seek(SeekFrom::Start(byte_pos))?;
            self.seek_needed = false;
        }

        let remaining = self.scan.frame_count - self.pos;
        let want = if nframes < 0 {
            remaining
        } else {
            (nframes as u64).min(remaining)
        };

        let mut buf = vec![0u8; (want * self.scan.frame_size) as usize];
        let got = read_full(&mut self.source, &mut buf)?;
        let frames = got as u64 / self.scan.frame_size;
        buf.truncate((frames * self.scan.frame_size) as usize);

        if self.scan.sample_width > 1 && cfg!(target_endian = "big") {
            for sample in buf.chunks_exact_mut(self.scan.sample_width as usize) {
                sample.reverse();
            }
        }

        self.pos += frames;
        Ok(buf)
    }

    /// Release the byte source. Dropping the reader has the same effect;
    /// consuming `self` makes double-close unrepresentable.
    pub fn close(self) {}
}

/// Read until `buf` is full or the source is exhausted.
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

/// Drive the chunk cursor through the container, dispatching each chunk to
/// its decoder and enforcing the variant's ordering invariants.
fn scan_chunks<R: Read + Seek>(source: &mut R) -> WsigResult<ScanOutcome> {
    let (variant, _declared_total) = cursor::read_container_header(source)?;

    let mut format: Option<FormatRecord> = None;
    let mut signal: Option<SignalRecord> = None;
    let mut acquisition: Option<AcquisitionRecord> = None;
    let mut metadata: Option<Vec<String>> = None;
    let mut data: Option<(u64, u32)> = None;

    // Running layout, mutated in chunk order like the shared descriptor
    // fields it models: fmt and adsc both feed it, last writer wins.
    let mut channels: u16 = 0;
    let mut sample_width: u16 = 0;
    let mut sample_rate: u32 = 0;
    let mut frame_size: u64 = 0;
    let mut frame_count: u64 = 0;

    while let Some(mut chunk) = Chunk::next(source)? {
        match (variant, chunk.id()) {
            (_, FMT_ID) => {
                let fmt = FormatRecord::decode(source, &mut chunk)?;
                channels = fmt.channels;
                sample_width = fmt.sample_width;
                sample_rate = fmt.sample_rate;
                frame_size = channels as u64 * sample_width as u64;
                format = Some(fmt);
            }
            (Variant::Wave, DATA_ID) => {
                if format.is_none() {
                    return Err(WsigError::ChunkOrder { required: "fmt " });
                }
                data = Some((chunk.start(), chunk.size()));
                frame_count = chunk.size() as u64 / frame_size;
                // Terminal success: chunks after data are never consulted.
                break;
            }
            (Variant::Wsig, SDSC_ID) => {
                let sig = SignalRecord::decode(source, &mut chunk)?;
                sample_rate = sig.sample_rate;
                signal = Some(sig);
            }
            (Variant::Wsig, ADSC_ID) => {
                let acq = AcquisitionRecord::decode(source, &mut chunk)?;
                channels = acq.channels;
                sample_width = acq.sample_width;
                frame_size = channels as u64 * sample_width as u64;
                acquisition = Some(acq);
            }
            (Variant::Wsig, LIST_ID) => {
                metadata = Some(decode_metadata(source, &mut chunk)?);
                // Metadata is the instrument's end-of-useful-data marker and
                // always ends the scan, located data chunk or not.
                break;
            }
            (Variant::Wsig, DATA_ID) => {
                if signal.is_none() {
                    return Err(WsigError::ChunkOrder { required: "sdsc" });
                }
                if frame_size == 0 {
                    warn!("no adsc chunk before data; assuming 16-bit mono layout");
                    channels = 1;
                    sample_width = 2;
                    frame_size = 2;
                }
                data = Some((chunk.start(), chunk.size()));
                frame_count = chunk.size() as u64 / frame_size;
            }
            (_, other) => {
                debug!(
                    "skipping unknown chunk {:?} ({} bytes)",
                    tag_name(other),
                    chunk.size()
                );
            }
        }
        chunk.skip(source)?;
    }

    match variant {
        Variant::Wave => {
            if format.is_none() || data.is_none() {
                return Err(WsigError::MissingRequiredChunk {
                    required: "fmt chunk and/or data chunk",
                });
            }
        }
        Variant::Wsig => {
            if signal.is_none() || data.is_none() {
                return Err(WsigError::MissingRequiredChunk {
                    required: "sdsc chunk and/or data chunk",
                });
            }
        }
    }

    // data is present on both arms above.
    let (data_start, data_size) = match data {
        Some(d) => d,
        None => {
            return Err(WsigError::MissingRequiredChunk {
                required: "data chunk",
            })
        }
    };

    debug!(
        "scan complete: {:?}, {} ch x {} B @ {} Hz, {} frames ({} data bytes)",
        variant, channels, sample_width, sample_rate, frame_count, data_size
    );

    Ok(ScanOutcome {
        variant,
        channels,
        sample_width,
        sample_rate,
        frame_size,
        frame_count,
        data_start,
        data_size,
        format,
        signal,
        acquisition,
        metadata,
    })
}
