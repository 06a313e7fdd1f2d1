//! Fixed-layout record decoders for the descriptor chunks.
//!
//! Each decoder consumes an exact number of payload bytes from its chunk and
//! produces a typed record:
//! - `fmt ` (14+2 bytes): standard WAVE format descriptor
//! - `sdsc` (128 bytes): signal descriptor with calibration constants
//! - `adsc` (32 bytes): acquisition descriptor with the channel layout
//! - `LIST`: free-text metadata blob written by the recording instrument
//!
//! All multi-byte integers are little-endian.

use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;

use crate::cursor::Chunk;
use crate::error::{WsigError, WsigResult};

/// Encoding tag for uncompressed linear PCM, the only supported encoding.
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Sequential field reader over a fully-buffered fixed layout.
struct Fields<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> &'a [u8] {
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    fn u16(&mut self) -> u16 {
        let b = self.bytes(2);
        u16::from_le_bytes([b[0], b[1]])
    }

    fn i16(&mut self) -> i16 {
        let b = self.bytes(2);
        i16::from_le_bytes([b[0], b[1]])
    }

    fn u32(&mut self) -> u32 {
        let b = self.bytes(4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn i32(&mut self) -> i32 {
        let b = self.bytes(4);
        i32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }
}

/// Read `n` payload bytes or fail with `MalformedRecord` if the chunk is
/// shorter than the fixed layout requires.
fn read_record<R: Read>(
    source: &mut R,
    chunk: &mut Chunk,
    tag: &'static str,
    n: usize,
) -> WsigResult<Vec<u8>> {
    if (chunk.remaining() as usize) < n {
        return Err(WsigError::MalformedRecord {
            tag,
            expected: n,
            actual: chunk.remaining() as usize,
        });
    }
    let mut buf = vec![0u8; n];
    chunk.read_exact(source, &mut buf)?;
    Ok(buf)
}

/// Strip NUL fill bytes and decode as ASCII.
fn ascii_field(raw: &[u8], field: &'static str) -> WsigResult<String> {
    let stripped: Vec<u8> = raw.iter().copied().filter(|&b| b != 0).collect();
    if !stripped.is_ascii() {
        return Err(WsigError::NonAsciiText { field });
    }
    String::from_utf8(stripped).map_err(|_| WsigError::NonAsciiText { field })
}

/// Standard WAVE format descriptor (`fmt ` chunk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRecord {
    /// Number of interleaved channels (≥ 1).
    pub channels: u16,
    /// Sampling frequency in Hz.
    pub sample_rate: u32,
    /// Declared average data rate in bytes per second.
    pub avg_bytes_per_sec: u32,
    /// Bytes per sample frame.
    pub block_align: u16,
    /// Bytes per single-channel sample, derived from bits per sample.
    pub sample_width: u16,
}

impl FormatRecord {
    /// Fixed prefix: encoding, channels, rate, byte rate, block align.
    pub const PREFIX_SIZE: usize = 14;
    /// Full PCM layout including bits per sample.
    pub const PCM_SIZE: usize = 16;

    pub fn decode<R: Read>(source: &mut R, chunk: &mut Chunk) -> WsigResult<FormatRecord> {
        let buf = read_record(source, chunk, "fmt ", Self::PREFIX_SIZE)?;
        let mut f = Fields::new(&buf);
        let encoding = f.u16();
        let channels = f.u16();
        let sample_rate = f.u32();
        let avg_bytes_per_sec = f.u32();
        let block_align = f.u16();

        if encoding != WAVE_FORMAT_PCM {
            return Err(WsigError::UnsupportedEncoding { tag: encoding });
        }

        let buf = read_record(source, chunk, "fmt ", Self::PCM_SIZE - Self::PREFIX_SIZE)?;
        let bits = Fields::new(&buf).u16();
        let sample_width = ((bits as u32 + 7) / 8) as u16;
        if sample_width == 0 {
            return Err(WsigError::BadSampleWidth);
        }
        if channels == 0 {
            return Err(WsigError::BadChannelCount);
        }

        Ok(FormatRecord {
            channels,
            sample_rate,
            avg_bytes_per_sec,
            block_align,
            sample_width,
        })
    }
}

/// Signal descriptor (`sdsc` chunk): parameter identity plus the
/// calibration constants used to convert raw samples into physical units.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    /// Declared structure size (128 for every known producer).
    pub struct_size: u32,
    /// Instrument-assigned parameter acronym, kept as raw bytes.
    pub acronym: [u8; 4],
    /// Human-readable parameter name.
    pub parameter_name: String,
    /// Physical unit of the calibrated signal.
    pub unit_name: String,
    /// Sample count declared by the instrument.
    pub sample_count: u32,
    /// Sampling frequency in Hz.
    pub sample_rate: u32,
    /// Highest raw value observed during acquisition.
    pub signal_max: i16,
    /// Lowest raw value observed during acquisition.
    pub signal_min: i16,
    /// Raw value corresponding to the calibration maximum.
    pub calibration_max: i16,
    /// Raw value corresponding to the calibration baseline.
    pub calibration_zero: i16,
    /// Integer part of the value at calibration maximum.
    pub value_int_part: i32,
    /// Fractional part of the value at calibration maximum, scaled by 10^5.
    pub value_frac_part: u32,
}

impl SignalRecord {
    pub const SIZE: usize = 128;

    pub fn decode<R: Read>(source: &mut R, chunk: &mut Chunk) -> WsigResult<SignalRecord> {
        let buf = read_record(source, chunk, "sdsc", Self::SIZE)?;
        let mut f = Fields::new(&buf);

        let struct_size = f.u32();
        let acronym_bytes = f.bytes(4);
        let acronym = [
            acronym_bytes[0],
            acronym_bytes[1],
            acronym_bytes[2],
            acronym_bytes[3],
        ];
        let parameter_name = ascii_field(f.bytes(80), "parameter name")?;
        let unit_name = ascii_field(f.bytes(16), "unit name")?;
        let sample_count = f.u32();
        let sample_rate = f.u32();
        let signal_max = f.i16();
        let signal_min = f.i16();
        let calibration_max = f.i16();
        let calibration_zero = f.i16();
        let value_int_part = f.i32();
        let value_frac_part = f.u32();

        Ok(SignalRecord {
            struct_size,
            acronym,
            parameter_name,
            unit_name,
            sample_count,
            sample_rate,
            signal_max,
            signal_min,
            calibration_max,
            calibration_zero,
            value_int_part,
            value_frac_part,
        })
    }

    /// Signed span between the calibration maximum and baseline. Must be
    /// non-zero for calibration to be meaningful.
    pub fn signal_dynamic(&self) -> f64 {
        (self.calibration_max as i32 - self.calibration_zero as i32) as f64
    }

    /// Physical value at the calibration maximum.
    pub fn value_at_max(&self) -> f64 {
        self.value_int_part as f64 + self.value_frac_part as f64 / 100_000.0
    }

    /// Convert one raw sample into the parameter's physical unit.
    pub fn calibrate(&self, raw: i16) -> f64 {
        (raw as i32 - self.calibration_zero as i32) as f64 * self.value_at_max()
            / self.signal_dynamic()
    }
}

/// Acquisition descriptor (`adsc` chunk): the channel layout actually used
/// by the recording program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRecord {
    /// Declared structure size (32 for every known producer).
    pub struct_size: u32,
    /// Number of interleaved channels (≥ 1).
    pub channels: u16,
    /// Sample count declared by the acquisition program.
    pub sample_count: u32,
    /// Acquisition frequency in Hz.
    pub acquisition_rate: u32,
    /// Bytes per single-channel sample, derived from bits per sample.
    pub sample_width: u16,
    /// Highest value observed.
    pub highest: i32,
    /// Lowest value observed.
    pub lowest: i32,
    /// Observed zero level.
    pub zero: i32,
    /// Recording program code (presence only, not validated).
    pub recorder_code: u16,
    /// Recording program version (presence only, not validated).
    pub recorder_version: u16,
}

impl AcquisitionRecord {
    pub const SIZE: usize = 32;

    pub fn decode<R: Read>(source: &mut R, chunk: &mut Chunk) -> WsigResult<AcquisitionRecord> {
        let buf = read_record(source, chunk, "adsc", Self::SIZE)?;
        let mut f = Fields::new(&buf);

        let struct_size = f.u32();
        let channels = f.u16();
        let sample_count = f.u32();
        let acquisition_rate = f.u32();
        let bits = f.u16();
        let highest = f.i32();
        let lowest = f.i32();
        let zero = f.i32();
        let recorder_code = f.u16();
        let recorder_version = f.u16();

        let sample_width = ((bits as u32 + 7) / 8) as u16;
        if sample_width == 0 {
            return Err(WsigError::BadSampleWidth);
        }
        if channels == 0 {
            return Err(WsigError::BadChannelCount);
        }

        Ok(AcquisitionRecord {
            struct_size,
            channels,
            sample_count,
            acquisition_rate,
            sample_width,
            highest,
            lowest,
            zero,
            recorder_code,
            recorder_version,
        })
    }
}

/// Decode the `LIST` metadata blob: NUL bytes become spaces, the text is
/// ASCII-decoded, and fields are split on runs of three or more spaces.
pub fn decode_metadata<R: Read>(source: &mut R, chunk: &mut Chunk) -> WsigResult<Vec<String>> {
    static FIELD_SEP: OnceLock<Regex> = OnceLock::new();

    let mut raw = vec![0u8; chunk.remaining() as usize];
    chunk.read_exact(source, &mut raw)?;
    for b in &mut raw {
        if *b == 0 {
            *b = b' ';
        }
    }
    if !raw.is_ascii() {
        return Err(WsigError::NonAsciiText { field: "metadata" });
    }
    let text = String::from_utf8(raw).map_err(|_| WsigError::NonAsciiText { field: "metadata" })?;

    let sep = FIELD_SEP.get_or_init(|| Regex::new(r" {3,}").expect("fixed pattern"));
    Ok(sep
        .split(&text)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Chunk;
    use std::io::Cursor;

    /// Wrap a payload in a chunk header and position a cursor at the body.
    fn chunk_over(tag: &[u8; 4], payload: &[u8]) -> (Cursor<Vec<u8>>, Chunk) {
        let mut data = Vec::new();
        data.extend_from_slice(tag);
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(payload);
        let mut src = Cursor::new(data);
        let chunk = Chunk::next(&mut src).unwrap().unwrap();
        (src, chunk)
    }

    fn pcm_fmt_payload(channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        p.extend_from_slice(&channels.to_le_bytes());
        p.extend_from_slice(&rate.to_le_bytes());
        p.extend_from_slice(&(rate * channels as u32 * (bits as u32 / 8)).to_le_bytes());
        p.extend_from_slice(&(channels * bits / 8).to_le_bytes());
        p.extend_from_slice(&bits.to_le_bytes());
        p
    }

    fn sdsc_payload() -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&128u32.to_le_bytes());
        p.extend_from_slice(b"AIRF");
        let mut name = [0u8; 80];
        name[..12].copy_from_slice(b"Oral airflow");
        p.extend_from_slice(&name);
        let mut unit = [0u8; 16];
        unit[..5].copy_from_slice(b"l/min");
        p.extend_from_slice(&unit);
        p.extend_from_slice(&16000u32.to_le_bytes()); // sample count
        p.extend_from_slice(&8000u32.to_le_bytes()); // sample rate
        p.extend_from_slice(&2047i16.to_le_bytes()); // max
        p.extend_from_slice(&(-2048i16).to_le_bytes()); // min
        p.extend_from_slice(&2000i16.to_le_bytes()); // calibration max
        p.extend_from_slice(&0i16.to_le_bytes()); // calibration zero
        p.extend_from_slice(&12i32.to_le_bytes()); // integer part
        p.extend_from_slice(&50_000u32.to_le_bytes()); // fractional part
        assert_eq!(p.len(), 128);
        p
    }

    #[test]
    fn test_format_decode() {
        let (mut src, mut chunk) = chunk_over(b"fmt ", &pcm_fmt_payload(2, 44100, 16));
        let fmt = FormatRecord::decode(&mut src, &mut chunk).unwrap();
        assert_eq!(fmt.channels, 2);
        assert_eq!(fmt.sample_rate, 44100);
        assert_eq!(fmt.sample_width, 2);
        assert_eq!(fmt.block_align, 4);
    }

    #[test]
    fn test_format_rounds_bits_up_to_whole_bytes() {
        let (mut src, mut chunk) = chunk_over(b"fmt ", &pcm_fmt_payload(1, 8000, 12));
        let fmt = FormatRecord::decode(&mut src, &mut chunk).unwrap();
        assert_eq!(fmt.sample_width, 2);
    }

    #[test]
    fn test_format_rejects_non_pcm() {
        let mut payload = pcm_fmt_payload(1, 8000, 16);
        payload[0] = 3; // IEEE float
        let (mut src, mut chunk) = chunk_over(b"fmt ", &payload);
        let result = FormatRecord::decode(&mut src, &mut chunk);
        assert!(matches!(
            result,
            Err(WsigError::UnsupportedEncoding { tag: 3 })
        ));
    }

    #[test]
    fn test_format_rejects_zero_channels() {
        let (mut src, mut chunk) = chunk_over(b"fmt ", &pcm_fmt_payload(0, 8000, 16));
        let result = FormatRecord::decode(&mut src, &mut chunk);
        assert!(matches!(result, Err(WsigError::BadChannelCount)));
    }

    #[test]
    fn test_format_rejects_zero_sample_width() {
        let mut payload = pcm_fmt_payload(1, 8000, 16);
        payload[14] = 0;
        payload[15] = 0;
        let (mut src, mut chunk) = chunk_over(b"fmt ", &payload);
        let result = FormatRecord::decode(&mut src, &mut chunk);
        assert!(matches!(result, Err(WsigError::BadSampleWidth)));
    }

    #[test]
    fn test_format_too_short() {
        let (mut src, mut chunk) = chunk_over(b"fmt ", &[0u8; 10]);
        match FormatRecord::decode(&mut src, &mut chunk) {
            Err(WsigError::MalformedRecord {
                tag,
                expected,
                actual,
            }) => {
                assert_eq!(tag, "fmt ");
                assert_eq!(expected, 14);
                assert_eq!(actual, 10);
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_signal_decode_and_calibration() {
        let (mut src, mut chunk) = chunk_over(b"sdsc", &sdsc_payload());
        let sig = SignalRecord::decode(&mut src, &mut chunk).unwrap();
        assert_eq!(sig.parameter_name, "Oral airflow");
        assert_eq!(sig.unit_name, "l/min");
        assert_eq!(sig.sample_rate, 8000);
        assert_eq!(sig.signal_max, 2047);
        assert_eq!(sig.signal_min, -2048);
        assert_eq!(sig.calibration_zero, 0);
        assert_eq!(sig.signal_dynamic(), 2000.0);
        assert_eq!(sig.value_at_max(), 12.5);
        // calibrated = (raw - zero) * value_at_max / dynamic
        assert_eq!(sig.calibrate(2000), 12.5);
        assert_eq!(sig.calibrate(0), 0.0);
        assert_eq!(sig.calibrate(1000), 6.25);
    }

    #[test]
    fn test_signal_too_short() {
        let (mut src, mut chunk) = chunk_over(b"sdsc", &[0u8; 64]);
        assert!(matches!(
            SignalRecord::decode(&mut src, &mut chunk),
            Err(WsigError::MalformedRecord { tag: "sdsc", .. })
        ));
    }

    #[test]
    fn test_signal_rejects_non_ascii_name() {
        let mut payload = sdsc_payload();
        payload[8] = 0xc3; // inside the parameter name field
        let (mut src, mut chunk) = chunk_over(b"sdsc", &payload);
        assert!(matches!(
            SignalRecord::decode(&mut src, &mut chunk),
            Err(WsigError::NonAsciiText { .. })
        ));
    }

    #[test]
    fn test_acquisition_decode() {
        let mut p = Vec::new();
        p.extend_from_slice(&32u32.to_le_bytes());
        p.extend_from_slice(&1u16.to_le_bytes()); // channels
        p.extend_from_slice(&16000u32.to_le_bytes()); // sample count
        p.extend_from_slice(&8000u32.to_le_bytes()); // acquisition rate
        p.extend_from_slice(&16u16.to_le_bytes()); // bits
        p.extend_from_slice(&2047i32.to_le_bytes());
        p.extend_from_slice(&(-2048i32).to_le_bytes());
        p.extend_from_slice(&0i32.to_le_bytes());
        p.extend_from_slice(&7u16.to_le_bytes()); // recorder code
        p.extend_from_slice(&2u16.to_le_bytes()); // recorder version
        assert_eq!(p.len(), 32);

        let (mut src, mut chunk) = chunk_over(b"adsc", &p);
        let acq = AcquisitionRecord::decode(&mut src, &mut chunk).unwrap();
        assert_eq!(acq.channels, 1);
        assert_eq!(acq.sample_width, 2);
        assert_eq!(acq.acquisition_rate, 8000);
        assert_eq!(acq.highest, 2047);
        assert_eq!(acq.lowest, -2048);
        assert_eq!(acq.recorder_code, 7);
        assert_eq!(acq.recorder_version, 2);
    }

    #[test]
    fn test_acquisition_too_short() {
        let (mut src, mut chunk) = chunk_over(b"adsc", &[0u8; 16]);
        assert!(matches!(
            AcquisitionRecord::decode(&mut src, &mut chunk),
            Err(WsigError::MalformedRecord { tag: "adsc", .. })
        ));
    }

    #[test]
    fn test_metadata_split_on_space_runs() {
        let blob = b"EVA2 station\x00\x00\x00Operator: G. Pouchoulin\x00\x00\x00\x00\x0018/12/2008";
        let (mut src, mut chunk) = chunk_over(b"LIST", blob);
        let fields = decode_metadata(&mut src, &mut chunk).unwrap();
        assert_eq!(
            fields,
            vec![
                "EVA2 station".to_string(),
                "Operator: G. Pouchoulin".to_string(),
                "18/12/2008".to_string(),
            ]
        );
    }

    #[test]
    fn test_metadata_short_runs_do_not_split() {
        let blob = b"one two\x00\x00three";
        let (mut src, mut chunk) = chunk_over(b"LIST", blob);
        let fields = decode_metadata(&mut src, &mut chunk).unwrap();
        assert_eq!(fields, vec!["one two  three".to_string()]);
    }
}
