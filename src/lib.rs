//! Reader/writer for SESANE `WSIG` and standard `WAVE` RIFF containers.
//!
//! The `WSIG` dialect is produced by EVA biomedical signal-acquisition
//! stations: the familiar RIFF/WAVE chunk framing carrying a signal
//! descriptor (`sdsc`) with calibration constants, an optional acquisition
//! descriptor (`adsc`) with the channel layout, free-text instrument
//! metadata (`LIST`), and the raw sample payload (`data`). Standard WAVE
//! files are read through the same interface, and only standard WAVE is
//! ever written.
//!
//! # Architecture
//!
//! - `cursor` walks the tagged, length-prefixed, even-aligned chunks
//! - `records` decodes each fixed-layout descriptor into a typed record
//! - `reader` drives the scan, enforces chunk ordering, and exposes a
//!   frame-indexed cursor over the sample payload
//! - `writer` serializes a sample buffer into a minimal WAVE container
//! - `error` carries the full failure taxonomy
//!
//! ```no_run
//! # fn main() -> wsig::WsigResult<()> {
//! let mut reader = wsig::open("recording.pr1")?;
//! let raw = reader.read_frames(-1)?;
//! println!(
//!     "{} frames of {:?} at {} Hz",
//!     reader.frame_count(),
//!     reader.parameter_name(),
//!     reader.sample_rate(),
//! );
//! # let _ = raw;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cursor;
pub mod error;
pub mod reader;
pub mod records;
pub mod writer;

pub use cursor::Variant;
pub use error::{WsigError, WsigResult};
pub use reader::{open, WsigParams, WsigReader};
pub use records::{AcquisitionRecord, FormatRecord, SignalRecord};
pub use writer::{write, write_path, SampleBuffer, SampleData};
