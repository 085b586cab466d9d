//! # murmur-segment
//!
//! Divides one audio buffer into an ordered list of segments for the
//! recognizer. Three strategies:
//!
//! - **Fixed**: equal-length chunks with a configurable overlap.
//! - **VAD**: speech regions between qualifying silences, found on a
//!   short-time RMS envelope (25 ms frames, 10 ms hop).
//! - **Hybrid** (recommended): VAD first, then any region longer than
//!   `max_chunk_duration` is re-split with the fixed overlap, preferring
//!   cut points at energy minima inside the target length band.
//!
//! Output indices are always dense `0..N-1` in start order.

#![deny(unsafe_code)]

mod config;
mod segmenter;
mod types;

pub use config::SegmenterConfig;
pub use segmenter::segment;
pub use types::{Segment, SegmentStrategy};
