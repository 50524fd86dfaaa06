//! Speech playback pipeline.
//!
//! Architecture:
//! - `stream`: in-memory or file-backed clips with a `u16` frame table
//! - `codec`: decoder / DAC seams and PCM to 8-bit conversion
//! - `double_buffer`: two buffers circulating to a persistent DMA worker
//! - `player`: serialized sessions with per-frame cancellation
//! - `clips`: memory-resident clips by name

mod clips;
mod codec;
mod double_buffer;
mod error;
mod player;
mod stream;

pub use clips::{Clip, ClipTable};
pub use codec::{convert_frame, to_dac_sample, AudioOutput, FrameDecoder};
pub use error::{DecodeError, OutputError, PlaybackError};
pub use player::{PlaybackSnapshot, PlaybackStats, Player, StreamPlayer};
pub use stream::{AudioStream, TABLE_ENTRY_LEN};
