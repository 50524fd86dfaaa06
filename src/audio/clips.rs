//! Memory-resident clips, looked up by name.

use super::stream::AudioStream;

/// A clip linked into the firmware image.
#[derive(Clone, Copy, Debug)]
pub struct Clip {
    pub name: &'static str,
    /// Compressed frames back to back.
    pub data: &'static [u8],
    /// Frame table (little-endian `u16` lengths).
    pub packets: &'static [u8],
}

impl Clip {
    pub fn stream(&self) -> AudioStream<'static> {
        AudioStream::Memory {
            data: self.data,
            packets: self.packets,
        }
    }
}

mod embedded {
    use super::Clip;

    include!(concat!(env!("OUT_DIR"), "/embedded_clips.rs"));
}

/// Name to clip mapping.
#[derive(Clone, Debug)]
pub struct ClipTable {
    clips: Vec<Clip>,
}

impl ClipTable {
    /// Table over an explicit clip list.
    pub fn new(clips: impl IntoIterator<Item = Clip>) -> Self {
        let mut clips: Vec<Clip> = clips.into_iter().collect();
        clips.sort_by(|a, b| a.name.cmp(b.name));
        Self { clips }
    }

    /// Clips generated from `assets/clips` at build time.
    pub fn embedded() -> Self {
        Self::new(embedded::EMBEDDED_CLIPS.iter().copied())
    }

    pub fn get(&self, name: &str) -> Option<&Clip> {
        self.clips
            .binary_search_by(|clip| clip.name.cmp(name))
            .ok()
            .map(|i| &self.clips[i])
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.clips.iter().map(|clip| clip.name)
    }
}
