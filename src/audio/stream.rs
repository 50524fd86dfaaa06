//! Compressed stream descriptors and frame-table reading.
//!
//! A clip is two byte sequences: the compressed frames back to back, and a
//! frame table of little-endian `u16` lengths, one per frame. Zero-length
//! entries are keepalives and carry no payload.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::ops::Deref;
use std::path::Path;

use super::error::PlaybackError;

/// Bytes per frame-table entry.
pub const TABLE_ENTRY_LEN: usize = 2;

/// Where a clip's bytes come from.
pub enum AudioStream<'a> {
    /// Clip linked into the firmware image.
    Memory { data: &'a [u8], packets: &'a [u8] },
    /// Clip on the flash filesystem.
    File {
        data: File,
        packets: File,
        /// Byte length of the frame table file.
        packets_len: u64,
    },
}

impl AudioStream<'static> {
    /// Open a filesystem clip and its frame table.
    pub fn open(clip: &Path, packets: &Path) -> io::Result<Self> {
        let data = File::open(clip)?;
        let packets = File::open(packets)?;
        let packets_len = packets.metadata()?.len();
        Ok(AudioStream::File {
            data,
            packets,
            packets_len,
        })
    }
}

impl<'a> AudioStream<'a> {
    /// Number of frame-table entries, including keepalives.
    pub fn frame_count(&self) -> usize {
        match self {
            AudioStream::Memory { packets, .. } => packets.len() / TABLE_ENTRY_LEN,
            AudioStream::File { packets_len, .. } => (*packets_len / TABLE_ENTRY_LEN as u64) as usize,
        }
    }

    pub(crate) fn into_reader(self) -> FrameReader<'a> {
        let entries = self.frame_count();
        let source = match self {
            AudioStream::Memory { data, packets } => Source::Memory {
                data,
                offset: 0,
                table: packets,
            },
            AudioStream::File { data, packets, .. } => Source::File {
                data,
                table: BufReader::new(packets),
            },
        };
        FrameReader {
            source,
            remaining: entries,
        }
    }
}

/// One frame's compressed bytes.
pub(crate) enum Payload<'a> {
    /// Slice of a memory-resident clip.
    Borrowed(&'a [u8]),
    /// Per-frame buffer read from a file, freed after decoding.
    Owned(Vec<u8>),
}

impl Deref for Payload<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Payload::Borrowed(bytes) => bytes,
            Payload::Owned(bytes) => bytes,
        }
    }
}

enum Source<'a> {
    Memory {
        data: &'a [u8],
        offset: usize,
        table: &'a [u8],
    },
    File {
        data: File,
        table: BufReader<File>,
    },
}

/// Walks a frame table, handing out one payload per entry.
pub(crate) struct FrameReader<'a> {
    source: Source<'a>,
    remaining: usize,
}

impl<'a> FrameReader<'a> {
    /// Length of the next frame, `None` once the table is exhausted.
    pub(crate) fn next_len(&mut self) -> Result<Option<usize>, PlaybackError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let mut entry = [0u8; TABLE_ENTRY_LEN];
        match &mut self.source {
            Source::Memory { table, .. } => {
                let whole: &'a [u8] = *table;
                let (head, rest) = whole.split_at(TABLE_ENTRY_LEN);
                entry.copy_from_slice(head);
                *table = rest;
            }
            Source::File { table, .. } => {
                let got = read_full(table, &mut entry)?;
                if got < TABLE_ENTRY_LEN {
                    return Err(PlaybackError::ShortRead {
                        expected: TABLE_ENTRY_LEN,
                        got,
                    });
                }
            }
        }
        Ok(Some(u16::from_le_bytes(entry) as usize))
    }

    /// The next `len` compressed bytes.
    pub(crate) fn payload(&mut self, len: usize) -> Result<Payload<'a>, PlaybackError> {
        match &mut self.source {
            Source::Memory { data, offset, .. } => {
                let available = data.len().saturating_sub(*offset);
                if available < len {
                    return Err(PlaybackError::ShortRead {
                        expected: len,
                        got: available,
                    });
                }
                let data: &'a [u8] = *data;
                let frame = &data[*offset..*offset + len];
                *offset += len;
                Ok(Payload::Borrowed(frame))
            }
            Source::File { data, .. } => {
                let mut buf = Vec::new();
                buf.try_reserve_exact(len)
                    .map_err(|_| PlaybackError::OutOfMemory(len))?;
                buf.resize(len, 0);
                let got = read_full(data, &mut buf)?;
                if got < len {
                    return Err(PlaybackError::ShortRead { expected: len, got });
                }
                Ok(Payload::Owned(buf))
            }
        }
    }
}

/// Read until `buf` is full or the source hits end of file.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
