//! XMODEM receiver for uploading clips.
//!
//! Supports classic 128-byte blocks (`SOH`) and 1K blocks (`STX`), with
//! CRC-16/CCITT when the sender answers the initial `C`, falling back to
//! the 8-bit checksum after `sync_tries` unanswered requests.
//!
//! ```text
//!  receiver                 sender
//!  ── 'C' ───────────────▶
//!  ◀──────────── SOH 01 FE data[128] crc
//!  ── ACK ───────────────▶
//!  ◀──────────── EOT
//!  ── ACK ───────────────▶
//! ```

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;

use crate::transport::Transport;

pub const SOH: u8 = 0x01;
pub const STX: u8 = 0x02;
pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const CAN: u8 = 0x18;
/// Sent instead of `NAK` to request CRC mode.
pub const CRC_REQUEST: u8 = b'C';

/// Receiver tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XmodemConfig {
    /// Timeout for one byte inside a block.
    pub read_timeout: Duration,
    /// Accepted or duplicate blocks allowed without progress. Values below
    /// 1 are treated as 1.
    pub max_retransmit: u32,
    /// Requests sent per handshake character before giving up on it.
    pub sync_tries: u32,
}

impl XmodemConfig {
    pub const DEFAULT: XmodemConfig = XmodemConfig {
        read_timeout: Duration::from_millis(1000),
        max_retransmit: 25,
        sync_tries: 16,
    };
}

impl Default for XmodemConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Why an upload failed.
#[derive(Error, Debug)]
pub enum XmodemError {
    #[error("sender did not respond")]
    Sync,

    #[error("sender cancelled the transfer")]
    Cancelled,

    #[error("too many retransmissions")]
    TooManyRetries,

    #[error("sender switched block size mid-transfer")]
    BlockSizeChanged,

    #[error("link error: {0}")]
    Link(#[source] io::Error),

    #[error("cannot store block: {0}")]
    Store(#[source] io::Error),
}

/// CRC-16/CCITT (XMODEM variant: polynomial 0x1021, initial value 0).
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |mut crc, &byte| {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Classic 8-bit additive checksum.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Receive one file into `dest`. Returns the number of bytes stored.
///
/// Block padding is stored as sent.
pub fn receive<T, W>(link: &mut T, dest: &mut W, config: &XmodemConfig) -> Result<u64, XmodemError>
where
    T: Transport + ?Sized,
    W: Write + ?Sized,
{
    let config = &XmodemConfig {
        max_retransmit: config.max_retransmit.max(1),
        ..*config
    };
    Receiver {
        link,
        config,
        crc: false,
        block_size: None,
        expected: 1,
        retransmit: config.max_retransmit,
        buf: Vec::new(),
        received: 0,
    }
    .run(dest)
}

struct Receiver<'a, T: ?Sized> {
    link: &'a mut T,
    config: &'a XmodemConfig,
    crc: bool,
    block_size: Option<usize>,
    expected: u8,
    retransmit: u32,
    /// Block number, complement, data, check bytes.
    buf: Vec<u8>,
    received: u64,
}

impl<T: Transport + ?Sized> Receiver<'_, T> {
    fn run<W: Write + ?Sized>(&mut self, dest: &mut W) -> Result<u64, XmodemError> {
        let mut try_char = Some(CRC_REQUEST);

        loop {
            let size = match self.await_header(try_char)? {
                Some(Header::Block(size)) => size,
                Some(Header::End { cancelled }) => {
                    self.flush_input();
                    self.send(ACK)?;
                    if cancelled {
                        crate::log_warn!("transfer cancelled by sender");
                        return Err(XmodemError::Cancelled);
                    }
                    crate::log_info!("received {} bytes", self.received);
                    return Ok(self.received);
                }
                None if try_char == Some(CRC_REQUEST) => {
                    crate::log_info!("no CRC sender, falling back to checksum");
                    try_char = Some(NAK);
                    continue;
                }
                None => {
                    crate::log_error!("xmodem sync error");
                    self.abort()?;
                    return Err(XmodemError::Sync);
                }
            };

            match self.block_size {
                Some(current) if current != size => {
                    crate::log_error!("block size changed from {} to {}", current, size);
                    self.abort()?;
                    return Err(XmodemError::BlockSizeChanged);
                }
                Some(_) => {}
                None => {
                    self.block_size = Some(size);
                    self.crc = try_char == Some(CRC_REQUEST);
                    crate::log_info!("sender uses {}-byte blocks, crc {}", size, self.crc);
                }
            }
            try_char = None;

            if self.read_block(size)? && self.block_is_valid(size) {
                let number = self.buf[0];
                if number == self.expected {
                    dest.write_all(&self.buf[2..2 + size]).map_err(XmodemError::Store)?;
                    self.expected = self.expected.wrapping_add(1);
                    self.retransmit = self.config.max_retransmit + 1;
                    self.received += size as u64;
                }
                self.retransmit = self.retransmit.saturating_sub(1);
                if self.retransmit == 0 {
                    crate::log_error!("too many retransmissions");
                    self.abort()?;
                    return Err(XmodemError::TooManyRetries);
                }
                self.send(ACK)?;
                continue;
            }

            crate::log_warn!("rejecting block {}", self.expected);
            self.flush_input();
            self.send(NAK)?;
        }
    }

    /// Wait for a block header, EOT or CAN CAN, sending `try_char` before
    /// each attempt. `None` after `sync_tries` silent attempts.
    fn await_header(&mut self, try_char: Option<u8>) -> Result<Option<Header>, XmodemError> {
        let timeout = self.config.read_timeout * 2;
        for _ in 0..self.config.sync_tries {
            if let Some(c) = try_char {
                self.send(c)?;
            }
            match self.read(timeout)? {
                Some(SOH) => return Ok(Some(Header::Block(128))),
                Some(STX) => return Ok(Some(Header::Block(1024))),
                Some(EOT) => return Ok(Some(Header::End { cancelled: false })),
                Some(CAN) => {
                    if self.read(self.config.read_timeout)? == Some(CAN) {
                        return Ok(Some(Header::End { cancelled: true }));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Read the rest of a block; false on timeout.
    fn read_block(&mut self, size: usize) -> Result<bool, XmodemError> {
        let len = size + 3 + usize::from(self.crc);
        self.buf.clear();
        self.buf.reserve(len);
        for _ in 0..len {
            match self.read(self.config.read_timeout)? {
                Some(b) => self.buf.push(b),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn block_is_valid(&self, size: usize) -> bool {
        let number = self.buf[0];
        if number != !self.buf[1] {
            return false;
        }
        if number != self.expected && number != self.expected.wrapping_sub(1) {
            return false;
        }
        let data = &self.buf[2..2 + size];
        if self.crc {
            let sent = u16::from_be_bytes([self.buf[2 + size], self.buf[3 + size]]);
            crc16_ccitt(data) == sent
        } else {
            checksum(data) == self.buf[2 + size]
        }
    }

    fn read(&mut self, timeout: Duration) -> Result<Option<u8>, XmodemError> {
        self.link.read_byte(timeout).map_err(XmodemError::Link)
    }

    fn send(&mut self, byte: u8) -> Result<(), XmodemError> {
        self.link.write_all(&[byte]).map_err(XmodemError::Link)?;
        self.link.flush().map_err(XmodemError::Link)
    }

    /// Discard input until the line goes quiet.
    fn flush_input(&mut self) {
        let timeout = self.config.read_timeout * 3 / 2;
        while let Ok(Some(_)) = self.link.read_byte(timeout) {}
    }

    /// Tell the sender to stop.
    fn abort(&mut self) -> Result<(), XmodemError> {
        self.flush_input();
        for _ in 0..3 {
            self.send(CAN)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Header {
    Block(usize),
    End { cancelled: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_reference_value() {
        // CRC-16/XMODEM check value
        assert_eq!(crc16_ccitt(b"123456789"), 0x31C3);
        assert_eq!(crc16_ccitt(&[]), 0);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xff, 0x02]), 0x01);
    }
}
