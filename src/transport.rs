//! Byte transport behind the shell and the upload receiver.

use std::io;
use std::time::Duration;

/// Bidirectional byte link with timed reads.
pub trait Transport: io::Write {
    /// Next byte, or `None` once `timeout` passes without data.
    ///
    /// An error means the link is gone.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).read_byte(timeout)
    }
}
