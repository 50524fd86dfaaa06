//! Shared test doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use sipkip_firmware::transport::Transport;

/// Link fed from a script. `None` entries read as a timeout, as does an
/// exhausted script; everything written is captured.
#[derive(Default)]
pub struct ScriptedLink {
    pub input: VecDeque<Option<u8>>,
    pub output: Vec<u8>,
}

impl ScriptedLink {
    pub fn new(input: impl IntoIterator<Item = Option<u8>>) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }

    /// Link that delivers `bytes` without gaps.
    pub fn bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().copied().map(Some))
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn take_output(&mut self) -> String {
        let out = self.output_str();
        self.output.clear();
        out
    }
}

impl Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedLink {
    fn read_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front().flatten())
    }
}
