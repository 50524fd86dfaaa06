//! Interactive shell state machine

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::commands::{execute, find_command, ShellContext, ShellEnv};
use super::{parse_line, LineBuffer, ShellError};
use crate::transport::Transport;

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// How long `run` waits for a byte before polling again.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Shell state machine
pub struct Shell {
    line: LineBuffer,
    /// Escape sequence state
    escape_state: EscapeState,
    /// Swallow the `\n` of a `\r\n` pair.
    after_cr: bool,
    /// Shown in the prompt.
    session: u32,
    cwd: PathBuf,
}

#[derive(Clone, Copy, PartialEq)]
enum EscapeState {
    Normal,
    Escape,  // Got ESC
    Bracket, // Got ESC [
}

impl Shell {
    pub fn new(session: u32, cwd: PathBuf) -> Self {
        Self {
            line: LineBuffer::new(),
            escape_state: EscapeState::Normal,
            after_cr: false,
            session,
            cwd,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Serve `link` until it fails.
    pub fn run(&mut self, link: &mut dyn Transport, env: &ShellEnv) -> io::Result<()> {
        self.print_banner(link);
        loop {
            if let Some(byte) = link.read_byte(IDLE_POLL)? {
                self.process_byte(byte, link, env);
            }
        }
    }

    /// Process a single input byte
    ///
    /// Returns Some(result) if a command ran, None if more input needed.
    pub fn process_byte(
        &mut self,
        byte: u8,
        link: &mut dyn Transport,
        env: &ShellEnv,
    ) -> Option<Result<(), ShellError>> {
        let after_cr = std::mem::replace(&mut self.after_cr, byte == b'\r');
        match self.escape_state {
            EscapeState::Normal => {
                if byte == b'\n' && after_cr {
                    return None;
                }
                self.process_normal(byte, link, env)
            }
            EscapeState::Escape => {
                if byte == b'[' {
                    self.escape_state = EscapeState::Bracket;
                } else {
                    self.escape_state = EscapeState::Normal;
                }
                None
            }
            EscapeState::Bracket => {
                // Cursor keys and the like are ignored once complete
                if (0x40..=0x7E).contains(&byte) {
                    self.escape_state = EscapeState::Normal;
                }
                None
            }
        }
    }

    fn process_normal(
        &mut self,
        byte: u8,
        link: &mut dyn Transport,
        env: &ShellEnv,
    ) -> Option<Result<(), ShellError>> {
        match byte {
            // Enter
            b'\r' | b'\n' => {
                let _ = write!(link, "\r\n");
                if self.line.is_empty() {
                    self.print_prompt(link);
                    return None;
                }

                let cmd = parse_line(self.line.as_str());
                let mut ctx = ShellContext {
                    link: &mut *link,
                    env,
                    cwd: &mut self.cwd,
                };
                let result = execute(&cmd, &mut ctx);
                if let Err(e) = result {
                    report_error(link, cmd.command, e);
                }
                self.line.clear();
                self.print_prompt(link);
                Some(result)
            }

            // Backspace
            0x7F | 0x08 => {
                if self.line.backspace() {
                    // Echo: backspace, space, backspace
                    let _ = write!(link, "\x08 \x08");
                }
                None
            }

            // Escape
            0x1B => {
                self.escape_state = EscapeState::Escape;
                None
            }

            // Ctrl+C
            0x03 => {
                let _ = write!(link, "^C\r\n");
                self.line.clear();
                self.print_prompt(link);
                None
            }

            // Ctrl+U (clear line)
            0x15 => {
                for _ in 0..self.line.len() {
                    let _ = write!(link, "\x08 \x08");
                }
                self.line.clear();
                None
            }

            // Printable character
            0x20..=0x7E => {
                if self.line.push(byte) {
                    let _ = link.write_all(&[byte]);
                }
                None
            }

            _ => None,
        }
    }

    /// Print the prompt
    pub fn print_prompt<W: Write + ?Sized>(&self, out: &mut W) {
        let _ = write!(out, "{}@sipkip > ", self.session);
        let _ = out.flush();
    }

    /// Print welcome banner
    pub fn print_banner<W: Write + ?Sized>(&self, out: &mut W) {
        let _ = write!(out, "\r\n{}\r\n", VERSION);
        let _ = write!(out, "Type 'help' for commands.\r\n");
        self.print_prompt(out);
    }
}

/// `Command <name> error: <msg>!`, plus the usage line when the argument
/// count was wrong.
fn report_error<W: Write + ?Sized>(out: &mut W, name: &str, e: ShellError) {
    let _ = write!(out, "Command {} error: {}!\r\n", name, e);
    if e == ShellError::Usage {
        if let Some(c) = find_command(name) {
            let _ = write!(out, "Usage: {} {}\r\n", c.name, c.usage);
        }
    }
}
