//! Command shell on the serial bridge.
//!
//! Byte-at-a-time line editing, whitespace-split commands, one handler per
//! command. Runs on its own thread; `speak` and `rx` block it.

pub mod commands;
pub mod error;
pub mod line_buffer;
pub mod parser;
pub mod shell;

pub use commands::{execute, find_command, resolve_path, CommandDescriptor, ShellContext, ShellEnv, COMMANDS};
pub use error::ShellError;
pub use line_buffer::LineBuffer;
pub use parser::{parse_line, ParsedCommand, MAX_ARGS};
pub use shell::Shell;
