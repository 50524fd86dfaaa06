//! Command line parser
//!
//! Split on whitespace; tokens past [`MAX_ARGS`] are reported as overflow so
//! the dispatcher can reject the line instead of silently dropping them.

/// Arguments kept after the command name.
pub const MAX_ARGS: usize = 15;

/// Parsed command with up to [`MAX_ARGS`] arguments
#[derive(Debug, Clone)]
pub struct ParsedCommand<'a> {
    /// The command name (first token)
    pub command: &'a str,
    pub args: [Option<&'a str>; MAX_ARGS],
    /// Number of arguments, including any beyond `MAX_ARGS`
    argc: usize,
}

impl<'a> ParsedCommand<'a> {
    /// Create empty command
    pub const fn empty() -> Self {
        Self {
            command: "",
            args: [None; MAX_ARGS],
            argc: 0,
        }
    }

    /// Get argument by index (0-based)
    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }

    /// Argument count, not counting the command name.
    pub fn arg_count(&self) -> usize {
        self.argc
    }

    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

/// Parse a command line into command and arguments
pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let mut parts = line.split_whitespace();

    let command = parts.next().unwrap_or("");

    let mut args = [None; MAX_ARGS];
    let mut argc = 0;
    for arg in parts {
        if let Some(slot) = args.get_mut(argc) {
            *slot = Some(arg);
        }
        argc += 1;
    }

    ParsedCommand { command, args, argc }
}
