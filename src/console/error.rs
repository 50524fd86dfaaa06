//! Shell error types

/// Shell error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellError {
    /// E01: Unknown command
    UnknownCommand,
    /// E02: Wrong number of arguments
    Usage,
    /// E03: Path outside the storage partition or malformed
    InvalidPath,
    /// E04: Filesystem operation failed
    Io,
    /// E05: Upload did not complete
    TransferFailed,
    /// E06: Clip could not be played
    Playback,
    /// E07: Argument has the wrong format
    InvalidValue,
    /// E08: Not available on this target
    Unsupported,
}

impl ShellError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "E01",
            Self::Usage => "E02",
            Self::InvalidPath => "E03",
            Self::Io => "E04",
            Self::TransferFailed => "E05",
            Self::Playback => "E06",
            Self::InvalidValue => "E07",
            Self::Unsupported => "E08",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown command",
            Self::Usage => "wrong number of arguments",
            Self::InvalidPath => "invalid path",
            Self::Io => "I/O error",
            Self::TransferFailed => "transfer failed",
            Self::Playback => "playback failed",
            Self::InvalidValue => "invalid value",
            Self::Unsupported => "unavailable",
        }
    }
}

impl core::fmt::Display for ShellError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ShellError {}
