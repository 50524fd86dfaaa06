//! Command handlers

use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::parser::ParsedCommand;
use super::ShellError;
use crate::audio::{AudioStream, PlaybackError, StreamPlayer};
use crate::config::Storage;
use crate::fault::FaultState;
use crate::input::ScanStats;
use crate::logging::{self, LogLevel};
use crate::storage;
use crate::transport::Transport;
use crate::xmodem::{self, XmodemConfig};

/// Long-lived state the commands act on.
pub struct ShellEnv {
    pub player: Arc<dyn StreamPlayer>,
    pub storage: Storage,
    pub faults: Arc<FaultState>,
    /// Absent until the scanner is running.
    pub scan_stats: Option<Arc<ScanStats>>,
    pub xmodem: XmodemConfig,
}

/// Everything a handler may touch for one command.
pub struct ShellContext<'a> {
    /// Output goes here; `rx` also runs the transfer over it.
    pub link: &'a mut dyn Transport,
    pub env: &'a ShellEnv,
    pub cwd: &'a mut PathBuf,
}

impl ShellContext<'_> {
    /// Resolve a path argument against the working directory.
    pub fn resolve(&self, arg: &str) -> PathBuf {
        resolve_path(self.cwd, arg)
    }
}

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    /// Argument synopsis shown after the name.
    pub usage: &'static str,
    pub brief: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub handler: fn(&ParsedCommand<'_>, &mut ShellContext<'_>) -> Result<(), ShellError>,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", usage: "[command]", brief: "List commands or show usage", min_args: 0, max_args: 1, handler: cmd_help },
    CommandDescriptor { name: "ls", usage: "[name]", brief: "List a directory", min_args: 0, max_args: 1, handler: cmd_ls },
    CommandDescriptor { name: "pwd", usage: "", brief: "Print working directory", min_args: 0, max_args: 0, handler: cmd_pwd },
    CommandDescriptor { name: "cwd", usage: "<dir>", brief: "Change working directory", min_args: 1, max_args: 1, handler: cmd_cwd },
    CommandDescriptor { name: "mkdir", usage: "<dir>", brief: "Create a directory", min_args: 1, max_args: 1, handler: cmd_mkdir },
    CommandDescriptor { name: "rmdir", usage: "<dir>", brief: "Remove an empty directory", min_args: 1, max_args: 1, handler: cmd_rmdir },
    CommandDescriptor { name: "rm", usage: "<file>", brief: "Remove a file", min_args: 1, max_args: 1, handler: cmd_rm },
    CommandDescriptor { name: "mv", usage: "<from> <to>", brief: "Move or rename", min_args: 2, max_args: 2, handler: cmd_mv },
    CommandDescriptor { name: "cp", usage: "<from> <to>", brief: "Copy a file", min_args: 2, max_args: 2, handler: cmd_cp },
    CommandDescriptor { name: "speak", usage: "<clip> <packets>", brief: "Play a stored clip", min_args: 2, max_args: 2, handler: cmd_speak },
    CommandDescriptor { name: "stop", usage: "", brief: "Stop the current clip", min_args: 0, max_args: 0, handler: cmd_stop },
    CommandDescriptor { name: "rx", usage: "<file>", brief: "Receive a file over XMODEM", min_args: 1, max_args: 1, handler: cmd_rx },
    CommandDescriptor { name: "du", usage: "", brief: "Storage usage", min_args: 0, max_args: 0, handler: cmd_du },
    CommandDescriptor { name: "stats", usage: "", brief: "Fault and playback counters", min_args: 0, max_args: 0, handler: cmd_stats },
    CommandDescriptor { name: "loglevel", usage: "[error|warn|info|debug|trace]", brief: "Show or set log verbosity", min_args: 0, max_args: 1, handler: cmd_loglevel },
];

/// Look up a command by name
pub fn find_command(name: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Execute a parsed command
pub fn execute(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    if cmd.is_empty() {
        return Ok(()); // Empty line, do nothing
    }

    let descriptor = find_command(cmd.command).ok_or(ShellError::UnknownCommand)?;
    let argc = cmd.arg_count();
    if argc < descriptor.min_args || argc > descriptor.max_args {
        return Err(ShellError::Usage);
    }

    (descriptor.handler)(cmd, ctx)
}

/// Lexically normalise `arg` against `cwd`. `..` above the root stays at
/// the root; nothing is looked up on the filesystem.
pub fn resolve_path(cwd: &Path, arg: &str) -> PathBuf {
    let mut out = cwd.to_path_buf();
    for component in Path::new(arg).components() {
        match component {
            Component::RootDir => out = PathBuf::from("/"),
            Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Print the failing path and the OS error, then report `Io`.
fn io_failure(ctx: &mut ShellContext<'_>, what: &str, path: &Path, e: io::Error) -> ShellError {
    let _ = write!(ctx.link, "{} {} failed: {}\r\n", what, path.display(), e);
    ShellError::Io
}

// --- Command Implementations ---

fn cmd_help(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    if let Some(name) = cmd.arg(0) {
        let c = find_command(name).ok_or(ShellError::UnknownCommand)?;
        let _ = write!(ctx.link, "Usage: {} {}\r\n", c.name, c.usage);
        let _ = write!(ctx.link, "\t{}\r\n", c.brief);
    } else {
        let _ = write!(ctx.link, "Available commands:\r\n");
        for c in COMMANDS {
            let _ = write!(ctx.link, "  {:<10} {}\r\n", c.name, c.brief);
        }
        let _ = write!(ctx.link, "Type 'help <command>' for usage.\r\n");
    }
    Ok(())
}

fn cmd_ls(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let path = match cmd.arg(0) {
        Some(arg) => ctx.resolve(arg),
        None => ctx.cwd.clone(),
    };

    let meta = fs::metadata(&path).map_err(|e| io_failure(ctx, "stat", &path, e))?;
    if !meta.is_dir() {
        let _ = write!(ctx.link, "{}\r\n", path.display());
        return Ok(());
    }

    let mut entries = fs::read_dir(&path)
        .and_then(|dir| dir.collect::<io::Result<Vec<_>>>())
        .map_err(|e| io_failure(ctx, "list", &path, e))?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let _ = write!(
            ctx.link,
            "{}{}\r\n",
            entry.file_name().to_string_lossy(),
            if is_dir { "/" } else { "" }
        );
    }
    Ok(())
}

fn cmd_pwd(_cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let _ = write!(ctx.link, "{}\r\n", ctx.cwd.display());
    Ok(())
}

fn cmd_cwd(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let path = ctx.resolve(cmd.arg(0).unwrap_or_default());
    match fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => {
            *ctx.cwd = path;
            Ok(())
        }
        Ok(_) => {
            let _ = write!(ctx.link, "{} is not a directory\r\n", path.display());
            Err(ShellError::InvalidPath)
        }
        Err(e) => Err(io_failure(ctx, "open", &path, e)),
    }
}

fn cmd_mkdir(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let path = ctx.resolve(cmd.arg(0).unwrap_or_default());
    crate::log_info!("mkdir {}", path.display());
    fs::create_dir(&path).map_err(|e| io_failure(ctx, "mkdir", &path, e))
}

fn cmd_rmdir(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let path = ctx.resolve(cmd.arg(0).unwrap_or_default());
    crate::log_info!("rmdir {}", path.display());
    fs::remove_dir(&path).map_err(|e| io_failure(ctx, "rmdir", &path, e))
}

fn cmd_rm(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let path = ctx.resolve(cmd.arg(0).unwrap_or_default());
    crate::log_info!("rm {}", path.display());
    fs::remove_file(&path).map_err(|e| io_failure(ctx, "rm", &path, e))
}

fn cmd_mv(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let from = ctx.resolve(cmd.arg(0).unwrap_or_default());
    let to = ctx.resolve(cmd.arg(1).unwrap_or_default());
    crate::log_info!("mv {} {}", from.display(), to.display());
    fs::rename(&from, &to).map_err(|e| io_failure(ctx, "mv", &from, e))
}

fn cmd_cp(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let from = ctx.resolve(cmd.arg(0).unwrap_or_default());
    let to = ctx.resolve(cmd.arg(1).unwrap_or_default());
    crate::log_info!("cp {} {}", from.display(), to.display());
    storage::copy_file(&from, &to)
        .map(|_| ())
        .map_err(|e| io_failure(ctx, "cp", &from, e))
}

fn cmd_speak(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let clip = ctx.resolve(cmd.arg(0).unwrap_or_default());
    let packets = ctx.resolve(cmd.arg(1).unwrap_or_default());

    let stream = AudioStream::open(&clip, &packets).map_err(|e| io_failure(ctx, "open", &clip, e))?;
    crate::log_info!("speak {} ({} frames)", clip.display(), stream.frame_count());

    // Cut off whatever the toy is saying; the new session resets the flag
    ctx.env.player.stop();
    match ctx.env.player.play(stream) {
        Ok(()) => Ok(()),
        Err(PlaybackError::Aborted) => {
            let _ = write!(ctx.link, "stopped\r\n");
            Ok(())
        }
        Err(e) => {
            let _ = write!(ctx.link, "{}\r\n", e);
            Err(ShellError::Playback)
        }
    }
}

fn cmd_stop(_cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    ctx.env.player.stop();
    Ok(())
}

fn cmd_rx(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let path = ctx.resolve(cmd.arg(0).unwrap_or_default());
    let env = ctx.env;
    let base = &env.storage.base_path;
    if path == *base || !path.starts_with(base) {
        let _ = write!(ctx.link, "{} is not below {}/\r\n", path.display(), base.display());
        return Err(ShellError::InvalidPath);
    }

    let file = File::options()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| io_failure(ctx, "create", &path, e))?;
    crate::log_info!("receiving {}", path.display());

    let mut dest = BufWriter::new(file);
    let result = xmodem::receive(&mut *ctx.link, &mut dest, &env.xmodem)
        .and_then(|n| dest.flush().map(|_| n).map_err(xmodem::XmodemError::Store));
    drop(dest);

    match result {
        Ok(n) => {
            let _ = write!(ctx.link, "Received {} ({})\r\n", path.display(), storage::readable_size(n));
            Ok(())
        }
        Err(e) => {
            crate::log_warn!("upload of {} failed: {}", path.display(), e);
            if let Err(rm) = fs::remove_file(&path) {
                crate::log_warn!("cannot remove {}: {}", path.display(), rm);
            }
            let _ = write!(ctx.link, "Failed to receive {}: {}\r\n", path.display(), e);
            Err(ShellError::TransferFailed)
        }
    }
}

fn cmd_du(_cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    match storage::partition_usage(&ctx.env.storage) {
        Ok((used, total)) => {
            let _ = write!(
                ctx.link,
                "Used: {}, total: {}\r\n",
                storage::readable_size(used),
                storage::readable_size(total)
            );
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::Unsupported => Err(ShellError::Unsupported),
        Err(e) => {
            let _ = write!(ctx.link, "{}\r\n", e);
            Err(ShellError::Io)
        }
    }
}

fn cmd_stats(_cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    let fault = ctx.env.faults.snapshot();
    if fault.active {
        let _ = write!(ctx.link, "fault: {} (data {}, count {})\r\n", fault.code.as_str(), fault.data, fault.count);
    } else {
        let _ = write!(ctx.link, "fault: none (count {})\r\n", fault.count);
    }

    let playback = ctx.env.player.stats();
    let _ = write!(
        ctx.link,
        "playback: {} sessions, {} frames, {} aborted, {} failed\r\n",
        playback.sessions, playback.frames, playback.aborts, playback.failures
    );

    if let Some(scan) = &ctx.env.scan_stats {
        let _ = write!(
            ctx.link,
            "scanner: {} cycles, {} callbacks, {} switch edges\r\n",
            scan.cycles.load(Ordering::Relaxed),
            scan.callbacks.load(Ordering::Relaxed),
            scan.switch_edges.load(Ordering::Relaxed)
        );
    }
    Ok(())
}

fn cmd_loglevel(cmd: &ParsedCommand<'_>, ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
    if let Some(name) = cmd.arg(0) {
        let level = LogLevel::parse(name).ok_or(ShellError::InvalidValue)?;
        logging::set_max_level(level);
    }
    let _ = write!(ctx.link, "loglevel={}\r\n", logging::max_level().as_str());
    Ok(())
}
