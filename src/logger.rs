//! Structured terminal logging with box-drawing output.
//!
//! tiltr writes its operational log as a continuous "pipe" of lines so a daemon
//! session reads top to bottom as one framed block:
//!
//! ```text
//! ┏ tiltr v0.4.0 ━━╸
//! ┃
//! ┣ Loaded schedule (default DARK)
//! ┃   wednesday: 2 blocks
//! ┣[INFO] Moving to position 35 (ECO, scheduled)
//! ╹
//! ```
//!
//! Conventions:
//!
//! - `log_block_start!` opens a new conceptual block (adds a spacer pipe first).
//! - `log_decorated!` continues the current block.
//! - `log_indented!` nests details under the previous line.
//! - `log_pipe!` inserts a spacer before a levelled message.
//! - `log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`
//!   carry a coloured `[LEVEL]` tag.
//! - `log_version!` and `log_end!` frame the whole session.
//!
//! Output can be silenced globally (tests, `status --quiet`) and can be routed
//! to a file from a background writer thread while simulating.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Schedule timezone used for the simulated clock prefix.
static SCHEDULE_TIMEZONE: OnceLock<Option<chrono_tz::Tz>> = OnceLock::new();

static LOG_CHANNEL: OnceLock<Sender<FileMessage>> = OnceLock::new();

enum FileMessage {
    Line(String),
    Shutdown,
}

/// Shape of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Block,
    Decorated,
    Indented,
    Info,
    Debug,
    Warning,
    Error,
    ErrorExit,
    Critical,
}

impl Line {
    fn render(self, prefix: &str, message: &str) -> String {
        match self {
            Line::Block => format!("{prefix}┃\n{prefix}┣ {message}\n"),
            Line::Decorated => format!("{prefix}┣ {message}\n"),
            Line::Indented => format!("{prefix}┃   {message}\n"),
            Line::Info => format!("{prefix}┣[\x1b[32mINFO\x1b[0m] {message}\n"),
            Line::Debug => format!("{prefix}┣[\x1b[36mDEBUG\x1b[0m] {message}\n"),
            Line::Warning => format!("{prefix}┣[\x1b[33mWARNING\x1b[0m] {message}\n"),
            Line::Error => format!("{prefix}┣[\x1b[31mERROR\x1b[0m] {message}\n"),
            Line::ErrorExit => format!("{prefix}┃\n{prefix}┗[\x1b[31mERROR\x1b[0m] {message}\n"),
            Line::Critical => format!("{prefix}┣[\x1b[31mCRITICAL\x1b[0m] {message}\n"),
        }
    }
}

/// Global switches for the logger.
pub struct Log;

impl Log {
    /// Enable or disable all output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Record the schedule timezone so simulated timestamps show schedule-local time.
    pub fn set_schedule_timezone(tz: Option<chrono_tz::Tz>) {
        let _ = SCHEDULE_TIMEZONE.set(tz);
    }

    /// Route all further output into `path`, stripped of colour codes.
    ///
    /// The returned guard flushes and joins the writer thread on drop.
    pub fn start_file_logging(path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();
        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("File logging already started"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&path)?;
            while let Ok(FileMessage::Line(text)) = rx.recv() {
                file.write_all(text.as_bytes())?;
            }
            file.flush()?;
            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// `[HH:MM:SS] ` while running on a simulated clock, empty otherwise.
    pub fn timestamp_prefix() -> String {
        if !(crate::time::source::is_initialized() && crate::time::source::is_simulated()) {
            return String::new();
        }
        let now = crate::time::source::now();
        match SCHEDULE_TIMEZONE.get().copied().flatten() {
            Some(tz) => format!("[{}] ", now.with_timezone(&tz).format("%a %H:%M:%S")),
            None => format!("[{}] ", now.format("%a %H:%M:%S")),
        }
    }
}

/// Keeps the file writer alive; dropping it flushes the log file.
pub struct LoggerGuard {
    tx: Sender<FileMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(FileMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            for skipped in chars.by_ref() {
                if skipped == 'm' {
                    break;
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Write already-rendered text to the active sink.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(FileMessage::Line(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Render and write one line. Used by the logging macros.
pub fn emit(line: Line, message: &str) {
    let prefix = Log::timestamp_prefix();
    write_output(&line.render(&prefix, message));
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_text {
    ($fmt:literal $($arg:tt)*) => {
        format!($fmt $($arg)*)
    };
    ($expr:expr) => {
        ($expr).to_string()
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($line:ident, $($arg:tt)+) => {{
        if $crate::logger::Log::is_enabled() {
            let message = $crate::__log_text!($($arg)+);
            $crate::logger::emit($crate::logger::Line::$line, &message);
        }
    }};
}

/// Open a new block: spacer pipe, then `┣ message`.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => { $crate::__log_line!(Block, $($arg)+) };
}

/// `┣ message`, continuing the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => { $crate::__log_line!(Decorated, $($arg)+) };
}

/// `┃   message`, a detail line under the previous entry.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => { $crate::__log_line!(Indented, $($arg)+) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { $crate::__log_line!(Info, $($arg)+) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => { $crate::__log_line!(Debug, $($arg)+) };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => { $crate::__log_line!(Warning, $($arg)+) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { $crate::__log_line!(Error, $($arg)+) };
}

/// Error that terminates the current flow: `┗[ERROR] message`.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => { $crate::__log_line!(ErrorExit, $($arg)+) };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => { $crate::__log_line!(Critical, $($arg)+) };
}

/// Empty spacer line `┃`.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let prefix = $crate::logger::Log::timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}┃\n"));
        }
    }};
}

/// Session header `┏ tiltr vX.Y.Z ━━╸`.
#[macro_export]
macro_rules! log_version {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let prefix = $crate::logger::Log::timestamp_prefix();
            let version = env!("CARGO_PKG_VERSION");
            $crate::logger::write_output(&format!("{prefix}┏ tiltr v{version} ━━╸\n"));
        }
    }};
}

/// Session terminator `╹`.
#[macro_export]
macro_rules! log_end {
    () => {{
        if $crate::logger::Log::is_enabled() {
            let prefix = $crate::logger::Log::timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}╹\n"));
        }
    }};
}
