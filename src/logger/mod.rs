//! Named loggers sharing one process-wide threshold.
//!
//! Each subsystem keeps a [`Logger`] in a `LazyLock` static. A message is
//! first offered to the process-wide forwarder installed with
//! [`set_user_log_handler`], then to the logger's own sink, which by default
//! writes a timestamped line to stdout (stderr for warnings and errors).
//! The forwarder also covers loggers created after it was installed, so an
//! application can route registry events into its own logs at startup.

use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{
    Arc, LazyLock, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

type Sink = Arc<dyn Fn(&Logger, LogLevel, &str) + Send + Sync + 'static>;

static THRESHOLD: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static LOGGERS: LazyLock<Mutex<Vec<Weak<LoggerState>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));
static FORWARDER: RwLock<Option<Sink>> = RwLock::new(None);

#[derive(Clone)]
pub struct Logger {
    state: Arc<LoggerState>,
}

struct LoggerState {
    name: String,
    threshold: AtomicU8,
    sink: RwLock<Sink>,
}

impl Logger {
    /// Creates a logger that starts at the current process-wide threshold.
    pub fn new(name: impl Into<String>) -> Self {
        let state = Arc::new(LoggerState {
            name: name.into(),
            threshold: AtomicU8::new(THRESHOLD.load(Ordering::SeqCst)),
            sink: RwLock::new(stdio_sink()),
        });

        let mut loggers = live_loggers();
        loggers.retain(|logger| logger.strong_count() > 0);
        loggers.push(Arc::downgrade(&state));
        drop(loggers);

        Self { state }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_repr(self.state.threshold.load(Ordering::SeqCst))
    }

    pub fn set_log_level<L>(&self, level: L) -> Result<(), LogError>
    where
        L: IntoLogLevel,
    {
        let level = level.into_log_level()?;
        self.state.threshold.store(level as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Replaces the sink that receives this logger's messages.
    ///
    /// The sink sees every message and does its own threshold filtering.
    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&Logger, LogLevel, &str) + Send + Sync + 'static,
    {
        *write(&self.state.sink) = Arc::new(handler);
    }

    pub fn reset_log_handler(&self) {
        *write(&self.state.sink) = stdio_sink();
    }

    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        if level == LogLevel::Silent {
            return;
        }
        let message = message.to_string();

        let forwarder = read(&FORWARDER).clone();
        if let Some(forward) = forwarder {
            forward(self, level, &message);
        }
        let sink = read(&self.state.sink).clone();
        sink(self, level, &message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("log_level", &self.log_level())
            .finish()
    }
}

fn stdio_sink() -> Sink {
    Arc::new(write_to_stdio)
}

fn write_to_stdio(logger: &Logger, level: LogLevel, message: &str) {
    if level < logger.log_level() {
        return;
    }
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    if level >= LogLevel::Warn {
        eprintln!("[{stamp}] {level} {}: {message}", logger.name());
    } else {
        println!("[{stamp}] {level} {}: {message}", logger.name());
    }
}

fn live_loggers() -> MutexGuard<'static, Vec<Weak<LoggerState>>> {
    LOGGERS.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poison| poison.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poison| poison.into_inner())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Silent = 5,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Silent => "SILENT",
        }
    }

    fn from_repr(repr: u8) -> Self {
        [
            LogLevel::Debug,
            LogLevel::Verbose,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ]
        .get(usize::from(repr))
        .copied()
        .unwrap_or(LogLevel::Silent)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "verbose" => LogLevel::Verbose,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "silent" | "off" => LogLevel::Silent,
            _ => return Err(LogError::InvalidLogLevel(s.to_string())),
        };
        Ok(level)
    }
}

/// Anything a threshold can be set from: a [`LogLevel`] or its name.
pub trait IntoLogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError>;
}

impl IntoLogLevel for LogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        Ok(self)
    }
}

impl IntoLogLevel for &str {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        self.parse()
    }
}

impl IntoLogLevel for String {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        self.parse()
    }
}

/// Options for [`set_user_log_handler`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Minimum level forwarded. `None` follows each logger's own threshold.
    pub level: Option<LogLevel>,
}

/// One forwarded log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCallbackParams {
    pub level: LogLevel,
    pub message: String,
    pub logger_name: String,
}

pub type LogCallback = Arc<dyn Fn(LogCallbackParams) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => write!(f, "Unknown log level '{level}'"),
        }
    }
}

impl std::error::Error for LogError {}

/// Sets the threshold of every existing logger and of loggers created later.
pub fn set_log_level<L>(level: L) -> Result<(), LogError>
where
    L: IntoLogLevel,
{
    let level = level.into_log_level()?;
    THRESHOLD.store(level as u8, Ordering::SeqCst);
    for state in live_loggers().iter().filter_map(Weak::upgrade) {
        state.threshold.store(level as u8, Ordering::SeqCst);
    }
    Ok(())
}

/// Installs the process-wide forwarder, or removes it when `callback` is `None`.
pub fn set_user_log_handler(callback: Option<LogCallback>, options: Option<LogOptions>) {
    let floor = options.and_then(|options| options.level);
    let forwarder = callback.map(|callback| {
        Arc::new(move |logger: &Logger, level: LogLevel, message: &str| {
            if level < floor.unwrap_or_else(|| logger.log_level()) {
                return;
            }
            callback(LogCallbackParams {
                level,
                message: message.to_owned(),
                logger_name: logger.name().to_owned(),
            });
        }) as Sink
    });
    *write(&FORWARDER) = forwarder;
}

pub fn set_user_log_handler_fn<F>(callback: Option<F>, options: Option<LogOptions>)
where
    F: Fn(LogCallbackParams) + Send + Sync + 'static,
{
    set_user_log_handler(callback.map(|cb| Arc::new(cb) as LogCallback), options);
}

#[cfg(test)]
pub(crate) static TEST_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
