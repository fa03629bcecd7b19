//! Lectern Logging
//!
//! Leveled logging for the Lectern template engines, controlled through
//! `LECTERN_*` environment variables.
//!
//! # Usage
//!
//! ```rust
//! use lectern_log::{debug, info, warn};
//!
//! debug!("Initializing engine {}", "njk");
//! info!("Compiled {} templates", 12);
//! warn!(target: "lectern::custom", "No compile callback for {}", "txt");
//! ```
//!
//! # Environment Variables
//!
//! - `LECTERN_DEBUG=1` - Enable debug logging
//! - `LECTERN_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `LECTERN_LOG_FORMAT=pretty|json|compact` - Output format (default `json`)
//! - `LECTERN_LOG_COLOR=1|0` - Enable/disable colors
//! - `LECTERN_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `LECTERN_LOG_MODULE=1|0` - Include the log target

use once_cell::sync::Lazy;
use std::fmt;
use std::io::{IsTerminal, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels and formats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Nothing is logged
    Off = 5,
}

const LEVELS: [Level; 6] = [
    Level::Trace,
    Level::Debug,
    Level::Info,
    Level::Warn,
    Level::Error,
    Level::Off,
];

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    #[cfg(feature = "color")]
    fn paint(self) -> colored::ColoredString {
        use colored::Colorize;
        let label = self.as_str();
        match self {
            Level::Trace => label.dimmed(),
            Level::Debug => label.cyan(),
            Level::Info => label.green(),
            Level::Warn => label.yellow().bold(),
            Level::Error | Level::Off => label.red().bold(),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("warning") {
            return Ok(Level::Warn);
        }
        if wanted.eq_ignore_ascii_case("none") {
            return Ok(Level::Off);
        }
        LEVELS
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown log level \"{}\"", s))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Timestamp, padded level, target and message
    Pretty,
    /// Short time and a one-letter level
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format \"{}\"", other)),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub color: bool,
    pub timestamps: bool,
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok());
        if std::env::var_os("LECTERN_LOG_COLOR").is_none() {
            config.color = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        }
        config
    }

    /// Build a configuration from any variable source. Unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| {
            lookup(name).map(|value| matches!(value.trim(), "1") || value.trim().eq_ignore_ascii_case("true"))
        };
        let defaults = Self::default();

        let debug = flag("LECTERN_DEBUG").unwrap_or(defaults.debug);
        let level = lookup("LECTERN_LOG_LEVEL")
            .and_then(|value| value.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        Self {
            debug,
            level,
            format: lookup("LECTERN_LOG_FORMAT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.format),
            color: flag("LECTERN_LOG_COLOR").unwrap_or(defaults.color),
            timestamps: flag("LECTERN_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
            module_path: flag("LECTERN_LOG_MODULE").unwrap_or(defaults.module_path),
        }
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(|| {
    let config = LogConfig::from_env();
    DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
    MIN_LEVEL.store(config.level as u8, Ordering::SeqCst);
    config
});

/// Read the environment now instead of on the first log line.
pub fn init() {
    Lazy::force(&CONFIG);
}

pub fn config() -> &'static LogConfig {
    &CONFIG
}

pub fn current_level() -> Level {
    init();
    let raw = MIN_LEVEL.load(Ordering::Relaxed) as usize;
    LEVELS.get(raw).copied().unwrap_or(Level::Off)
}

pub fn set_level(level: Level) {
    init();
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Turning debug mode on lowers the minimum level to `Debug`.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Whether a message at `level` would be written.
pub fn is_level_enabled(level: Level) -> bool {
    if level == Level::Off {
        return false;
    }
    level >= current_level() || (level == Level::Debug && is_debug_enabled())
}

// ============================================================================
// Records
// ============================================================================

/// One log line before it is written.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub level: Level,
    pub target: &'a str,
    pub message: &'a str,
}

impl Record<'_> {
    /// The line as it would be written, without a trailing newline.
    pub fn render(&self, config: &LogConfig) -> String {
        match config.format {
            Format::Pretty => self.pretty(config),
            Format::Compact => self.compact(config),
            Format::Json => self.json(config),
        }
    }

    fn pretty(&self, config: &LogConfig) -> String {
        let mut line = String::new();
        if config.timestamps {
            line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
        }

        #[cfg(feature = "color")]
        let level = if config.color {
            format!("{:<5}", self.level.paint())
        } else {
            format!("{:<5}", self.level.as_str())
        };
        #[cfg(not(feature = "color"))]
        let level = format!("{:<5}", self.level.as_str());
        line.push_str(&level);
        line.push(' ');

        if config.module_path && !self.target.is_empty() {
            line.push_str(&format!("[{}] ", self.target));
        }
        line.push_str(self.message);
        line
    }

    fn compact(&self, config: &LogConfig) -> String {
        let mut parts = Vec::with_capacity(4);
        if config.timestamps {
            parts.push(chrono::Local::now().format("%H:%M:%S").to_string());
        }
        parts.push(self.level.as_str()[..1].to_string());
        if config.module_path && !self.target.is_empty() {
            parts.push(format!("{}:", self.target));
        }
        parts.push(self.message.to_string());
        parts.join(" ")
    }

    #[cfg(feature = "json")]
    fn json(&self, config: &LogConfig) -> String {
        let mut object = serde_json::Map::new();
        if config.timestamps {
            object.insert("timestamp".into(), chrono::Utc::now().to_rfc3339().into());
        }
        object.insert("level".into(), self.level.as_str().into());
        if config.module_path {
            object.insert("target".into(), self.target.into());
        }
        object.insert("message".into(), self.message.into());
        serde_json::Value::Object(object).to_string()
    }

    /// JSON lines need the `json` feature; without it they fall back to pretty.
    #[cfg(not(feature = "json"))]
    fn json(&self, config: &LogConfig) -> String {
        self.pretty(config)
    }
}

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }
    let line = Record { level, target, message }.render(config());
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __lectern_log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::__lectern_log!($level, target: module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__lectern_log!($crate::Level::Trace, $($arg)+) };
}

/// Log at debug level. Enabled by `LECTERN_DEBUG=1` or `LECTERN_LOG_LEVEL=debug`.
///
/// ```rust
/// use lectern_log::debug;
///
/// let engine = "njk";
/// debug!("Engine ({}) Init", engine);
/// debug!(target: "lectern::custom", "keys: {:?}", ["data"]);
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__lectern_log!($crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__lectern_log!($crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__lectern_log!($crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__lectern_log!($crate::Level::Error, $($arg)+) };
}

// ============================================================================
// Tracing integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! A `tracing` subscriber that follows the `LECTERN_*` configuration.

    use super::{Level, config};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    pub fn subscriber() -> impl tracing::Subscriber + Send + Sync {
        let config = config();
        let directive = match config.level {
            Level::Off => "off".to_string(),
            level => level.as_str().to_ascii_lowercase(),
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_ansi(config.color)
                .with_target(config.module_path),
        )
    }
}
