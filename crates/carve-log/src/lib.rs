//! Leveled diagnostic logging for the `carve` allocator crates.
//!
//! The allocator hot paths call these macros on every allocate and
//! deallocate, so a disabled level must cost no more than one relaxed atomic
//! load. Messages are written to stderr, tagged with their level and the
//! module path of the call site.
//!
//! # Example
//!
//! ```
//! use carve_log::{debug, trace, warn, Level};
//!
//! carve_log::set_level(Level::Debug);
//!
//! let capacity = 4096;
//! debug!("arena created with {capacity} bytes");
//! trace!("suppressed below the debug level");
//! warn!("{} allocations still live", 3);
//! ```
//!
//! # Environment
//!
//! [`init_from_env`] reads the [`ENV_VAR`] variable (`CARVE_LOG`) and applies
//! it when it names a valid level. Unset or unparsable values leave the
//! current level untouched.

use std::fmt::{self, Arguments};
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable consulted by [`init_from_env`].
pub const ENV_VAR: &str = "CARVE_LOG";

/// Severity of a log message. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Unrecoverable failures.
    Error = 0,
    /// Caller misuse and leaked allocations.
    Warn = 1,
    /// Lifecycle milestones.
    Info = 2,
    /// Construction details and allocation failures.
    Debug = 3,
    /// Every allocate and deallocate.
    Trace = 4,
}

impl Level {
    /// All levels from most to least severe.
    pub const ALL: [Level; 5] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// Upper-case name used in the log prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`Level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log level: {:?}", self.input)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring case and surrounding whitespace.
    ///
    /// ```
    /// use carve_log::Level;
    ///
    /// assert_eq!("trace".parse(), Ok(Level::Trace));
    /// assert_eq!(" Warn ".parse(), Ok(Level::Warn));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseLevelError { input: s.to_owned() })
    }
}

/// Level filter shared by every logging call in the process.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the least severe level that is still emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns the current level.
    #[must_use]
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Whether a message at `level` would be emitted.
    #[inline(always)]
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: Logger = Logger::new(Level::Warn);

/// Returns the process-wide logger. The initial level is [`Level::Warn`].
#[inline(always)]
#[must_use]
pub fn logger() -> &'static Logger {
    &LOGGER
}

/// Sets the process-wide level.
pub fn set_level(level: Level) {
    logger().set_level(level);
}

/// Sets the process-wide level from its name.
///
/// # Errors
///
/// Returns [`ParseLevelError`] and leaves the level untouched if `s` does not
/// name a level.
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Applies the level named by `CARVE_LOG`, if any.
///
/// Returns the level that was applied.
pub fn init_from_env() -> Option<Level> {
    let value = std::env::var(ENV_VAR).ok();
    let level = level_from_env_value(value.as_deref())?;
    set_level(level);
    Some(level)
}

fn level_from_env_value(value: Option<&str>) -> Option<Level> {
    value?.parse().ok()
}

/// Whether a message at `level` would currently be emitted.
///
/// Useful to skip building an expensive report that nobody will see.
#[inline(always)]
#[must_use]
pub fn enabled(level: Level) -> bool {
    logger().enabled(level)
}

#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments<'_>) {
    const RESET: &str = "\x1b[0m";

    let color = level.color_code();
    let mut stderr = std::io::stderr().lock();
    // A failed diagnostic write must never take the allocator down with it.
    let _ = writeln!(stderr, "{color}[{level}]{RESET} {target}: {args}");
}

/// Logs at an explicit level.
///
/// ```
/// use carve_log::{log, Level};
///
/// log!(level: Level::Info, "{} regions free", 2);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::enabled(level) {
            $crate::__emit(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_order_by_severity() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
        assert!(Level::Info < Level::Debug);
        assert!(Level::Debug < Level::Trace);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("error".parse(), Ok(Level::Error));
        assert_eq!("WARN".parse(), Ok(Level::Warn));
        assert_eq!("Info".parse(), Ok(Level::Info));
        assert_eq!("debug\n".parse(), Ok(Level::Debug));
        assert_eq!("tRaCe".parse(), Ok(Level::Trace));
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(err.to_string(), "invalid log level: \"verbose\"");
        assert!("".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_display_matches_as_str() {
        for level in Level::ALL {
            assert_eq!(level.to_string(), level.as_str());
            assert_eq!(Level::from_u8(level as u8), level);
        }
    }

    #[test]
    fn test_logger_filters_below_level() {
        let logger = Logger::new(Level::Info);

        assert!(logger.enabled(Level::Error));
        assert!(logger.enabled(Level::Warn));
        assert!(logger.enabled(Level::Info));
        assert!(!logger.enabled(Level::Debug));
        assert!(!logger.enabled(Level::Trace));

        logger.set_level(Level::Trace);
        assert!(logger.enabled(Level::Trace));
        assert_eq!(logger.level(), Level::Trace);

        logger.set_level(Level::Error);
        assert!(!logger.enabled(Level::Warn));
    }

    #[test]
    fn test_env_value_parsing() {
        assert_eq!(level_from_env_value(None), None);
        assert_eq!(level_from_env_value(Some("nonsense")), None);
        assert_eq!(level_from_env_value(Some("debug")), Some(Level::Debug));
    }

    #[test]
    fn test_set_level_from_str_rejects_without_change() {
        // Only this test mutates the global logger.
        set_level(Level::Warn);
        assert!(set_level_from_str("loud").is_err());
        assert_eq!(logger().level(), Level::Warn);

        set_level_from_str("trace").unwrap();
        assert_eq!(logger().level(), Level::Trace);
        trace!("emitted at {}", Level::Trace);

        set_level(Level::Warn);
    }
}
