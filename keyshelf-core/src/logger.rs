use std::sync::{Arc, OnceLock};

/// Receiver for log records emitted by this crate.
///
/// Host applications implement this trait to route storage diagnostics into
/// their own logging. Records never contain stored values.
///
/// # Examples
///
/// ```rust
/// use keyshelf_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class KeyshelfLogBridge: Keyshelf.Logger {
///     func log(level: Keyshelf.LogLevel, message: String) {
///         os_log("%{public}@", message)
///     }
/// }
///
/// Keyshelf.setLogger(logger: KeyshelfLogBridge()) // once, at launch
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Probe and migration steps.
    Debug,
    /// Informational messages.
    Info,
    /// Recoverable anomalies, such as undecodable values or scope resets.
    Warn,
    /// Failures.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Bridges the `log` facade to the foreign [`Logger`].
struct ForeignLogger;

/// Debug and trace records from other crates are dropped.
fn forwarded(level: log::Level, module_path: Option<&str>) -> bool {
    let from_keyshelf = module_path.is_some_and(|path| path.starts_with("keyshelf"));
    from_keyshelf || level <= log::Level::Info
}

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !forwarded(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the foreign logger. Only the first call has an effect.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(log::Level::Debug, Some("keyshelf_core::store"), true ; "own debug")]
    #[test_case(log::Level::Trace, Some("uniffi_core::ffi"), false ; "foreign trace")]
    #[test_case(log::Level::Debug, None, false ; "unknown debug")]
    #[test_case(log::Level::Warn, Some("uniffi_core::ffi"), true ; "foreign warn")]
    #[test_case(log::Level::Error, None, true ; "unknown error")]
    fn test_forwarding_filter(level: log::Level, module_path: Option<&str>, expected: bool) {
        assert_eq!(forwarded(level, module_path), expected);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }
}
