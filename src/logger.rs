//! Stderr logger behind the `log` facade.
//!
//! The library only emits records; the binary decides whether anything is
//! printed by installing this logger.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct Logger {
    pub severity: Level,
    pub enable_colors: bool,
}

impl Logger {
    pub fn new(severity: Level, enable_colors: bool) -> Self {
        Logger {
            severity,
            enable_colors,
        }
    }

    fn get_color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[36m",
            Level::Debug => "\x1b[35m",
            Level::Trace => "\x1b[37m",
        }
    }

    /// Severity from `GITWIKI_LOG`, then `RUST_LOG`, else `default`.
    pub fn severity_from_env(default: Level) -> Level {
        std::env::var("GITWIKI_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .and_then(|value| value.parse::<Level>().ok())
            .unwrap_or(default)
    }

    /// Install the logger for the process.
    ///
    /// `verbose` raises the default from `warn` to `debug`; an explicit
    /// level in the environment wins either way.
    pub fn init(verbose: bool) -> Result<(), log::SetLoggerError> {
        let default = if verbose { Level::Debug } else { Level::Warn };
        let severity = Self::severity_from_env(default);
        let enable_colors = std::env::var("NO_COLOR").is_err();

        log::set_max_level(LevelFilter::Trace);
        log::set_logger(Box::leak(Box::new(Logger::new(severity, enable_colors))))
    }

    fn format(&self, record: &Record) -> String {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let level = record.level().as_str();
        let args = record.args();
        if self.enable_colors {
            let color = Self::get_color(record.level());
            format!("{color}[{timestamp}] {level}\x1b[0m {args}\n")
        } else {
            format!("[{timestamp}] {level} {args}\n")
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.severity
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = std::io::stderr().write_all(self.format(record).as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_respects_severity() {
        let logger = Logger::new(Level::Info, false);
        let info = Metadata::builder().level(Level::Info).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(logger.enabled(&info));
        assert!(!logger.enabled(&debug));
    }

    #[test]
    fn test_plain_format() {
        let logger = Logger::new(Level::Info, false);
        let line = logger.format(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("page moved"))
                .build(),
        );
        assert!(line.ends_with("] WARN page moved\n"));
        assert!(!line.contains('\x1b'));
    }
}
