//! Console logging that cooperates with the batch progress bar

use indicatif::MultiProgress;

/// Padded label and ANSI color for a log level.
fn level_label(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    }
}

/// Format a record line, with color only for terminals.
fn format_line(level: log::Level, args: &std::fmt::Arguments<'_>, color: bool) -> String {
    let (label, ansi) = level_label(level);
    if color {
        format!("[{ansi}{label}\x1b[0m] {args}")
    } else {
        format!("[{label}] {args}")
    }
}

/// Logger that prints through indicatif MultiProgress so lines never tear the bar.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.matches(record) {
            let line = format_line(record.level(), record.args(), true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging.
///
/// Default level is `info` (`debug` with `--debug`); `RUST_LOG` overrides.
/// With a `MultiProgress` (TTY) lines go through the bar, otherwise plain
/// uncolored lines go to stderr.
pub fn init_logging(debug: bool, multi: Option<&MultiProgress>) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    let default_level = if debug { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_level);

    match multi {
        Some(multi) => {
            let logger = env_logger::Builder::from_env(env).build();
            let max_level = logger.filter();
            log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))?;
            log::set_max_level(max_level);
            Ok(())
        }
        None => env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(buf, "{}", format_line(record.level(), record.args(), false))
            })
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_has_no_escape_codes() {
        let line = format_line(log::Level::Warn, &format_args!("batch {} failed", 3), false);
        assert_eq!(line, "[WARN ] batch 3 failed");
    }

    #[test]
    fn colored_line_wraps_label() {
        let line = format_line(log::Level::Error, &format_args!("x"), true);
        assert!(line.starts_with("[\x1b[31mERROR\x1b[0m]"));
        assert!(line.ends_with(" x"));
    }

    #[test]
    fn labels_are_padded_to_five() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(level_label(level).0.len(), 5);
        }
    }
}
