//! Logger installation for the `log` facade.
//!
//! Everything in this crate logs through `log::{trace, debug, info, warn,
//! error}`; [`init`] installs an `env_logger` backend configured from a
//! [`LogConfig`]. The `UTILKIT_LOG` environment variable overrides the
//! configured level using the env_logger filter syntax.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

use env_logger::{Builder, Logger, Target, WriteStyle};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::timeops;
use crate::{Result, UtilsError};

pub const LOG_ENV: &str = "UTILKIT_LOG";

const COLOR_TERMINALS: &[&str] = &[
    "xterm",
    "xterm-color",
    "xterm-256color",
    "screen",
    "linux",
    "cygwin",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    Stderr,
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colored output on terminals known to support it
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub sink: LogSink,
    pub color: ColorMode,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            sink: LogSink::Stderr,
            color: ColorMode::Auto,
        }
    }
}

impl LogConfig {
    /// Load a configuration from a JSON file; missing fields keep their
    /// default value
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(UtilsError::fs("Failed to read log configuration", path))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

fn is_color_terminal(term: Option<&str>) -> bool {
    term.map_or(false, |term| COLOR_TERMINALS.contains(&term))
}

fn write_style(config: &LogConfig) -> WriteStyle {
    if let LogSink::File(_) = config.sink {
        return WriteStyle::Never;
    }

    match config.color {
        ColorMode::Always => WriteStyle::Always,
        ColorMode::Never => WriteStyle::Never,
        ColorMode::Auto => {
            let term = std::env::var("TERM").ok();
            if is_color_terminal(term.as_deref()) {
                WriteStyle::Auto
            } else {
                WriteStyle::Never
            }
        }
    }
}

fn configure(config: &LogConfig, filters: Option<&str>) -> Result<Builder> {
    let mut builder = Builder::new();
    builder.filter_level(config.level);
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }

    builder.format(|buf, record| {
        let level = buf.default_styled_level(record.level());
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            level,
            timeops::time_string(),
            thread::current().name().unwrap_or("unnamed"),
            record.args()
        )
    });

    match &config.sink {
        LogSink::Stderr => {
            builder.target(Target::Stderr);
        }
        LogSink::Stdout => {
            builder.target(Target::Stdout);
        }
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(UtilsError::fs("Failed to open log file", path))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
    }
    builder.write_style(write_style(config));

    Ok(builder)
}

/// Build a logger without installing it
pub fn build_logger(config: &LogConfig) -> Result<Logger> {
    let filters = std::env::var(LOG_ENV).ok();
    Ok(configure(config, filters.as_deref())?.build())
}

/// Install the global logger. Fails if a logger was installed before.
pub fn init(config: &LogConfig) -> Result<()> {
    let logger = build_logger(config)?;
    let max_level = logger.filter();

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Record};
    use tempdir::TempDir;

    #[test]
    fn default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LevelFilter::Info);
        assert_eq!(config.sink, LogSink::Stderr);
        assert_eq!(config.color, ColorMode::Auto);
    }

    #[test]
    fn config_from_file() {
        let dir = TempDir::new("logging").unwrap();
        let path = dir.path().join("log.json");
        fs::write(
            &path,
            r#"{ "level": "DEBUG", "sink": { "file": "/tmp/out.log" } }"#,
        )
        .unwrap();

        let config = LogConfig::from_file(&path).unwrap();
        assert_eq!(config.level, LevelFilter::Debug);
        assert_eq!(config.sink, LogSink::File(PathBuf::from("/tmp/out.log")));
        assert_eq!(config.color, ColorMode::Auto);
    }

    #[test]
    fn invalid_config_file() {
        let dir = TempDir::new("logging").unwrap();
        let path = dir.path().join("log.json");
        fs::write(&path, "{ level: ").unwrap();

        assert!(matches!(
            LogConfig::from_file(&path),
            Err(UtilsError::Parse(_))
        ));
        assert!(matches!(
            LogConfig::from_file(dir.path().join("missing.json")),
            Err(UtilsError::Fs { .. })
        ));
    }

    #[test]
    fn initialize_installs_crate_logger() {
        crate::initialize();
        let expected = build_logger(&LogConfig::default()).unwrap().filter();
        assert_eq!(log::max_level(), expected);
    }

    #[test]
    fn color_terminals() {
        assert!(is_color_terminal(Some("xterm-256color")));
        assert!(is_color_terminal(Some("linux")));
        assert!(!is_color_terminal(Some("dumb")));
        assert!(!is_color_terminal(None));
    }

    #[test]
    fn file_sink_never_uses_color() {
        let config = LogConfig {
            sink: LogSink::File(PathBuf::from("out.log")),
            color: ColorMode::Always,
            ..LogConfig::default()
        };
        assert_eq!(write_style(&config), WriteStyle::Never);

        let config = LogConfig {
            color: ColorMode::Always,
            ..LogConfig::default()
        };
        assert_eq!(write_style(&config), WriteStyle::Always);
    }

    #[test]
    fn level_and_filter_override() {
        let config = LogConfig {
            level: LevelFilter::Warn,
            ..LogConfig::default()
        };

        let logger = configure(&config, None).unwrap().build();
        assert_eq!(logger.filter(), LevelFilter::Warn);

        let logger = configure(&config, Some("trace")).unwrap().build();
        assert_eq!(logger.filter(), LevelFilter::Trace);
    }

    #[test]
    fn file_sink_writes_formatted_records() {
        let dir = TempDir::new("logging").unwrap();
        let path = dir.path().join("out.log");
        let config = LogConfig {
            level: LevelFilter::Debug,
            sink: LogSink::File(path.clone()),
            color: ColorMode::Never,
        };

        let logger = configure(&config, None).unwrap().build();
        logger.log(
            &Record::builder()
                .args(format_args!("written to file"))
                .level(Level::Info)
                .target("utilkit")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("filtered out"))
                .level(Level::Trace)
                .target("utilkit")
                .build(),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("INFO"));
        assert!(lines[0].ends_with("written to file"));
        assert!(lines[0].contains("] ["));
    }
}
