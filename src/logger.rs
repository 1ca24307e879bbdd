//! log4rs setup.
//!
//! The library only logs through the `log` macros; binaries and tests pick a
//! backend here. Filter and update documents go to the `multivarka::trace`
//! target so they can be routed separately.

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder().build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?;
    Ok(appender)
}

/// Builds the logging config: stderr always, plus `multivarka.log` and
/// `trace.log` rolling files when `dir` is given.
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn build_config(
    dir: Option<&Path>,
    level: LevelFilter,
    retention: Option<u32>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let keep = retention.unwrap_or(7);
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let mut builder = Config::builder().appender(Appender::builder().build("stderr", Box::new(console)));
    let mut root = Root::builder().appender("stderr");
    match dir {
        Some(base) => {
            std::fs::create_dir_all(base)?;
            builder = builder
                .appender(Appender::builder().build("app", Box::new(rolling(base, "multivarka", keep)?)))
                .appender(Appender::builder().build("trace", Box::new(rolling(base, "trace", keep)?)))
                .logger(Logger::builder().appender("trace").additive(false).build("multivarka::trace", level));
            root = root.appender("app");
        }
        None => {
            builder = builder.logger(Logger::builder().build("multivarka::trace", level));
        }
    }
    Ok(builder.build(root.build(level))?)
}

/// Configures logging for the process. Later calls after a successful one
/// are ignored by log4rs and reported as an error here.
///
/// # Errors
/// Returns an error if the config cannot be built or a logger is already set.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(dir, parse_level(level), retention)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Configures logging from `MULTIVARKA_LOG_DIR`, `MULTIVARKA_LOG_LEVEL` and
/// `MULTIVARKA_LOG_RETENTION`.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::var("MULTIVARKA_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("MULTIVARKA_LOG_LEVEL").ok();
    let retention = std::env::var("MULTIVARKA_LOG_RETENTION").ok().and_then(|s| s.parse::<u32>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}
