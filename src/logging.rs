use chrono::{DateTime, Local, TimeZone};
use env_logger::{Env, Target};
use log::{LevelFilter, Record};
use std::fmt::Display;
use std::io::Write;

/// Level used when no verbosity flag is given
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Install the process logger, writing `[time] LEVEL:target:message` lines to stdout.
///
/// `RUST_LOG` still takes precedence over the level chosen on the command line.
pub fn init(level: Option<LevelFilter>) {
    let level = level.unwrap_or(DEFAULT_LEVEL);
    env_logger::Builder::from_env(Env::default().default_filter_or(level.as_str()))
        .target(Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}", format_line(&Local::now(), record)))
        .init();
}

fn format_line<Tz: TimeZone>(time: &DateTime<Tz>, record: &Record) -> String
where
    Tz::Offset: Display,
{
    format!(
        "[{}] {}:{}:{}",
        time.format(DATE_FORMAT),
        record.level(),
        record.target(),
        record.args()
    )
}
