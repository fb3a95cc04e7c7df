mod connected_to_journal;

use std::{io::Write as _, time::SystemTime};

use anstyle::{AnsiColor, Effects, Style};
use connected_to_journal::connected_to_journal;
use env_logger::Env;

pub fn init() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if connected_to_journal() {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "<{}>{}: {}",
                journal_level(record.level()),
                record.target(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| {
            let subtle = AnsiColor::BrightBlack.on_default();
            write!(buf, "{subtle}[{subtle:#}")?;
            if let Ok(now) = jiff::Timestamp::try_from(SystemTime::now()) {
                write!(buf, "{now:.3} ")?;
            } else {
                write!(buf, "timestamp_error ")?;
            }
            let level_style = level_style(record.level());
            write!(
                buf,
                "{level_style}{}{level_style:#} {}",
                record.level(),
                record.target(),
            )?;
            if let Some(line) = record.line() {
                write!(buf, ":{line}")?;
            }
            write!(buf, "{subtle}]{subtle:#} ")?;
            writeln!(buf, "{}", record.args())
        });
    }
    builder.init();
}

fn journal_level(level: log::Level) -> u8 {
    match level {
        log::Level::Error => 3,
        log::Level::Warn => 4,
        log::Level::Info => 6,
        log::Level::Debug | log::Level::Trace => 7,
    }
}

fn level_style(level: log::Level) -> Style {
    match level {
        log::Level::Error => AnsiColor::Red.on_default().effects(Effects::BOLD),
        log::Level::Warn => AnsiColor::Yellow.on_default(),
        log::Level::Info => AnsiColor::Green.on_default(),
        log::Level::Debug => AnsiColor::Blue.on_default(),
        log::Level::Trace => AnsiColor::Cyan.on_default(),
    }
}
