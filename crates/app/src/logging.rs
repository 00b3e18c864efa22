use std::str::FromStr;

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Environment variable holding the log level (`error`, `warn`, `info`, `debug`, `trace`, `off`).
pub const LOG_LEVEL_ENV: &str = "DRIVETRAIN_LOG";

/// Parses a level name, falling back to `Info` when unset or unrecognised.
pub fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

/// Installs the terminal logger for an entry point.
pub fn init() -> Result<(), log::SetLoggerError> {
    let level = level_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref());
    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(level_from(None), LevelFilter::Info);
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some(" WARN ")), LevelFilter::Warn);
        assert_eq!(level_from(Some("off")), LevelFilter::Off);
        assert_eq!(level_from(Some("chatty")), LevelFilter::Info);
    }
}
