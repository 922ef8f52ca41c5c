//! `-v`/`-q` flags controlling how much `hookrelay` logs.
//!
//! By default, warnings and errors are shown.
//! - `-q` only shows errors
//! - `-v` shows info, e.g. every delivered message
//! - `-vv` shows debug, e.g. rate limit waits
//! - `-vvv` shows trace

use log::{Level, LevelFilter};
use serde::Deserialize;

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    /// Pass many times for more log output
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "More output per occurrence",
        conflicts_with = "quiet",
    )]
    verbose: u8,

    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        help = "Less output per occurrence",
        conflicts_with = "verbose",
    )]
    quiet: u8,
}

impl Verbosity {
    /// Get the log level filter.
    pub(crate) fn log_level_filter(&self) -> LevelFilter {
        level_enum(self.verbosity()).to_level_filter()
    }

    #[allow(clippy::cast_possible_wrap)]
    const fn verbosity(&self) -> i8 {
        level_value(Level::Warn) - (self.quiet as i8) + (self.verbose as i8)
    }
}

// Deserialized from a level name like "info", "warning" or "Debug"
impl<'de> Deserialize<'de> for Verbosity {
    #[allow(clippy::cast_sign_loss)]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let level = match s.to_lowercase().as_str() {
            "error" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "info" => Level::Info,
            "debug" => Level::Debug,
            "trace" => Level::Trace,
            level => {
                return Err(serde::de::Error::custom(format!(
                    "invalid log level `{level}`"
                )));
            }
        };
        let offset = level_value(level) - level_value(Level::Warn);
        Ok(if offset < 0 {
            Verbosity {
                verbose: 0,
                quiet: offset.unsigned_abs(),
            }
        } else {
            Verbosity {
                verbose: offset as u8,
                quiet: 0,
            }
        })
    }
}

const fn level_value(level: Level) -> i8 {
    match level {
        Level::Error => 0,
        Level::Warn => 1,
        Level::Info => 2,
        Level::Debug => 3,
        Level::Trace => 4,
    }
}

const fn level_enum(verbosity: i8) -> Level {
    match verbosity {
        i8::MIN..=0 => Level::Error,
        1 => Level::Warn,
        2 => Level::Info,
        3 => Level::Debug,
        _ => Level::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_warn() {
        assert_eq!(Verbosity::default().log_level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn test_flags() {
        let verbosity = |verbose, quiet| Verbosity { verbose, quiet }.log_level_filter();
        assert_eq!(verbosity(1, 0), LevelFilter::Info);
        assert_eq!(verbosity(2, 0), LevelFilter::Debug);
        assert_eq!(verbosity(9, 0), LevelFilter::Trace);
        assert_eq!(verbosity(0, 1), LevelFilter::Error);
        assert_eq!(verbosity(0, 5), LevelFilter::Error);
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            verbose: Verbosity,
        }

        for (raw, expected) in [
            ("error", LevelFilter::Error),
            ("Warning", LevelFilter::Warn),
            ("info", LevelFilter::Info),
            ("DEBUG", LevelFilter::Debug),
        ] {
            let wrapper: Wrapper = toml::from_str(&format!("verbose = \"{raw}\"")).unwrap();
            assert_eq!(wrapper.verbose.log_level_filter(), expected);
        }
        assert!(toml::from_str::<Wrapper>("verbose = \"loud\"").is_err());
    }
}
