use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};
use crate::config::{Config, Override};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "emma",
    version,
    about = "Emma: a to-do list and a rolling 7-day schedule",
    disable_help_subcommand = true
)]
struct RawArgs {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    quiet: u8,

    /// Override one emmarc key, e.g. `--rc color=off`.
    #[arg(long = "rc", value_name = "KEY=VALUE", action = ArgAction::Append)]
    rc: Vec<Override>,

    #[arg(long = "emmarc", value_name = "PATH")]
    emmarc: Option<PathBuf>,

    #[arg(long = "data", value_name = "DIR")]
    data: Option<PathBuf>,

    /// `[rc.KEY=VALUE...] <command> [args...]`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

/// How chatty the stderr log is: `-v` and `-q` counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity {
    pub verbose: u8,
    pub quiet: u8,
}

impl Verbosity {
    pub fn level(self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (2.., _) => LevelFilter::ERROR,
            (1, _) | (0, 0) => LevelFilter::WARN,
            (0, 1) => LevelFilter::INFO,
            (0, 2) => LevelFilter::DEBUG,
            (0, _) => LevelFilter::TRACE,
        }
    }
}

/// `emma [flags] [rc.KEY=VALUE...] <command> [args...]`
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub verbosity: Verbosity,
    pub emmarc: Option<PathBuf>,
    pub data: Option<PathBuf>,
    /// Leading `rc.` words first, then `--rc` flags, so flags win.
    pub overrides: Vec<Override>,
    /// The command word and its arguments.
    pub words: Vec<String>,
}

impl CommandLine {
    pub fn parse_from<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let raw = RawArgs::parse_from(args);

        let mut words = raw.words;
        let leading = words.iter().take_while(|w| w.starts_with("rc.")).count();
        let command_words = words.split_off(leading);

        let mut overrides = words
            .iter()
            .map(|w| w.parse::<Override>())
            .collect::<anyhow::Result<Vec<_>>>()?;
        overrides.extend(raw.rc);

        Ok(Self {
            verbosity: Verbosity {
                verbose: raw.verbose,
                quiet: raw.quiet,
            },
            emmarc: raw.emmarc,
            data: raw.data,
            overrides,
            words: command_words,
        })
    }
}

/// Log to stderr at the verbosity's level for emma's own events; `RUST_LOG`
/// replaces the filter wholesale.
pub fn init_tracing(verbosity: Verbosity) {
    let level = verbosity.level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("emma_core={level}")));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = installed {
        debug!(error = %err, "tracing already initialised");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    /// Resolve the command word, falling back to `default.command`.
    #[tracing::instrument(skip(cfg, words))]
    pub fn parse(cfg: &Config, words: Vec<String>) -> anyhow::Result<Self> {
        let mut words = words.into_iter();

        let Some(first) = words.next() else {
            debug!(command = %cfg.default_command, "no command given");
            return Ok(Self {
                command: cfg.default_command.clone(),
                command_args: Vec::new(),
            });
        };

        let known = known_command_names();
        let command = expand_command_abbrev(&first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        debug!(token = %first, command, "resolved command");

        Ok(Self {
            command: command.to_string(),
            command_args: words.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    fn rc(key: &str, value: &str) -> Override {
        Override {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn leading_rc_words_become_overrides() {
        let line = CommandLine::parse_from([
            "emma",
            "rc.color=off",
            "rc.timezone=UTC",
            "plan",
            "fri",
            "rc.cola=refill",
        ])
        .expect("parse");

        assert_eq!(line.overrides, vec![rc("color", "off"), rc("timezone", "UTC")]);
        assert_eq!(line.words, words(&["plan", "fri", "rc.cola=refill"]));
    }

    #[test]
    fn colon_form_is_not_an_override() {
        assert!(CommandLine::parse_from(["emma", "rc.color:off", "list"]).is_err());
    }

    #[test]
    fn rc_flags_follow_positional_overrides() {
        let line = CommandLine::parse_from([
            "emma",
            "-vv",
            "--data",
            "/tmp/emma",
            "--rc",
            "color=on",
            "rc.color=off",
            "add",
            "Buy",
            "milk",
        ])
        .expect("parse");

        assert_eq!(line.verbosity.level(), LevelFilter::DEBUG);
        assert_eq!(line.data, Some(PathBuf::from("/tmp/emma")));
        assert_eq!(line.overrides, vec![rc("color", "off"), rc("color", "on")]);
        assert_eq!(line.words, words(&["add", "Buy", "milk"]));
    }

    #[test]
    fn verbosity_levels() {
        let level = |verbose, quiet| Verbosity { verbose, quiet }.level();
        assert_eq!(level(0, 0), LevelFilter::WARN);
        assert_eq!(level(1, 0), LevelFilter::INFO);
        assert_eq!(level(3, 0), LevelFilter::TRACE);
        assert_eq!(level(0, 1), LevelFilter::WARN);
        assert_eq!(level(2, 2), LevelFilter::ERROR);
    }

    #[test]
    fn empty_invocation_uses_configured_default() {
        let mut cfg = Config::default();
        cfg.set("default.command", "week").expect("set");

        let inv = Invocation::parse(&cfg, vec![]).expect("parse");
        assert_eq!(inv.command, "week");
        assert!(inv.command_args.is_empty());
    }

    #[test]
    fn abbreviated_command_keeps_its_arguments() {
        let inv = Invocation::parse(&Config::default(), words(&["pl", "fri", "Call", "Bob"]))
            .expect("parse");
        assert_eq!(inv.command, "plan");
        assert_eq!(inv.command_args, words(&["fri", "Call", "Bob"]));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Invocation::parse(&Config::default(), words(&["frobnicate"])).is_err());
    }
}
