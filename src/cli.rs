//! Command-line surface
//!
//! Flags are single-dash long booleans (`-ticker`). They are
//! rewritten to clap's `--ticker` form before parsing, so `--ticker`,
//! `-ticker=false` and `--ticker=true` work too. Every flag is independent.

use std::ffi::OsString;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crate::config::{LoopSelection, RunConfig};
use crate::dispatch::DispatchSet;

pub const USAGE: &str = "usage: ./tickertest [flags]

TickerTest executes a long-running function. This is to test what happens if you call a function using a Ticker that takes longer than a tick. For comparison, it can also call the long-running function in a loop using a sleep.

The flags are:

\t-ticker
\t\t\truns the long-running function in a ticker loop
\t-sleep
\t\t\truns the function in a loop with a sleep
\t-nogo
\t\t\truns a function that does not use extra threads
\t-go
\t\t\truns a function that fans out over worker threads and waits for them
\t-ingo
\t\t\truns the function on a detached thread
\t-help
\t\t\tprint help
";

#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(
    name = "tickertest",
    about = "Runs a long-running function from a ticker or a sleep loop",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Print help
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub help: bool,

    /// Run the work from a ticker loop
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub ticker: bool,

    /// Run the work from a loop with a sleep
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub sleep: bool,

    /// Dispatch the work directly
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub nogo: bool,

    /// Dispatch the work over parallel sub-tasks
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub go: bool,

    /// Dispatch the work on a detached thread
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub ingo: bool,
}

/// What the process should do
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Print [`USAGE`] and exit, whatever else was passed
    Help,
    Run(RunConfig),
}

impl Cli {
    pub fn into_invocation(self) -> Invocation {
        if self.help {
            return Invocation::Help;
        }

        Invocation::Run(
            RunConfig::default()
                .with_loops(LoopSelection {
                    ticker: self.ticker,
                    sleep: self.sleep,
                })
                .with_dispatch(DispatchSet {
                    direct: self.nogo,
                    parallel: self.go,
                    detached: self.ingo,
                }),
        )
    }
}

/// Rewrite `-name[=value]` arguments to `--name[=value]`
///
/// The program name, `--` forms, a lone `-` and single-letter flags are left
/// untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(position, arg)| {
            if position == 0 {
                return arg;
            }
            match arg.to_str() {
                Some(s) if is_single_dash_long(s) => OsString::from(format!("-{}", s)),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    let name = rest.split('=').next().unwrap_or_default();
    !rest.starts_with('-') && name.chars().count() > 1
}

/// Parse process arguments (program name first)
pub fn parse_from<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    Cli::try_parse_from(normalize_args(args)).map(Cli::into_invocation)
}
