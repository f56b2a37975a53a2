//! Command-line parsing for the `carewatch` binary.
//!
//! ```text
//! carewatch run               one cycle, JSON result on stdout
//! carewatch watch <seconds>   run a cycle every <seconds> until Ctrl-C
//! carewatch mark <row_id>     mark a single reminder delivered
//! ```

use std::time::Duration;

use anyhow::{anyhow, bail, Result};

pub const USAGE: &str = "usage: carewatch <run | watch <seconds> | mark <row_id> | help>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run,
    Watch { interval: Duration },
    Mark { row_id: i64 },
    Help,
}

pub fn parse_args(args: &[&str]) -> Result<Command> {
    match args {
        [] | ["run"] => Ok(Command::Run),
        ["help"] | ["-h"] | ["--help"] => Ok(Command::Help),
        ["watch", seconds] => {
            let secs: u64 = seconds
                .parse()
                .map_err(|_| anyhow!("watch interval must be a whole number of seconds, got '{seconds}'"))?;
            if secs == 0 {
                bail!("watch interval must be greater than zero");
            }
            Ok(Command::Watch {
                interval: Duration::from_secs(secs),
            })
        }
        ["mark", row_id] => {
            let row_id = row_id
                .parse()
                .map_err(|_| anyhow!("reminder id must be an integer, got '{row_id}'"))?;
            Ok(Command::Mark { row_id })
        }
        ["watch"] => bail!("watch needs an interval in seconds"),
        ["mark"] => bail!("mark needs a reminder id"),
        [cmd, ..] if matches!(*cmd, "run" | "watch" | "mark" | "help") => {
            bail!("unexpected arguments after '{cmd}'\n{USAGE}")
        }
        [other, ..] => bail!("unknown command '{other}'\n{USAGE}"),
    }
}
