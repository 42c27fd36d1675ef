//! CLI parse tests and the read-only store listing.

use super::{AddCommand, Cli, CliCommand, StatusArg};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

mod status;
