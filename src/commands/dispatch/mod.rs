//! Command dispatch logic for zotsort

use std::time::Instant;

use crate::cli::Cli;
use tracing::debug;
use zotsort_core::error::Result;

mod command;
mod commands;

pub use command::CommandContext;
use command::{Command, NoCommand};

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let Some(cmd) = &cli.command else {
        return NoCommand.execute();
    };

    let ctx = CommandContext::load(cli, start)?;
    debug!(elapsed = ?start.elapsed(), dry_run = ctx.dry_run(), "load_config");

    cmd.execute(&ctx)
}
