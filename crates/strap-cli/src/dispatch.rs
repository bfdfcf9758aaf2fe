use std::io::{self, BufRead, Write};

use atty::Stream;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;
use strap_core::{
    bootstrap, check_updates, force_update, BootstrapRequest, CommandContext, CommandGroup,
    ExecutionOutcome,
};

use crate::cli::CommandCli;

pub fn dispatch_command(
    ctx: &CommandContext,
    command: &CommandCli,
) -> Result<(CommandGroup, ExecutionOutcome)> {
    match command {
        CommandCli::Bootstrap(args) => {
            let request = BootstrapRequest {
                update: !args.no_update,
            };
            core_call(CommandGroup::Bootstrap, || bootstrap(ctx, &request))
        }
        CommandCli::Check => core_call(CommandGroup::Check, || check_updates(ctx)),
        CommandCli::ForceUpdate(args) => {
            if !args.yes && atty::is(Stream::Stdin) && !confirm_hard_reset()? {
                return Ok((
                    CommandGroup::ForceUpdate,
                    ExecutionOutcome::success(
                        "aborted; nothing changed",
                        json!({ "confirmed": false }),
                    ),
                ));
            }
            core_call(CommandGroup::ForceUpdate, || force_update(ctx))
        }
    }
}

fn core_call(
    group: CommandGroup,
    call: impl FnOnce() -> anyhow::Result<ExecutionOutcome>,
) -> Result<(CommandGroup, ExecutionOutcome)> {
    let outcome = call().map_err(|err| eyre!("{err:?}"))?;
    Ok((group, outcome))
}

fn confirm_hard_reset() -> Result<bool> {
    println!("This discards ALL local changes and untracked files.");
    print!("Continue? (y/N): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
