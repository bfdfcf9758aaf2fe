use std::sync::Arc;

use atty::Stream;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use strap_core::{
    CommandContext, CommandGroup, ExecutionOutcome, GlobalOptions, SharedEffects, SystemEffects,
};

mod cli;
mod dispatch;
mod style;

use cli::{BootstrapArgs, CommandCli, StrapCli};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = StrapCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        project: cli
            .project
            .as_ref()
            .map(|path| path.to_string_lossy().to_string()),
    };

    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let ctx = CommandContext::new(&global, effects).map_err(|err| eyre!("{err:?}"))?;

    let command = cli
        .command
        .clone()
        .unwrap_or(CommandCli::Bootstrap(BootstrapArgs::default()));
    let (group, outcome) = dispatch::dispatch_command(&ctx, &command)?;
    let code = emit_output(&cli, group, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("strap_core={level},strap_cli={level},strap_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(cli: &StrapCli, group: CommandGroup, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = strap_core::to_json_response(group, outcome, code);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !cli.quiet {
        let message = strap_core::format_status_message(group, &outcome.message);
        println!("{}", style.status(&outcome.status, &message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            let hint_line = format!("Hint: {hint}");
            println!("{}", style.info(&hint_line));
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}
