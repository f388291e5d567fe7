//! `hd completions <shell>`.

use std::io::Write;

use clap::Args;
use clap_complete::{Shell, generate};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script generation.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to stdout.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> anyhow::Result<()> {
    write_completions(shell, command, &mut std::io::stdout());
    Ok(())
}

fn write_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) {
    let bin = command.get_bin_name().unwrap_or("hd").to_string();
    generate(shell, command, bin, out);
}
