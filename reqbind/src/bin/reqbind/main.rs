mod commands;
mod examples;
mod output;
mod theme;

use anyhow::Result;
use clap::{ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand, error::ErrorKind};
use colored::control::ShouldColorize;
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use commands::{
    check::{CheckArgs, handle_check},
    decode::{DecodeArgs, handle_decode},
};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    (reqbind::config::ENV_EMPTY_TEXT_IS_ABSENT, "Treat empty text as a missing value (true/false)"),
    (reqbind::config::ENV_LIST_SEPARATOR, "Character splitting one text value into list elements"),
    (reqbind::config::ENV_TRIM_TEXT, "Trim whitespace around text values (true/false)"),
    ("RUST_LOG", "Log filter, e.g. reqbind=debug"),
];

#[derive(Parser)]
#[command(name = "reqbind")]
#[command(version)]
#[command(
    about = "Bind HTTP request data into typed values",
    long_about = r#"Request binding CLI that:

• Loads a field tree from a TOML or JSON schema
• Binds a request fixture (form, query, path, headers, files, basic auth)
• Reports every missing, mistyped or invalid field at once

Commands:
  decode    Bind a request fixture against a schema
  check     Validate a schema file and print its field tree
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a request fixture against a schema
    Decode(DecodeArgs),

    /// Validate a schema file and print its field tree
    Check(CheckArgs),
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        let matches = command.styles(theme::help_styles()).try_get_matches();
        match matches.and_then(|matches| Cli::from_arg_matches(&matches)) {
            Ok(cli) => cli,
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display help: {print_err}");
                    }
                    std::process::exit(0);
                }
                _ => {
                    let exit_code = err.exit_code();
                    let _ = print_blank_line_stderr();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display error: {print_err}");
                    }
                    std::process::exit(exit_code);
                }
            },
        }
    }
}

fn build_cli_command() -> Command {
    let mut command = Cli::command().after_long_help(environment_help());
    if !ShouldColorize::from_env().should_colorize() {
        command = command.color(ColorChoice::Never);
    }
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            *subcommand = subcommand.clone().after_long_help(examples_help(example.groups));
        }
    }
    command
}

fn examples_help(groups: &[ExampleGroup]) -> String {
    let mut buffer = String::from("Examples:\n");
    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            buffer.push('\n');
        }
        let _ = writeln!(buffer, "  {}", group.title);
        for command in group.commands {
            let _ = writeln!(buffer, "    $ {command}");
        }
    }
    buffer
}

/// Lists the decode-option overrides read from the environment.
fn environment_help() -> String {
    let width = ENVIRONMENT_VARIABLES.iter().map(|(key, _)| key.len()).max().unwrap_or_default();
    let mut buffer = String::from("Environment Variables:\n");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let _ = writeln!(buffer, "  {key:<width$}  {description}");
    }
    buffer.push_str("\nUse 'reqbind <command> --help' to view examples for each command.\n");
    buffer
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli.command, &output) {
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn execute(command: Commands, output: &OutputManager) -> Result<()> {
    match command {
        Commands::Decode(args) => handle_decode(args, output),
        Commands::Check(args) => handle_check(args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_help_lists_every_override() {
        let help = environment_help();
        for (key, _) in ENVIRONMENT_VARIABLES {
            assert!(help.contains(key), "missing {key}");
        }
    }

    #[test]
    fn every_subcommand_has_examples() {
        let command = build_cli_command();
        for example in command_examples() {
            assert!(command.find_subcommand(example.name).is_some(), "unknown subcommand {}", example.name);
            assert!(examples_help(example.groups).contains("$ reqbind"));
        }
    }
}
