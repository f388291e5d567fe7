#![forbid(unsafe_code)]

mod cmd;
mod context;
mod output;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use context::AppContext;
use helpdesk_core::config;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hd: service-desk tickets and a personal todo list",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding stored data and config.toml.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Session",
        about = "Log in with an email and password",
        long_about = "Log in and remember the account for later commands. \
                      Demo accounts: admin@company.com / admin123 and user@company.com / user123.",
        after_help = "EXAMPLES:\n    # Log in as the demo admin\n    hd login admin@company.com --password admin123\n\n    # Emit machine-readable output\n    hd login user@company.com -p user123 --json"
    )]
    Login(cmd::auth::LoginArgs),

    #[command(
        next_help_heading = "Session",
        about = "Create a user account and log in",
        after_help = "EXAMPLES:\n    hd register jane@company.com --password s3cret --name \"Jane Roe\" --department Finance"
    )]
    Register(cmd::auth::RegisterArgs),

    #[command(next_help_heading = "Session", about = "Forget the logged-in account")]
    Logout,

    #[command(next_help_heading = "Session", about = "Show the logged-in account")]
    Whoami,

    #[command(
        next_help_heading = "Service desk",
        about = "Create, triage and discuss tickets",
        after_help = "EXAMPLES:\n    hd ticket create --title \"VPN drops\" --description \"Every ten minutes\" --category network\n    hd ticket list --status open\n    hd ticket dashboard"
    )]
    Ticket(cmd::ticket::TicketArgs),

    #[command(
        next_help_heading = "Todos",
        about = "Manage the personal todo list",
        after_help = "EXAMPLES:\n    hd todo add \"Renew badge\" --priority high\n    hd todo list --sort priority"
    )]
    Todo(cmd::todo::TodoArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    hd completions bash\n\n    # Generate zsh completions\n    hd completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("HELPDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "helpdesk=debug,info"
        } else if quiet {
            "error"
        } else {
            "helpdesk=info,warn"
        })
    });

    let format = env::var("HELPDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let effective = match config::resolve_config(cli.data_dir.as_deref(), cli.json) {
        Ok(effective) => effective,
        Err(err) => {
            let mode = if cli.json { OutputMode::Json } else { OutputMode::Text };
            render_error(mode, &CliError::from(&err))?;
            return Err(err.into());
        }
    };
    let output = OutputMode::from_resolved(&effective.resolved_output);
    debug!(data_dir = %effective.data_dir.display(), ?output, "config resolved");

    let ctx = match AppContext::open(&effective, output) {
        Ok(ctx) => ctx,
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            return Err(err.into());
        }
    };

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match &cli.command {
        Commands::Login(args) => cmd::auth::run_login(args, &ctx),
        Commands::Register(args) => cmd::auth::run_register(args, &ctx),
        Commands::Logout => cmd::auth::run_logout(&ctx),
        Commands::Whoami => cmd::auth::run_whoami(&ctx),
        Commands::Ticket(args) => cmd::ticket::run_ticket(args, &ctx),
        Commands::Todo(args) => cmd::todo::run_todo(args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmd::ticket::TicketCommand;
    use cmd::todo::TodoCommand;
    use helpdesk_core::model::{Status, TicketPriority};
    use helpdesk_core::view::{TodoFilter, TodoSort};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["hd", "ticket", "list", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn data_dir_flag_is_global() {
        let cli = Cli::parse_from(["hd", "todo", "list", "--data-dir", "/tmp/hd"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/hd")));
    }

    #[test]
    fn quiet_flag_parsed() {
        let cli = Cli::parse_from(["hd", "-q", "whoami"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Whoami));
    }

    #[test]
    fn login_requires_password() {
        assert!(Cli::try_parse_from(["hd", "login", "admin@company.com"]).is_err());
        let cli = Cli::parse_from(["hd", "login", "admin@company.com", "-p", "admin123"]);
        let Commands::Login(args) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(args.password, "admin123");
    }

    #[test]
    fn ticket_list_filters_parse_case_insensitively() {
        let cli = Cli::parse_from([
            "hd", "ticket", "list", "--status", "In-Progress", "--priority", "HIGH",
        ]);
        let Commands::Ticket(args) = cli.command else {
            panic!("expected ticket");
        };
        let TicketCommand::List(list) = args.command else {
            panic!("expected list");
        };
        assert_eq!(list.status, Some(Status::InProgress));
        assert_eq!(list.priority, Some(TicketPriority::High));
        assert!(list.category.is_none());
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["hd", "ticket", "status", "abc", "done-ish"]).is_err());
    }

    #[test]
    fn assign_requires_target_or_clear() {
        assert!(Cli::try_parse_from(["hd", "ticket", "assign", "abc"]).is_err());
        assert!(Cli::try_parse_from(["hd", "ticket", "assign", "abc", "1", "--clear"]).is_err());
        assert!(Cli::try_parse_from(["hd", "ticket", "assign", "abc", "--clear"]).is_ok());
    }

    #[test]
    fn todo_list_defaults() {
        let cli = Cli::parse_from(["hd", "todo", "list"]);
        let Commands::Todo(args) = cli.command else {
            panic!("expected todo");
        };
        let TodoCommand::List(list) = args.command else {
            panic!("expected list");
        };
        assert_eq!(list.filter, TodoFilter::All);
        assert_eq!(list.sort, TodoSort::Date);
    }

    #[test]
    fn all_subcommands_parse() {
        let subcommands = [
            vec!["hd", "login", "a@b.co", "-p", "x"],
            vec!["hd", "register", "a@b.co", "-p", "x", "--name", "A"],
            vec!["hd", "logout"],
            vec!["hd", "whoami"],
            vec!["hd", "ticket", "create", "--title", "t", "--description", "d"],
            vec!["hd", "ticket", "list"],
            vec!["hd", "ticket", "show", "x"],
            vec!["hd", "ticket", "edit", "x", "--category", "network"],
            vec!["hd", "ticket", "priority", "x", "critical"],
            vec!["hd", "ticket", "comment", "x", "hello", "--internal"],
            vec!["hd", "ticket", "stats"],
            vec!["hd", "ticket", "dashboard"],
            vec!["hd", "ticket", "admin"],
            vec!["hd", "todo", "add", "milk", "-p", "low"],
            vec!["hd", "todo", "toggle", "x"],
            vec!["hd", "todo", "rm", "x"],
            vec!["hd", "todo", "edit", "x", "oat milk"],
            vec!["hd", "todo", "clear-completed"],
            vec!["hd", "todo", "stats"],
            vec!["hd", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }
}
