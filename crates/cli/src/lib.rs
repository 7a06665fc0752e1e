pub mod commands;

use campusdesk_agent::runtime::AssistantRequest;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "campusdesk",
    about = "Campusdesk operator CLI",
    long_about = "Ask the university assistant, manage the directory database, and inspect configuration.",
    after_help = "Examples:\n  campusdesk ask \"When is registration?\"\n  campusdesk seed\n  campusdesk doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Answer one question and print the structured response")]
    Ask {
        #[arg(help = "Question text")]
        prompt: String,
        #[arg(long, help = "Conversation id forwarded to the hosted model")]
        session: Option<String>,
        #[arg(long, help = "Caller id forwarded to the hosted model")]
        actor: Option<String>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Replace the directory tables with the deterministic demo dataset")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, directory schema and routing setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ask { prompt, session, actor } => commands::ask::run(AssistantRequest {
            prompt: Some(prompt),
            session_id: session,
            actor_id: actor,
        }),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
