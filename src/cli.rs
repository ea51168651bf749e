use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::commands::config::ConfigAction;
use crate::commands::format::FormatOptions;
use crate::commands::links::LinksOptions;
use crate::commands::summarize::SummarizeOptions;
use crate::logging;

#[derive(Parser)]
#[command(name = "thread-digest")]
#[command(about = "Summarize discussion threads with citable comment references", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a thread
    Summarize {
        thread_id: u64,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Skip the shared summary cache
        #[arg(long)]
        no_cache: bool,
        /// Emit HTML with navigation markers instead of markdown links
        #[arg(long)]
        html: bool,
        /// Read the rendered comments from a JSON file instead of the site
        #[arg(long)]
        rendered: Option<PathBuf>,
    },
    /// Print the thread as the model sees it
    Format {
        thread_id: u64,
        #[arg(long)]
        rendered: Option<PathBuf>,
    },
    /// Turn `[path]` references in a saved summary into comment URLs
    Links {
        thread_id: u64,
        #[arg(long)]
        summary: PathBuf,
        #[arg(long)]
        rendered: Option<PathBuf>,
    },
    /// Look up a thread in the shared summary cache
    Cache { thread_id: u64 },
    /// Show user profiles
    User {
        #[arg(required = true)]
        usernames: Vec<String>,
    },
    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Show,
    Set { key: String, value: String },
    Path,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for line in &report.details {
        eprintln!("{line}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    if let Some(output) = &report.output {
        println!("{}", output.trim_end());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let report = match cli.command {
        Command::Summarize {
            thread_id,
            provider,
            model,
            no_cache,
            html,
            rendered,
        } => commands::summarize::run(&SummarizeOptions {
            thread_id,
            provider,
            model,
            no_cache,
            html,
            rendered,
        })?,
        Command::Format { thread_id, rendered } => {
            commands::format::run(&FormatOptions { thread_id, rendered })?
        }
        Command::Links {
            thread_id,
            summary,
            rendered,
        } => commands::links::run(&LinksOptions {
            thread_id,
            summary,
            rendered,
        })?,
        Command::Cache { thread_id } => commands::cache::run(thread_id)?,
        Command::User { usernames } => commands::user::run(&usernames)?,
        Command::Config { action } => {
            let action = match action {
                ConfigCommand::Show => ConfigAction::Show,
                ConfigCommand::Set { key, value } => ConfigAction::Set { key, value },
                ConfigCommand::Path => ConfigAction::Path,
            };
            commands::config::run(&action)?
        }
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        bail!("{} finished with {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
