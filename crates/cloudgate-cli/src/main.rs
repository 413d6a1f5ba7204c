use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cloudgate", version, about = "Cloudgate intent gate CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an extracted intent through the gate and print the decision.
    Evaluate {
        /// Settings file (gate configuration and policies). Defaults apply when omitted.
        #[arg(long, short, env = "CLOUDGATE_SETTINGS")]
        settings: Option<PathBuf>,

        /// Intent file (JSON or YAML), or "-" for stdin.
        #[arg(long, short)]
        intent: PathBuf,

        /// Print the full result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Lint a settings file: gate configuration and every policy.
    Check {
        #[arg(long, short, env = "CLOUDGATE_SETTINGS")]
        settings: PathBuf,
    },

    /// List the built-in policy templates.
    Templates,

    /// Apply a reply to a saved CONFIRM result.
    Confirm {
        /// Result file previously written by `evaluate --json`.
        #[arg(long)]
        result: PathBuf,

        /// The user's reply, e.g. "confirm" or "cancel".
        #[arg(long)]
        reply: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Evaluate {
            settings,
            intent,
            json,
        } => commands::evaluate::run(settings.as_deref(), &intent, json)?,

        Command::Check { settings } => commands::check::run(&settings)?,

        Command::Templates => commands::templates::run(),

        Command::Confirm {
            result,
            reply,
            json,
        } => commands::confirm::run(&result, &reply, json)?,
    }

    Ok(())
}
