//! Command-line surface. Most subcommands compile down to a command
//! string for the daemon's tool registry; the daemon resolves aliases
//! exactly as it would for any other channel.

use crate::client::DaemonClient;
use crate::daemon_ctl;
use crate::exit_error::ExitError;
use crate::output;
use berth_store::DbLayout;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "berth", about = "Agent sessions in containers", version)]
pub struct Cli {
    /// Installation root (defaults to $BERTH_ROOT or the user data dir).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Target session for session-scoped commands.
    #[arg(long, short = 's', global = true)]
    pub session: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the daemon process.
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },

    /// Create a session from a template.
    New {
        template: String,
        name: Option<String>,
    },

    /// List sessions.
    Ls,

    /// Send a user message to a session.
    Send {
        session: u64,
        text: Vec<String>,
    },

    /// Pause a session.
    Pause { session: u64 },

    /// Resume a paused session.
    Resume { session: u64 },

    /// Stop a session.
    Stop { session: u64 },

    /// Run a stopped session.
    Run { session: u64 },

    /// Retry a finished session.
    Retry { session: u64 },

    /// Soft-delete a session.
    Rm { session: u64 },

    /// Resolve a pending approval.
    Approve {
        id: u64,
        choice: String,
        explanation: Vec<String>,
    },

    /// Answer a pending question.
    Answer {
        id: u64,
        answer: Vec<String>,
    },

    /// Manage session groups.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// List available templates.
    Templates,

    /// Send a raw command string to the daemon's resolver.
    Cmd {
        /// Command tokens, passed through verbatim.
        #[arg(trailing_var_arg = true, required = true)]
        tokens: Vec<String>,

        /// Fire-and-forget instead of waiting for the response.
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the daemon in the background.
    Start,
    /// Ask the daemon to shut down.
    Stop,
    /// Daemon health and session counts.
    Status,
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// Add a session to a group.
    Add { group: String, session: u64 },
    /// Remove a session from a group.
    Remove { group: String, session: u64 },
    /// List groups.
    Ls,
    /// Send a user message to every member.
    Send { group: String, text: Vec<String> },
}

pub async fn run(cli: Cli) -> Result<(), ExitError> {
    let root = cli
        .root
        .clone()
        .or_else(|| std::env::var("BERTH_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(default_root);
    let layout = DbLayout::new(&root);
    let client = DaemonClient::new(layout.control_socket_path());

    let (command, wait) = match cli.command {
        Command::Daemon { action } => {
            return daemon_ctl::run(&root, &client, action).await;
        }
        Command::New { template, name } => (
            match name {
                Some(name) => format!("new {template} {name}"),
                None => format!("new {template}"),
            },
            true,
        ),
        Command::Ls => ("ls".to_string(), true),
        Command::Send { session, text } => (format!("send {session} {}", text.join(" ")), true),
        Command::Pause { session } => (format!("pause {session}"), true),
        Command::Resume { session } => (format!("resume {session}"), true),
        Command::Stop { session } => (format!("stop {session}"), true),
        Command::Run { session } => (format!("run {session}"), true),
        Command::Retry { session } => (format!("retry {session}"), true),
        Command::Rm { session } => (format!("rm {session}"), true),
        Command::Approve { id, choice, explanation } => {
            let mut command = format!("approve {id} {choice}");
            if !explanation.is_empty() {
                command.push(' ');
                command.push_str(&explanation.join(" "));
            }
            (command, true)
        }
        Command::Answer { id, answer } => (format!("answer {id} {}", answer.join(" ")), true),
        Command::Group { action } => (
            match action {
                GroupAction::Add { group, session } => format!("group add {group} {session}"),
                GroupAction::Remove { group, session } => {
                    format!("group remove {group} {session}")
                }
                GroupAction::Ls => "groups".to_string(),
                GroupAction::Send { group, text } => {
                    format!("group send {group} {}", text.join(" "))
                }
            },
            true,
        ),
        Command::Templates => ("templates".to_string(), true),
        Command::Cmd { tokens, no_wait } => (tokens.join(" "), !no_wait),
    };

    let data = client.command(&command, cli.session, wait).await?;
    output::print_value(&data);
    Ok(())
}

fn default_root() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".local/share/berth"))
        .unwrap_or_else(|_| PathBuf::from("."))
}
