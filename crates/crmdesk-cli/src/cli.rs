use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "crmdesk", version, about = "Command line client for the CRM backend")]
pub struct Cli {
    /// Backend base address (overrides CRMDESK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where the session token is kept
    #[arg(long, value_enum, default_value_t = StoreKind::File, global = true)]
    pub token_store: StoreKind,

    /// Keep and replay cookies set by the backend
    #[arg(long, global = true)]
    pub with_credentials: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    File,
    Keyring,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account (JSON user data)
    Register {
        #[arg(long)]
        data: String,
    },
    /// Sign out and forget the session token
    Logout,
    /// Show the signed-in user
    Me,
    /// Change the password (JSON password data)
    ResetPassword {
        #[arg(long)]
        data: String,
    },
    /// Client records
    Clients {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Invoice records
    Invoices {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Fetch the user, clients and invoices at once
    Dashboard,
}

impl Command {
    /// Subcommand name, safe to log (payloads may carry passwords)
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::Logout => "logout",
            Command::Me => "me",
            Command::ResetPassword { .. } => "reset-password",
            Command::Clients { .. } => "clients",
            Command::Invoices { .. } => "invoices",
            Command::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ResourceAction {
    List,
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
}
