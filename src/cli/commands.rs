use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "reclamation-admin")]
#[command(about = "Browse and manage reclamations against a REST backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive list (default)
    Tui {
        /// Start location, e.g. "/reclamation?page=2"
        #[arg(short, long, default_value = "/reclamation")]
        location: String,
    },

    /// Print one page of reclamations
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Page size (defaults to list.page_size)
        #[arg(short, long)]
        size: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a single reclamation
    Get {
        id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Create a reclamation
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        link: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Change fields of an existing reclamation
    Update {
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        link: Option<String>,

        /// New description; an empty string clears it
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a reclamation
    Delete {
        id: i64,

        /// Name shown in the confirmation (fetched when omitted)
        #[arg(short, long)]
        name: Option<String>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
