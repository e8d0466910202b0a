use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quill - template-driven structured text insertion
#[derive(Parser, Debug, Clone)]
#[command(name = "quill", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "QUILL_CONFIG", default_value = "quill.toml", global = true)]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "QUILL_HOST", global = true)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "QUILL_PORT", global = true)]
    pub port: Option<u16>,

    /// Directory holding template files
    #[arg(long, env = "QUILL_TEMPLATES", global = true)]
    pub templates: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,

    /// Print the form fields a template renders to
    Render {
        /// Template file
        file: PathBuf,
    },

    /// Print the output a template generates
    Generate {
        /// Template file
        file: PathBuf,

        /// JSON file with form values keyed like the template
        #[arg(long)]
        values: Option<PathBuf>,
    },

    /// Print the trigger that `text` ends with, if any
    Match {
        /// Text typed so far
        text: String,
    },

    /// Check a template file the way the API does on save
    Validate {
        /// Template file
        file: PathBuf,
    },
}

impl Cli {
    /// Subcommand to run, `serve` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
