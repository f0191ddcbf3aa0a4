//! CLI module for Opina.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Opina - question answering over product reviews
///
/// Upload reviews, then ask about them in your own language. Answers are
/// grounded only in the uploaded reviews.
#[derive(Parser, Debug)]
#[command(name = "opina")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long, env = "OPINA_HOST")]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long, env = "OPINA_PORT")]
        port: Option<u16>,
    },

    /// Ask a question about the uploaded reviews
    Ask {
        /// The question to ask
        question: String,
    },

    /// Search for relevant review passages
    Search {
        /// Search query
        query: String,
    },

    /// Upload a file of reviews into the collection
    Upload {
        /// Text file with reviews
        file: String,

        /// Turn line breaks into sentence breaks before chunking
        #[arg(long)]
        flatten: bool,
    },

    /// Start an interactive chat session
    Chat,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from(["opina", "-vv", "upload", "reviews.txt", "--flatten"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Upload { file, flatten } => {
                assert_eq!(file, "reviews.txt");
                assert!(flatten);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ask_takes_only_a_question() {
        let cli = Cli::try_parse_from(["opina", "ask", "¿Es cómodo?"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "¿Es cómodo?"));
        assert!(Cli::try_parse_from(["opina", "ask", "q", "--conversation", "x"]).is_err());
    }

    #[test]
    fn test_config_init_flag() {
        let cli = Cli::try_parse_from(["opina", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
