use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "solace")]
#[command(version)]
#[command(about = "A terminal client for the Solace mental-health support chat", long_about = None)]
pub struct Cli {
    /// Backend base URL including the /api prefix (overrides config)
    #[arg(long, env = "SOLACE_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Resume a previous conversation (shows selection UI)
    #[arg(long, conflicts_with = "continue_conversation")]
    pub resume: bool,

    /// Continue the last conversation
    #[arg(long = "continue", conflicts_with = "resume")]
    pub continue_conversation: bool,

    /// Send one message, print the reply and exit
    #[arg(short, long, conflicts_with_all = ["resume", "continue_conversation"])]
    pub prompt: Option<String>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, requires = "prompt")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Start a chat session (default)
    Chat,
    /// List support resources
    Resources,
    /// List stored conversations
    Conversations,
    /// Run sentiment analysis on a message without sending it
    Analyze {
        /// Text to analyze
        text: String,
    },
    /// Check the backend
    Health,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
    /// Markdown formatted output
    Markdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prompt_with_format() {
        let cli = Cli::try_parse_from(["solace", "-p", "I can't sleep", "--output-format", "json"])
            .unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("I can't sleep"));
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_continue_conflicts_with_resume() {
        assert!(Cli::try_parse_from(["solace", "--continue", "--resume"]).is_err());
        let cli = Cli::try_parse_from(["solace", "--continue"]).unwrap();
        assert!(cli.continue_conversation);
    }

    #[test]
    fn test_analyze_subcommand() {
        let cli = Cli::try_parse_from(["solace", "analyze", "I feel hopeless"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Analyze {
                text: "I feel hopeless".to_string()
            })
        );
    }

    #[test]
    fn test_output_format_requires_prompt() {
        assert!(Cli::try_parse_from(["solace", "--output-format", "json"]).is_err());
    }
}
