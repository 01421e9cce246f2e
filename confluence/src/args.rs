use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Confluence LLM gateway
#[derive(Debug, Parser)]
#[command(name = "confluence", about = "One chat interface over Anthropic, OpenAI-compatible and Ollama backends")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "confluence.toml", env = "CONFLUENCE_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered providers and whether each can serve requests
    Providers,

    /// Send one prompt and print the answer
    Chat(ChatArgs),
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// Provider name or alias; auto-detected when omitted
    #[arg(short, long, env = "LLM_PROVIDER")]
    pub provider: Option<String>,

    /// Model override
    #[arg(short, long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Print the answer as it streams
    #[arg(long)]
    pub stream: bool,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Output token budget
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// User message
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn chat_flags_parse() {
        let args = Args::try_parse_from([
            "confluence",
            "--config",
            "alt.toml",
            "chat",
            "--provider",
            "claude",
            "--stream",
            "--max-tokens",
            "256",
            "Hello there",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("alt.toml"));
        let Command::Chat(chat) = args.command else {
            panic!("expected chat command");
        };
        assert_eq!(chat.provider.as_deref(), Some("claude"));
        assert!(chat.stream);
        assert_eq!(chat.max_tokens, Some(256));
        assert_eq!(chat.prompt, "Hello there");
    }
}
