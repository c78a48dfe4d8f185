//! CLI parser.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "budget-bot")]
#[command(about = "Telegram budget bot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_token() {
        let cli = Cli::try_parse_from(["budget-bot", "run", "--token", "abc"]).unwrap();
        match cli.command {
            Commands::Run { token } => assert_eq!(token.as_deref(), Some("abc")),
        }
    }

    #[test]
    fn test_parse_run_without_token() {
        let cli = Cli::try_parse_from(["budget-bot", "run"]).unwrap();
        match cli.command {
            Commands::Run { token } => assert!(token.is_none()),
        }
    }
}
