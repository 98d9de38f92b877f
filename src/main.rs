//! Parley - chat with local models
//!
//! Main entry point for the CLI application.

use clap::Parser;
use parley::{Config, Repl};

/// Parley - a personal chatbot toolkit over local LLMs
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chat model to use
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// System prompt for the conversation
    #[arg(long, short = 's')]
    system: Option<String>,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Disable streaming output
    #[arg(long)]
    no_stream: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.chat.model = model.clone();
    }

    if let Some(ref system) = args.system {
        config.chat.system_prompt = Some(system.clone());
    }

    if args.no_stream {
        config.streaming.enabled = false;
    }

    if args.debug {
        config.chat.debug = true;
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        use std::io::Write;
        use std::sync::Arc;

        let client = Arc::new(parley::OllamaClient::from_config(&config));
        let mut bot = parley::ChatBot::from_config(client, &config);

        let answer = bot
            .run_to_completion(&prompt, |chunk| {
                if config.streaming.enabled {
                    print!("{}", chunk.content);
                    let _ = std::io::stdout().flush();
                }
            })
            .await?;

        if config.streaming.enabled {
            println!();
        } else {
            println!("{}", answer);
        }
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::with_config(config);
    repl.run().await?;

    Ok(())
}
