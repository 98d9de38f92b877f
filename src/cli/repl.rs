//! Interactive REPL for Parley
//!
//! Provides the main user interaction loop: read input, stream the reply,
//! execute tool calls, and re-invoke the model until it answers in text.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::chat::ChatBot;
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result, ToolOutcome};
use crate::llm::{ChatProvider, OllamaClient};
use crate::tools::WorkspacesToolkit;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    bot: ChatBot,
    client: OllamaClient,
    config: Config,
}

impl Repl {
    /// Create a new REPL with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::load())
    }

    /// Create a REPL with custom configuration
    pub fn with_config(config: Config) -> Self {
        let client = OllamaClient::from_config(&config);
        let workspace = WorkspacesToolkit::new();
        let bot = ChatBot::from_config(Arc::new(client.clone()), &config)
            .with_tools(workspace.tools());

        Self {
            bot,
            client,
            config,
        }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        // Check that the server is reachable and the model is present
        match self.client.list_models().await {
            Ok(_) => {
                if !self.client.is_model_available(self.bot.model()).await? {
                    println!(
                        "Warning: model '{}' not found. Run: ollama pull {}\n",
                        self.bot.model(),
                        self.bot.model()
                    );
                }
            }
            Err(e) => {
                println!("\nInitialization error: {}\n", e);
                return Ok(());
            }
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &mut self.bot, &self.client, &mut self.config).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Conversation cleared.\n");
                    continue;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                    continue;
                }
                Ok(CommandResult::Continue(input)) => {
                    if let Err(e) = self.chat_turn(&input).await {
                        eprintln!("\nError: {}\n", e);
                    }
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Handle one user turn: reply, execute any tool calls, and re-invoke the
    /// model on the results until it answers without tools.
    async fn chat_turn(&mut self, input: &str) -> Result<()> {
        let streaming = self.config.streaming.enabled;
        let max_rounds = self.config.chat.max_tool_rounds;
        let mut new_message = Some(input.to_string());
        let mut rounds = 0;

        print!("\nAssistant: ");
        io::stdout().flush()?;

        loop {
            let outcomes: Vec<ToolOutcome>;

            if streaming {
                let stream = self.bot.stream(new_message.as_deref()).await?;
                let mut turn = stream.print_and_collect().await?;
                println!();

                if !turn.has_tool_calls() {
                    println!();
                    return Ok(());
                }
                outcomes = turn.execute_tools().await?;
            } else {
                let mut turn = self.bot.chat(new_message.as_deref()).await?;
                println!("{}", turn.content());

                if !turn.has_tool_calls() {
                    println!();
                    return Ok(());
                }
                outcomes = turn.execute_tools().await?;
            }

            println!("\n[Tool Results]");
            for outcome in &outcomes {
                println!("  {}", outcome.summary());
            }
            println!("[End Tool Results]\n");

            rounds += 1;
            if rounds >= max_rounds {
                println!("(stopping after {} tool rounds)\n", rounds);
                return Ok(());
            }
            new_message = None;
        }
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("─────────────────────────────────────────────");
        println!(" Parley — chat with local models");
        println!("─────────────────────────────────────────────");
        println!("Ollama:  {}", self.config.ollama_url());
        println!("Model:   {}", self.bot.model());
        println!("Tools:   {}", self.bot.toolset.names().join(", "));
        println!();
        println!("Commands: help, clear, status, models, tools, history, exit");
        println!("─────────────────────────────────────────────");
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
