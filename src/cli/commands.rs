//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::chat::ChatBot;
use crate::core::{Config, Result};
use crate::llm::{ChatProvider, OllamaClient};

/// Result of parsing a command
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Clear history
    Clear,
}

/// Parse and handle special commands
pub async fn handle_command(
    input: &str,
    bot: &mut ChatBot,
    client: &OllamaClient,
    config: &mut Config,
) -> Result<CommandResult> {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => {
            bot.history = bot.history.empty(true);
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "models" => {
            let models = client.list_models().await?;
            let output = format!(
                "Available models:\n{}\n\nCurrent: {}",
                models
                    .iter()
                    .map(|m| format!("  - {}", m))
                    .collect::<Vec<_>>()
                    .join("\n"),
                bot.model(),
            );
            Ok(CommandResult::Handled(output))
        }

        "tools" => {
            let output = if bot.toolset.is_empty() {
                "No tools registered.".to_string()
            } else {
                bot.toolset.render()
            };
            Ok(CommandResult::Handled(output))
        }

        "history" => {
            let output = if bot.history.is_empty() {
                "History is empty.".to_string()
            } else {
                bot.history.transcript()
            };
            Ok(CommandResult::Handled(output))
        }

        "set" => handle_set_command(args, bot, config),

        "status" => {
            let status = format!(
                "Parley Status:\n\
                 ─────────────────────────────\n\
                 Model:     {}\n\
                 Tools:     {}\n\
                 History:   {} messages\n\
                 Streaming: {}\n\
                 Debug:     {}",
                bot.model(),
                bot.toolset.len(),
                bot.history.len(),
                if config.streaming.enabled { "on" } else { "off" },
                if config.chat.debug { "on" } else { "off" },
            );
            Ok(CommandResult::Handled(status))
        }

        _ => Ok(CommandResult::Continue(input.to_string())),
    }
}

/// Handle 'set' subcommands
fn handle_set_command(
    args: &str,
    bot: &mut ChatBot,
    config: &mut Config,
) -> Result<CommandResult> {
    let parts: Vec<&str> = args.splitn(2, ' ').collect();

    if parts.is_empty() || parts[0].is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: set <model|stream> <value>\n\
             Examples:\n\
               set model llama3.2:3b\n\
               set stream off"
                .to_string(),
        ));
    }

    let key = parts[0].to_lowercase();
    let value = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match key.as_str() {
        "model" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current model: {}",
                    bot.model()
                )));
            }
            bot.set_model(value);
            config.set_model(value);
            Ok(CommandResult::Handled(format!("Model set to: {}", value)))
        }

        "stream" => {
            let enabled = matches!(value.to_lowercase().as_str(), "on" | "true" | "1" | "yes");
            config.set_streaming(enabled);
            Ok(CommandResult::Handled(format!(
                "Streaming: {}",
                if enabled { "ON" } else { "OFF" }
            )))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown setting: {}. Available: model, stream",
            key
        ))),
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Parley Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Parley
  clear, reset     Clear conversation history (keeps system prompt)
  status           Show current configuration
  models           List available Ollama models
  tools            List registered tools
  history          Show the conversation transcript

  set model <model>    Switch the chat model
  set stream <on|off>  Toggle streaming output

Tips:
  - Tool calls are executed automatically and their results
    are fed back to the model before it answers.
  - Use Ctrl+D to exit.
─────────────────────────────────────────────"#
        .to_string()
}
