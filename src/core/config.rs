//! Configuration management for Parley
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/parley/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{ParleyError, Result};

/// Main configuration for Parley
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ollama server configuration
    pub ollama: OllamaConfig,
    /// Chat behavior configuration
    pub chat: ChatConfig,
    /// Streaming configuration
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chat model to use
    pub model: String,
    /// Embedding model for retrieval
    pub embed_model: String,
    /// System prompt prefix
    pub system_prompt: Option<String>,
    /// Maximum tool-call rounds per user turn before giving up
    /// Default: 5
    pub max_tool_rounds: usize,
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: env::var("PARLEY_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            embed_model: env::var("PARLEY_EMBED_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            system_prompt: None,
            max_tool_rounds: 5,
            debug: env::var("PARLEY_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Whether to stream responses in real-time
    pub enabled: bool,
    /// Print tokens as they arrive (vs buffering)
    pub print_tokens: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            chat: ChatConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: env::var("PARLEY_STREAMING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            print_tokens: true,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ParleyError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ParleyError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ParleyError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ParleyError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ParleyError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| ParleyError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Update the chat model
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.chat.model = model.into();
    }

    /// Set streaming enabled/disabled
    pub fn set_streaming(&mut self, enabled: bool) {
        self.streaming.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.chat.max_tool_rounds, 5);
        assert!(config.streaming.enabled);
    }

    #[test]
    fn test_ollama_url() {
        let config = Config::default();
        assert_eq!(config.ollama_url(), "http://localhost:11434");
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.set_model("llama3.2:3b");
        config.chat.system_prompt = Some("You are terse.".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.chat.model, "llama3.2:3b");
        assert_eq!(parsed.chat.system_prompt.as_deref(), Some("You are terse."));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("parley"));
    }
}
