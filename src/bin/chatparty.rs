//! chatparty - RPG party demo
//!
//! A game master bot and a few player bots improvise a scene together for a
//! number of rounds, taking turns through an agent group.

use clap::Parser;
use std::io::Write;
use std::sync::Arc;

use parley::{AgentGroup, ChatBot, ChatProvider, Config, OllamaClient};

const GM_PROMPT: &str = "You are the game master of a lighthearted fantasy \
tabletop session. Narrate short, vivid scenes (3-4 sentences) and react to \
what the players do. Never speak for the players.";

const FIGHTER_PROMPT: &str = "You are Brovik, a boisterous dwarven fighter in \
a fantasy tabletop session. Answer in character with one or two sentences \
describing what you do or say.";

const MAGE_PROMPT: &str = "You are Sefa, a cautious elven mage in a fantasy \
tabletop session. Answer in character with one or two sentences describing \
what you do or say.";

const TRICKSTER_PROMPT: &str = "You are Pip, a halfling trickster in a \
fantasy tabletop session. Answer in character with one or two sentences \
describing what you do or say.";

/// chatparty - multi-agent RPG chat demo
#[derive(Parser, Debug)]
#[command(name = "chatparty")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of scene rounds to play
    #[arg(long, short = 'r', default_value_t = 3)]
    rounds: usize,

    /// Chat model to use
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Opening scene for the game master
    #[arg(long)]
    scene: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load();
    if let Some(model) = args.model {
        config.chat.model = model;
    }

    let provider: Arc<dyn ChatProvider> = Arc::new(OllamaClient::from_config(&config));
    let model = config.chat.model.clone();

    let mut gm = ChatBot::from_model(provider.clone(), &model).with_system_prompt(GM_PROMPT);

    let mut party = AgentGroup::new();
    party.add(
        "Brovik",
        ChatBot::from_model(provider.clone(), &model).with_system_prompt(FIGHTER_PROMPT),
    );
    party.add(
        "Sefa",
        ChatBot::from_model(provider.clone(), &model).with_system_prompt(MAGE_PROMPT),
    );
    party.add(
        "Pip",
        ChatBot::from_model(provider, &model).with_system_prompt(TRICKSTER_PROMPT),
    );

    let mut gm_input = format!(
        "Open the session with this scene: {}",
        args.scene.unwrap_or_else(|| {
            "The party stands before the sunken gate of a flooded ruin.".to_string()
        })
    );

    for round in 1..=args.rounds {
        println!("═══ Round {round} ═══\n");

        print!("GM: ");
        std::io::stdout().flush()?;
        let narration = gm
            .run_to_completion(&gm_input, |chunk| {
                print!("{}", chunk.content);
                let _ = std::io::stdout().flush();
            })
            .await?;
        println!("\n");

        let exchanges = party.round(&narration).await?;
        for (name, text) in &exchanges {
            println!("{name}: {text}\n");
        }

        let recap = exchanges
            .iter()
            .map(|(name, text)| format!("{name}: {text}"))
            .collect::<Vec<_>>()
            .join("\n");
        gm_input = format!("The players responded:\n{recap}\n\nContinue the scene.");
    }

    Ok(())
}
