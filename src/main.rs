use pokemon_battle_core::battle::ai::RandomPlayer;
use pokemon_battle_core::config::EngineConfig;
use pokemon_battle_core::prefab_effects::standard_catalog;
use pokemon_battle_core::prefab_teams::{create_side_from_prefab, get_prefab_teams, standard_moves};
use pokemon_battle_core::{logging, BattleRunner, BattleState, GameState, GameType};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Plays one doubles battle between two random players and prints the log.
///
/// Reads `battle.ron` from the working directory when present.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config_path = Path::new("battle.ron");
    let config = if config_path.exists() {
        EngineConfig::load(config_path)?
    } else {
        EngineConfig::default()
    };

    let catalog = standard_catalog()?;
    let moves = standard_moves()?;

    println!("Available teams:");
    for team in get_prefab_teams() {
        println!("  {} - {}", team.name, team.description);
    }
    println!();

    let player1 = create_side_from_prefab(
        "storm_team",
        "misty".to_string(),
        "Misty".to_string(),
        GameType::Doubles,
        &catalog,
        &moves,
    )?;
    let player2 = create_side_from_prefab(
        "ember_team",
        "blaine".to_string(),
        "Blaine".to_string(),
        GameType::Doubles,
        &catalog,
        &moves,
    )?;

    let mut battle = BattleState::new(
        "demo",
        GameType::Doubles,
        player1,
        player2,
        Arc::new(moves),
        Arc::new(catalog),
    )
    .with_config(config);

    let (runner, _cancel) = BattleRunner::new(Arc::new(RandomPlayer::new()), Arc::new(RandomPlayer::new()));
    let log = runner.run(&mut battle).await?;

    log.print_formatted(&battle);

    match battle.game_state {
        GameState::Won(side) => println!("\n{} wins!", battle.side(side).player_name),
        GameState::Draw => println!("\nThe battle is a draw."),
        state => println!("\nBattle stopped: {:?}", state),
    }
    Ok(())
}
