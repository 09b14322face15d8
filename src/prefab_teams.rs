use crate::effects::{EffectCatalog, EffectId, EffectKind};
use crate::errors::BattleStateError;
use crate::moves::{MoveId, MoveLibrary};
use crate::pokemon::{MoveSlot, PokemonInst};
use crate::prefab_effects::standard_catalog;
use crate::side::Side;
use schema::{GameType, PokemonType, SideId, StatTable};
use serde::{Deserialize, Serialize};

const MOVES_RON: &str = include_str!("../data/moves.ron");

/// The bundled move library the prefab teams draw from.
pub fn standard_moves() -> Result<MoveLibrary, BattleStateError> {
    MoveLibrary::from_ron_str(MOVES_RON)
}

/// A predefined team configuration for demo battles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabTeam {
    pub id: String,
    pub name: String,
    pub description: String,
    pub pokemon: Vec<PrefabPokemon>,
}

/// A predefined Pokemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabPokemon {
    pub name: String,
    pub level: u8,
    pub types: Vec<PokemonType>,
    pub stats: StatTable,
    pub moves: Vec<String>,
    pub ability: Option<String>,
    pub item: Option<String>,
    pub tera_type: Option<PokemonType>,
}

impl PrefabPokemon {
    fn new(name: &str, types: &[PokemonType], stats: [u16; 6], moves: [&str; 4]) -> Self {
        let [hp, attack, defense, special_attack, special_defense, speed] = stats;
        Self {
            name: name.to_string(),
            level: 60,
            types: types.to_vec(),
            stats: StatTable::new(hp, attack, defense, special_attack, special_defense, speed),
            moves: moves.iter().map(|m| m.to_string()).collect(),
            ability: None,
            item: None,
            tera_type: None,
        }
    }

    fn ability(mut self, ability: &str) -> Self {
        self.ability = Some(ability.to_string());
        self
    }

    fn item(mut self, item: &str) -> Self {
        self.item = Some(item.to_string());
        self
    }

    fn tera(mut self, tera_type: PokemonType) -> Self {
        self.tera_type = Some(tera_type);
        self
    }

    /// Builds a battle-ready creature, with its ability and item instantiated
    /// from `catalog`.
    pub fn to_pokemon(&self, catalog: &dyn EffectCatalog, moves: &MoveLibrary) -> Result<PokemonInst, BattleStateError> {
        let slots = self
            .moves
            .iter()
            .map(|id| {
                let id = MoveId::new(id.as_str());
                match moves.get(&id) {
                    Some(data) => Ok(MoveSlot::new(id, data.pp)),
                    None => Err(BattleStateError::UnknownMove(id)),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut pokemon = PokemonInst::new(
            self.name.as_str(),
            self.name.to_lowercase(),
            self.level,
            self.types.clone(),
            self.stats,
            slots,
        );
        pokemon.tera_type = self.tera_type;
        if let Some(ability) = &self.ability {
            pokemon.ability = Some(catalog.instantiate(&EffectId::new(ability.as_str()), EffectKind::Ability)?);
        }
        if let Some(item) = &self.item {
            pokemon.item = Some(catalog.instantiate(&EffectId::new(item.as_str()), EffectKind::Item)?);
        }
        Ok(pokemon)
    }
}

/// Get all available prefab teams
pub fn get_prefab_teams() -> Vec<PrefabTeam> {
    use PokemonType::*;

    vec![
        PrefabTeam {
            id: "storm_team".to_string(),
            name: "Storm Team".to_string(),
            description: "Rain-fed Water attackers backed by Lightning Rod and Intimidate".to_string(),
            pokemon: vec![
                PrefabPokemon::new("Pelipper", &[Water, Flying], [150, 70, 120, 115, 90, 85], ["surf", "raindance", "wingattack", "protect"])
                    .item("leftovers"),
                PrefabPokemon::new("Raichu", &[Electric], [120, 95, 60, 95, 85, 115], ["thunderbolt", "quickattack", "thunderwave", "protect"])
                    .ability("lightningrod")
                    .item("lifeorb")
                    .tera(Electric),
                PrefabPokemon::new("Gyarados", &[Water, Flying], [155, 130, 85, 65, 105, 88], ["bodyslam", "earthquake", "tailwind", "protect"])
                    .ability("intimidate"),
                PrefabPokemon::new("Togekiss", &[Fairy, Flying], [140, 55, 100, 125, 120, 85], ["wingattack", "bodyslam", "helpinghand", "wish"])
                    .ability("serenegrace")
                    .item("leftovers"),
                PrefabPokemon::new("Ludicolo", &[Water, Grass], [140, 75, 75, 95, 105, 75], ["surf", "sleeppowder", "raindance", "protect"])
                    .tera(Grass),
                PrefabPokemon::new("Lanturn", &[Water, Electric], [185, 65, 65, 80, 80, 72], ["thunderbolt", "surf", "confuseray", "healbell"])
                    .item("leftovers"),
            ],
        },
        PrefabTeam {
            id: "ember_team".to_string(),
            name: "Ember Team".to_string(),
            description: "Sandstorm, burns and Trick Room around a hard-hitting Dragonite".to_string(),
            pokemon: vec![
                PrefabPokemon::new("Arcanine", &[Fire], [150, 115, 85, 105, 85, 100], ["ember", "bodyslam", "willowisp", "quickattack"])
                    .ability("intimidate")
                    .tera(Fire),
                PrefabPokemon::new("Tyranitar", &[Rock, Dark], [165, 139, 115, 100, 105, 66], ["rockslide", "earthquake", "sandstorm", "protect"])
                    .item("leftovers"),
                PrefabPokemon::new("Sableye", &[Dark, Ghost], [110, 80, 80, 70, 70, 55], ["willowisp", "confuseray", "reflect", "wish"])
                    .ability("prankster"),
                PrefabPokemon::new("Dragonite", &[Dragon, Flying], [156, 139, 100, 105, 105, 85], ["outrage", "earthquake", "wingattack", "tailwind"])
                    .item("choicescarf")
                    .tera(Normal),
                PrefabPokemon::new("Excadrill", &[Ground, Steel], [165, 140, 65, 55, 70, 93], ["earthquake", "rockslide", "swordsdance", "protect"])
                    .item("lifeorb"),
                PrefabPokemon::new("Bronzong", &[Steel, Psychic], [130, 94, 121, 84, 121, 43], ["trickroom", "safeguard", "reflect", "bodyslam"])
                    .ability("levitate"),
            ],
        },
        PrefabTeam {
            id: "volt_team".to_string(),
            name: "Volt Team".to_string(),
            description: "Fast Electric pressure with hazards and team support".to_string(),
            pokemon: vec![
                PrefabPokemon::new("Jolteon", &[Electric], [130, 70, 65, 115, 100, 135], ["thunderbolt", "quickattack", "thunderwave", "helpinghand"])
                    .item("choicescarf"),
                PrefabPokemon::new("Rotom", &[Electric, Ghost], [110, 55, 110, 100, 110, 91], ["thunderbolt", "willowisp", "confuseray", "toxic"])
                    .ability("levitate"),
                PrefabPokemon::new("Hitmontop", &[Fighting], [125, 100, 100, 40, 115, 75], ["coaching", "mefirst", "quickattack", "rockslide"])
                    .ability("intimidate"),
                PrefabPokemon::new("Clefable", &[Fairy], [170, 75, 78, 100, 95, 65], ["bodyslam", "wish", "healbell", "thunderwave"])
                    .ability("serenegrace")
                    .item("leftovers"),
                PrefabPokemon::new("Garchomp", &[Dragon, Ground], [168, 135, 100, 85, 90, 107], ["outrage", "earthquake", "rockslide", "swordsdance"])
                    .item("lifeorb")
                    .tera(Ground),
                PrefabPokemon::new("Forretress", &[Bug, Steel], [135, 95, 145, 65, 65, 45], ["spikes", "bodyslam", "protect", "acupressure"]),
            ],
        },
    ]
}

/// Get a specific prefab team by ID
pub fn get_prefab_team(team_id: &str) -> Option<PrefabTeam> {
    get_prefab_teams().into_iter().find(|team| team.id == team_id)
}

/// Create a battle side from a prefab team. Doubles sides bring only the
/// first four members.
pub fn create_side_from_prefab(
    team_id: &str,
    player_id: String,
    player_name: String,
    game_type: GameType,
    catalog: &dyn EffectCatalog,
    moves: &MoveLibrary,
) -> Result<Side, String> {
    let team = get_prefab_team(team_id).ok_or_else(|| format!("Prefab team '{}' not found", team_id))?;

    let roster = team
        .pokemon
        .iter()
        .take(game_type.team_size())
        .map(|member| member.to_pokemon(catalog, moves))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Team '{}': {}", team_id, e))?;

    // The battle assigns the real side id when it is constructed.
    Ok(Side::new(SideId::P1, player_id, player_name, roster, game_type.active_slots()))
}

/// Validate that all prefab teams are properly configured
pub fn validate_prefab_teams() -> Result<(), String> {
    let teams = get_prefab_teams();
    if teams.is_empty() {
        return Err("No prefab teams defined".to_string());
    }

    let moves = standard_moves().map_err(|e| e.to_string())?;
    let catalog = standard_catalog().map_err(|e| e.to_string())?;

    for team in &teams {
        if team.pokemon.len() < GameType::Singles.team_size() {
            return Err(format!("Team '{}' has fewer than 6 Pokemon", team.id));
        }

        for (i, pokemon) in team.pokemon.iter().enumerate() {
            if pokemon.level == 0 || pokemon.level > 100 {
                return Err(format!("Team '{}' Pokemon {} has invalid level {}", team.id, i, pokemon.level));
            }
            if pokemon.moves.is_empty() || pokemon.moves.len() > 4 {
                return Err(format!("Team '{}' Pokemon {} must know 1 to 4 moves", team.id, i));
            }
            pokemon
                .to_pokemon(&catalog, &moves)
                .map_err(|e| format!("Team '{}' Pokemon {}: {}", team.id, i, e))?;
        }
    }

    Ok(())
}
