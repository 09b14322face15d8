use crate::battle::state::{BattleState, GameState, TurnRng};
use crate::effects::EffectRegistry;
use crate::moves::{MoveId, MoveLibrary};
use crate::pokemon::{MoveSlot, PokemonInst};
use crate::prefab_effects::standard_catalog;
use crate::prefab_teams::standard_moves;
use crate::side::Side;
use schema::{GameType, PokemonType, SideId, StatTable};
use std::fmt::Display;
use std::sync::Arc;

/// A builder for creating test Pokemon instances with common defaults:
/// level 50, 100 HP, 50 in every other stat, Normal type, and Tackle.
///
/// # Example
/// ```ignore
/// let pokemon = TestPokemonBuilder::new("Pikachu")
///     .with_types(vec![PokemonType::Electric])
///     .with_moves(vec!["thunderbolt", "quickattack"])
///     .with_speed(120)
///     .build();
/// ```
pub struct TestPokemonBuilder {
    name: String,
    level: u8,
    types: Vec<PokemonType>,
    stats: StatTable,
    moves: Vec<String>,
    current_hp: Option<u16>,
    ability: Option<String>,
    item: Option<String>,
    tera_type: Option<PokemonType>,
}

impl TestPokemonBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            level: 50,
            types: vec![PokemonType::Normal],
            stats: StatTable::new(100, 50, 50, 50, 50, 50),
            moves: vec!["tackle".to_string()],
            current_hp: None,
            ability: None,
            item: None,
            tera_type: None,
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_types(mut self, types: Vec<PokemonType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_speed(mut self, speed: u16) -> Self {
        self.stats.speed = speed;
        self
    }

    pub fn with_stats(mut self, stats: StatTable) -> Self {
        self.stats = stats;
        self
    }

    /// Move ids from the bundled library.
    pub fn with_moves(mut self, moves: Vec<&str>) -> Self {
        self.moves = moves.into_iter().map(str::to_string).collect();
        self
    }

    /// Sets the current HP for the test Pokemon. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u16) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn with_ability(mut self, ability: &str) -> Self {
        self.ability = Some(ability.to_string());
        self
    }

    pub fn with_item(mut self, item: &str) -> Self {
        self.item = Some(item.to_string());
        self
    }

    pub fn with_tera(mut self, tera_type: PokemonType) -> Self {
        self.tera_type = Some(tera_type);
        self
    }

    /// Builds the `PokemonInst`. Panics on a move, ability or item the
    /// standard data does not know.
    pub fn build(self) -> PokemonInst {
        let library = test_moves();
        let moves = self
            .moves
            .iter()
            .map(|id| {
                let id = MoveId::new(id.as_str());
                let pp = match library.get(&id) {
                    Some(data) => data.pp,
                    None => panic!("Unknown test move {}", id),
                };
                MoveSlot::new(id, pp)
            })
            .collect();

        let mut pokemon = PokemonInst::new(
            self.name.as_str(),
            self.name.to_lowercase(),
            self.level,
            self.types,
            self.stats,
            moves,
        );
        pokemon.tera_type = self.tera_type;
        if let Some(hp) = self.current_hp {
            pokemon.set_hp(hp);
        }

        let registry = test_registry();
        if let Some(ability) = self.ability {
            pokemon.ability = Some(assert_ok(crate::effects::EffectCatalog::instantiate(
                &registry,
                &ability.as_str().into(),
                crate::effects::EffectKind::Ability,
            )));
        }
        if let Some(item) = self.item {
            pokemon.item = Some(assert_ok(crate::effects::EffectCatalog::instantiate(
                &registry,
                &item.as_str().into(),
                crate::effects::EffectKind::Item,
            )));
        }
        pokemon
    }
}

pub fn test_moves() -> MoveLibrary {
    assert_ok(standard_moves())
}

pub fn test_registry() -> EffectRegistry {
    assert_ok(standard_catalog())
}

/// Creates a `TurnRng` instance with a long list of default values (50).
/// Useful for tests where the specific RNG outcome is not important.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![50; 100])
}

/// A battle already past team preview: leads in roster order, start
/// announcements skipped, log empty, rolls pinned to 50.
pub fn create_battle(game_type: GameType, p1: Vec<PokemonInst>, p2: Vec<PokemonInst>) -> BattleState {
    crate::logging::init_for_tests();
    let slots = game_type.active_slots();
    let player1 = Side::new(SideId::P1, "p1", "Player 1", p1, slots);
    let player2 = Side::new(SideId::P2, "p2", "Player 2", p2, slots);

    let mut battle = BattleState::new(
        "test_battle",
        game_type,
        player1,
        player2,
        Arc::new(test_moves()),
        Arc::new(test_registry()),
    )
    .with_rng(predictable_rng());

    for side in &mut battle.sides {
        for slot in 0..slots.min(side.roster.len()) {
            side.active[slot] = Some(slot);
            side.roster[slot].position = Some(slot);
        }
    }
    battle.started = true;
    battle.game_state = GameState::WaitingForActions;
    battle.drain_log();
    battle
}

/// Creates a singles battle for testing.
pub fn create_test_battle(p1: Vec<PokemonInst>, p2: Vec<PokemonInst>) -> BattleState {
    create_battle(GameType::Singles, p1, p2)
}

pub fn create_doubles_battle(p1: Vec<PokemonInst>, p2: Vec<PokemonInst>) -> BattleState {
    create_battle(GameType::Doubles, p1, p2)
}

/// Helper function to assert that a Result is Ok and return the value.
/// Provides clear error messages in tests when functions unexpectedly fail.
pub fn assert_ok<T, E: Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}

/// Helper function to assert that a boolean Result is Ok and true.
pub fn assert_ok_true<E: Display>(result: Result<bool, E>) -> bool {
    let value = assert_ok(result);
    assert!(value, "Expected true but got false");
    value
}

/// Helper function to assert that a boolean Result is Ok and false.
pub fn assert_ok_false<E: Display>(result: Result<bool, E>) -> bool {
    let value = assert_ok(result);
    assert!(!value, "Expected false but got true");
    value
}
