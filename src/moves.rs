use crate::effects::{EffectId, EffectKind};
use crate::errors::BattleStateError;
use crate::events::Secondary;
use schema::{MoveCategory, MoveTarget, PokemonType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

pub const STRUGGLE: &str = "struggle";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MoveId(String);

impl MoveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn struggle() -> Self {
        Self::new(STRUGGLE)
    }

    pub fn is_struggle(&self) -> bool {
        self.0 == STRUGGLE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MoveId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An effect a status move puts on its target, its user's side, or the field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Inflict {
    pub effect: EffectId,
    pub kind: EffectKind,
    pub duration: Option<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveData {
    pub id: MoveId,
    pub name: String,
    pub move_type: PokemonType,
    pub category: MoveCategory,
    pub base_power: u16,
    /// `None` never misses.
    pub accuracy: Option<u8>,
    pub pp: u8,
    #[serde(default)]
    pub priority: i8,
    pub target: MoveTarget,
    #[serde(default)]
    pub secondaries: Vec<Secondary>,
    #[serde(default)]
    pub inflicts: Option<Inflict>,
    /// Handler table attached as the active move while this move executes.
    #[serde(default)]
    pub effect: Option<EffectId>,
}

impl MoveData {
    pub fn struggle() -> Self {
        Self {
            id: MoveId::struggle(),
            name: "Struggle".to_string(),
            move_type: PokemonType::Typeless,
            category: MoveCategory::Physical,
            base_power: 50,
            accuracy: None,
            pp: 1,
            priority: 0,
            target: MoveTarget::RandomNormal,
            secondaries: Vec::new(),
            inflicts: None,
            effect: None,
        }
    }
}

/// The moves a battle knows about. Struggle is always present.
#[derive(Debug, Clone)]
pub struct MoveLibrary {
    moves: HashMap<MoveId, MoveData>,
}

impl Default for MoveLibrary {
    fn default() -> Self {
        let mut moves = HashMap::new();
        moves.insert(MoveId::struggle(), MoveData::struggle());
        Self { moves }
    }
}

impl MoveLibrary {
    pub fn new(moves: Vec<MoveData>) -> Self {
        let mut library = Self::default();
        for data in moves {
            library.insert(data);
        }
        library
    }

    pub fn insert(&mut self, data: MoveData) {
        self.moves.insert(data.id.clone(), data);
    }

    pub fn get(&self, id: &MoveId) -> Option<&MoveData> {
        self.moves.get(id)
    }

    pub fn contains(&self, id: &MoveId) -> bool {
        self.moves.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Parses a RON list of move entries.
    pub fn from_ron_str(text: &str) -> Result<Self, BattleStateError> {
        let moves: Vec<MoveData> =
            ron::from_str(text).map_err(|e| BattleStateError::MalformedMoveData(e.to_string()))?;
        Ok(Self::new(moves))
    }

    pub fn load(path: &Path) -> Result<Self, BattleStateError> {
        let text = fs::read_to_string(path).map_err(|e| {
            BattleStateError::MalformedMoveData(format!("{}: {}", path.display(), e))
        })?;
        Self::from_ron_str(&text)
    }
}
