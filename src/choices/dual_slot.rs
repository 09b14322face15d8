use super::SlotChoice;
use crate::battle::state::BattleState;
use crate::errors::{ChoiceError, ChoiceResult};
use schema::SideId;
use serde::Serialize;

/// Both slots' choices for one side in a multi-active format.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DualSlotChoice {
    side: SideId,
    first: SlotChoice,
    second: SlotChoice,
}

impl DualSlotChoice {
    pub fn new(battle: &BattleState, side: SideId, first: SlotChoice, second: SlotChoice) -> ChoiceResult<Self> {
        if !battle.game_type.is_multi_active() {
            return Err(ChoiceError::NotMultiActive(battle.game_type));
        }
        for choice in [&first, &second] {
            if choice.side() != side {
                return Err(ChoiceError::SlotSideMismatch {
                    expected: side,
                    found: choice.side(),
                });
            }
        }

        check_conflicts(&first, &second)?;

        for (expected, choice) in [(0, &first), (1, &second)] {
            if choice.slot() != expected {
                return Err(ChoiceError::SlotOrder {
                    expected,
                    found: choice.slot(),
                });
            }
        }

        Ok(Self { side, first, second })
    }

    pub fn side(&self) -> SideId {
        self.side
    }

    pub fn first(&self) -> &SlotChoice {
        &self.first
    }

    pub fn second(&self) -> &SlotChoice {
        &self.second
    }

    pub fn slots(&self) -> [&SlotChoice; 2] {
        [&self.first, &self.second]
    }
}

fn check_conflicts(a: &SlotChoice, b: &SlotChoice) -> ChoiceResult<()> {
    use SlotChoice::{Move, Switch};

    match (a, b) {
        (Move(x), Move(y)) if x.attacker() == y.attacker() => Err(ChoiceError::DuplicateMover(x.attacker())),
        (Switch(x), Switch(y)) => {
            if x.out() == y.out() {
                Err(ChoiceError::DoubleSwitchOut(x.out()))
            } else if x.into_pokemon() == y.into_pokemon() {
                Err(ChoiceError::DoubleSwitchIn(x.into_pokemon()))
            } else if x.out() == y.into_pokemon() {
                Err(ChoiceError::SwitchOutAndIn(x.out()))
            } else if y.out() == x.into_pokemon() {
                Err(ChoiceError::SwitchOutAndIn(y.out()))
            } else {
                Ok(())
            }
        }
        (Move(m), Switch(s)) | (Switch(s), Move(m)) => {
            let mover = m.attacker();
            if mover == s.out() || mover == s.into_pokemon() {
                Err(ChoiceError::MoverSwitched(mover))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}
