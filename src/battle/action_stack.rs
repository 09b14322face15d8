use std::cmp::Reverse;
use std::collections::VecDeque;

use crate::battle::engine::move_effect_id;
use crate::battle::state::BattleState;
use crate::battle::stats::effective_speed;
use crate::choices::{Choice, MoveChoice, SlotChoice, SwitchChoice};
use crate::errors::DispatchResult;
use crate::events::{catalog_event, run_event, EventKind, RelayValue};
use schema::SideId;
use tracing::debug;

/// Executable actions for one turn, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleAction {
    Switch(SwitchChoice),
    Move(MoveChoice),
}

impl BattleAction {
    pub fn side(&self) -> SideId {
        match self {
            BattleAction::Switch(choice) => choice.out().side,
            BattleAction::Move(choice) => choice.attacker().side,
        }
    }
}

#[derive(Debug, Default)]
pub struct ActionStack {
    actions: VecDeque<BattleAction>,
}

// Sort data for one action.
#[derive(Debug, Clone, Copy)]
struct ActionPriority {
    action_priority: i8, // Switch: 6, Move: 0
    move_priority: i32,
    speed: u32,
    side: SideId,
    slot: usize,
}

impl ActionPriority {
    fn key(&self) -> (Reverse<i8>, Reverse<i32>, Reverse<u32>, SideId, usize) {
        (
            Reverse(self.action_priority),
            Reverse(self.move_priority),
            Reverse(self.speed),
            self.side,
            self.slot,
        )
    }
}

impl ActionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders both sides' choices: switches before moves, then move
    /// priority, then effective speed. Remaining ties go to P1 and the
    /// lower slot, so ordering never depends on the RNG.
    pub fn build_initial(battle: &mut BattleState, choices: Vec<Choice>) -> DispatchResult<Self> {
        let mut prioritized = Vec::new();
        for choice in &choices {
            for slot_choice in choice.slot_choices() {
                let action = match slot_choice {
                    SlotChoice::Move(choice) => BattleAction::Move(choice.clone()),
                    SlotChoice::Switch(choice) => BattleAction::Switch(*choice),
                    SlotChoice::Pass { .. } => continue,
                };
                let priority = calculate_action_priority(battle, &action, slot_choice.slot())?;
                prioritized.push((priority, action));
            }
        }
        prioritized.sort_by_key(|(priority, _)| priority.key());

        let mut stack = Self::new();
        for (priority, action) in prioritized {
            debug!(
                side = %priority.side,
                slot = priority.slot,
                move_priority = priority.move_priority,
                speed = priority.speed,
                "queued action"
            );
            stack.push_back(action);
        }
        Ok(stack)
    }

    pub fn push_back(&mut self, action: BattleAction) {
        self.actions.push_back(action);
    }

    /// Used for actions injected mid-turn.
    pub fn push_front(&mut self, action: BattleAction) {
        self.actions.push_front(action);
    }

    pub fn pop_front(&mut self) -> Option<BattleAction> {
        self.actions.pop_front()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleAction> {
        self.actions.iter()
    }
}

fn calculate_action_priority(
    battle: &mut BattleState,
    action: &BattleAction,
    slot: usize,
) -> DispatchResult<ActionPriority> {
    match action {
        BattleAction::Switch(choice) => Ok(ActionPriority {
            action_priority: 6,
            move_priority: 0,
            speed: 0,
            side: choice.out().side,
            slot,
        }),
        BattleAction::Move(choice) => {
            let attacker = choice.attacker();
            let (base, effect) = match battle.moves.get(choice.move_id()) {
                Some(data) => (i32::from(data.priority), data.effect.clone()),
                None => (0, None),
            };
            let move_effect = move_effect_id(choice.move_id());

            // The move's own hook first, then whatever is attached.
            let mut relay = RelayValue::Int(base);
            if let Some(effect) = &effect {
                relay = catalog_event(battle, EventKind::ModifyPriority, effect, attacker, relay)?;
            }
            let relay = run_event(
                battle,
                EventKind::ModifyPriority,
                attacker,
                Some(attacker),
                Some(&move_effect),
                relay,
            )?;

            Ok(ActionPriority {
                action_priority: 0,
                move_priority: relay.as_int().unwrap_or(base),
                speed: effective_speed(battle, attacker)?,
                side: attacker.side,
                slot,
            })
        }
    }
}
