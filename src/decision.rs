//! The boundary where the engine waits on players.
//!
//! The engine never blocks on input. It publishes a [`Request`] per side,
//! and a [`DecisionSource`] answers it asynchronously. [`BattleRunner`]
//! drives a battle to completion, applying the configured timeout and
//! cancellation policy to every pending decision.

use crate::battle::engine;
use crate::battle::state::{BattleEvent, BattleState, EventBus, GameState};
use crate::choices::{can_terastallize, team_preview_size, Choice};
use crate::config::CancelPolicy;
use crate::effects::EffectId;
use crate::errors::{BattleResult, DecisionError};
use crate::moves::MoveId;
use crate::pokemon::PokemonRef;
use async_trait::async_trait;
use schema::{MoveTarget, SideId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PokemonSnapshot {
    pub pokemon: PokemonRef,
    pub name: String,
    pub species: String,
    pub level: u8,
    pub current_hp: u16,
    pub max_hp: u16,
    pub fainted: bool,
    pub active_slot: Option<usize>,
    pub status: Option<EffectId>,
}

/// What a side can see of its own team.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SideSnapshot {
    pub id: SideId,
    pub player_name: String,
    pub pokemon: Vec<PokemonSnapshot>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveOption {
    pub move_id: MoveId,
    pub name: String,
    pub pp: u8,
    pub max_pp: u8,
    pub disabled: bool,
    pub target: MoveTarget,
}

/// One active creature awaiting a move or switch.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ActiveRequest {
    pub pokemon: PokemonRef,
    pub slot: usize,
    pub moves: Vec<MoveOption>,
    pub can_terastallize: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Request {
    TeamPreview {
        side: SideSnapshot,
        team_size: usize,
    },
    Move {
        side: SideSnapshot,
        active: Vec<ActiveRequest>,
    },
    /// `force_switch[slot]` is set for every slot that must be refilled.
    ForceSwitch {
        side: SideSnapshot,
        force_switch: Vec<bool>,
    },
    Wait {
        side: SideSnapshot,
    },
}

impl Request {
    pub fn side(&self) -> SideId {
        self.snapshot().id
    }

    pub fn snapshot(&self) -> &SideSnapshot {
        match self {
            Request::TeamPreview { side, .. }
            | Request::Move { side, .. }
            | Request::ForceSwitch { side, .. }
            | Request::Wait { side } => side,
        }
    }

    /// Whether this side has to answer at all.
    pub fn needs_choice(&self) -> bool {
        !matches!(self, Request::Wait { .. })
    }
}

fn snapshot(battle: &BattleState, side: SideId) -> SideSnapshot {
    let team = battle.side(side);
    SideSnapshot {
        id: side,
        player_name: team.player_name.clone(),
        pokemon: team
            .roster
            .iter()
            .enumerate()
            .map(|(index, p)| PokemonSnapshot {
                pokemon: PokemonRef::new(side, index),
                name: p.name.clone(),
                species: p.species.clone(),
                level: p.level,
                current_hp: p.current_hp,
                max_hp: p.max_hp(),
                fainted: p.is_fainted(),
                active_slot: team.slot_of(index),
                status: p.status.as_ref().map(|s| s.id.clone()),
            })
            .collect(),
    }
}

/// The request `side` must answer in the battle's current state.
pub fn build_request(battle: &BattleState, side: SideId) -> Request {
    let snapshot = snapshot(battle, side);
    match battle.game_state {
        GameState::TeamPreview => Request::TeamPreview {
            side: snapshot,
            team_size: team_preview_size(battle, side),
        },
        GameState::WaitingForActions => {
            let active = battle
                .side(side)
                .active_refs()
                .into_iter()
                .filter_map(|pokemon| {
                    let inst = battle.pokemon(pokemon).filter(|p| !p.is_fainted())?;
                    Some(ActiveRequest {
                        pokemon,
                        slot: battle.slot_of(pokemon)?,
                        moves: inst
                            .moves
                            .iter()
                            .map(|slot| {
                                let data = battle.moves.get(&slot.id);
                                MoveOption {
                                    move_id: slot.id.clone(),
                                    name: battle.move_name(&slot.id),
                                    pp: slot.pp,
                                    max_pp: slot.max_pp,
                                    disabled: slot.disabled,
                                    target: data.map_or(MoveTarget::Normal, |d| d.target),
                                }
                            })
                            .collect(),
                        can_terastallize: can_terastallize(battle, pokemon),
                    })
                })
                .collect();
            Request::Move {
                side: snapshot,
                active,
            }
        }
        GameState::WaitingForSwitches => {
            let force_switch = battle.side(side).slots_needing_switch();
            if force_switch.iter().any(|needed| *needed) {
                Request::ForceSwitch {
                    side: snapshot,
                    force_switch,
                }
            } else {
                Request::Wait { side: snapshot }
            }
        }
        _ => Request::Wait { side: snapshot },
    }
}

/// Both sides' requests, P1 first.
pub fn build_requests(battle: &BattleState) -> [Request; 2] {
    [build_request(battle, SideId::P1), build_request(battle, SideId::P2)]
}

/// Anything that can answer a request: a player's client, an AI, a script.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Produce a choice for `request`. The battle is a read-only view of
    /// the board the choice will be validated against.
    async fn choose(&self, request: &Request, battle: &BattleState) -> Result<Choice, DecisionError>;
}

/// Lets another task stop a running battle's pending decisions.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // No receivers just means nothing is waiting.
        let _ = self.sender.send(true);
    }
}

/// Resolves once cancellation is signalled. A dropped handle never cancels.
async fn cancelled(mut receiver: watch::Receiver<bool>) {
    loop {
        if *receiver.borrow_and_update() {
            return;
        }
        if receiver.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Awaits one decision under the battle's timeout and cancellation.
pub async fn await_choice(
    source: &dyn DecisionSource,
    request: &Request,
    battle: &BattleState,
    cancel: watch::Receiver<bool>,
) -> Result<Choice, DecisionError> {
    let side = request.side();
    let timeout = battle.config.decision_timeout();
    // A ready answer beats a cancel raised in the same poll.
    tokio::select! {
        biased;
        answer = tokio::time::timeout(timeout, source.choose(request, battle)) => match answer {
            Ok(result) => result,
            Err(_) => Err(DecisionError::TimedOut {
                side,
                after_ms: battle.config.decision_timeout_ms,
            }),
        },
        _ = cancelled(cancel) => Err(DecisionError::Cancelled(side)),
    }
}

/// What the runner does with one side's request.
enum Resolution {
    Chosen(Choice),
    Substituted(Choice),
    Forfeit,
}

/// Drives a battle from its current state to the end.
pub struct BattleRunner {
    sources: [Arc<dyn DecisionSource>; 2],
    cancel: watch::Receiver<bool>,
}

impl BattleRunner {
    pub fn new(player1: Arc<dyn DecisionSource>, player2: Arc<dyn DecisionSource>) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        let runner = Self {
            sources: [player1, player2],
            cancel: receiver,
        };
        (
            runner,
            CancelHandle {
                sender: Arc::new(sender),
            },
        )
    }

    /// Runs until the battle is won, drawn or aborted. Returns everything
    /// that was logged along the way.
    pub async fn run(&self, battle: &mut BattleState) -> BattleResult<EventBus> {
        let mut log = EventBus::new();
        if !battle.started {
            log.extend(engine::start_battle(battle)?);
        }

        while !battle.game_state.is_finished() {
            let requests = build_requests(battle);
            let view: &BattleState = battle;
            let (first, second) = tokio::join!(self.resolve(&requests[0], view), self.resolve(&requests[1], view));

            for (request, resolution) in requests.iter().zip([first, second]) {
                let side = request.side();
                match resolution {
                    None => {}
                    Some(Resolution::Chosen(choice)) => engine::submit_choice(battle, choice)?,
                    Some(Resolution::Substituted(choice)) => {
                        battle.log_event(BattleEvent::ChoiceSubstituted { side })?;
                        engine::submit_choice(battle, choice)?;
                    }
                    Some(Resolution::Forfeit) => {
                        log.extend(engine::forfeit(battle, side)?);
                        return Ok(log);
                    }
                }
            }
            log.extend(engine::advance(battle)?);
        }

        info!(state = ?battle.game_state, turns = battle.turn_number, "battle finished");
        Ok(log)
    }

    async fn resolve(&self, request: &Request, battle: &BattleState) -> Option<Resolution> {
        if !request.needs_choice() {
            return None;
        }
        let side = request.side();
        let source = self.sources[side.index()].as_ref();

        let failure = match self.attempt(source, request, battle).await {
            Ok(choice) => return Some(Resolution::Chosen(choice)),
            Err(failure) => failure,
        };

        warn!(%side, error = %failure, policy = ?battle.config.on_cancel, "decision failed");
        match battle.config.on_cancel {
            CancelPolicy::Abort => Some(Resolution::Forfeit),
            CancelPolicy::SubstituteDefault => match Choice::default_for(request, battle) {
                Ok(choice) => Some(Resolution::Substituted(choice)),
                Err(e) => {
                    warn!(%side, error = %e, "no default choice available");
                    Some(Resolution::Forfeit)
                }
            },
        }
    }

    /// Asks `source` until it gives a choice that answers `request`, up to
    /// the configured number of attempts.
    async fn attempt(
        &self,
        source: &dyn DecisionSource,
        request: &Request,
        battle: &BattleState,
    ) -> Result<Choice, DecisionError> {
        let side = request.side();
        let attempts = battle.config.max_choice_attempts;
        for attempt in 1..=attempts {
            let choice = await_choice(source, request, battle, self.cancel.clone()).await?;
            match choice.check_answers(request) {
                Ok(()) => return Ok(choice),
                Err(e) => warn!(%side, attempt, error = %e, "choice rejected"),
            }
        }
        Err(DecisionError::TooManyRejections { side, attempts })
    }
}
