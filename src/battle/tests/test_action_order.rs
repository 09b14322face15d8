use crate::battle::action_stack::{ActionStack, BattleAction};
use crate::battle::commands::{execute_command, BattleCommand};
use crate::battle::state::BattleState;
use crate::battle::tests::common::{create_doubles_battle, create_test_battle, TestPokemonBuilder};
use crate::choices::{Choice, MoveChoice, NormalTarget, SlotChoice, SwitchChoice};
use crate::effects::EffectKind;
use crate::pokemon::PokemonRef;
use pretty_assertions::assert_eq;
use schema::SideId;

const MOVES: [&str; 4] = ["tackle", "quickattack", "thunderwave", "swordsdance"];

fn p1(index: usize) -> PokemonRef {
    PokemonRef::new(SideId::P1, index)
}

fn p2(index: usize) -> PokemonRef {
    PokemonRef::new(SideId::P2, index)
}

fn battle_with(pikachu: TestPokemonBuilder, eevee: TestPokemonBuilder) -> BattleState {
    create_test_battle(
        vec![
            pikachu.with_moves(MOVES.to_vec()).build(),
            TestPokemonBuilder::new("Jolteon").build(),
        ],
        vec![eevee.with_moves(MOVES.to_vec()).build()],
    )
}

/// Pikachu at 100 speed against Eevee at 80.
fn battle() -> BattleState {
    battle_with(
        TestPokemonBuilder::new("Pikachu").with_speed(100),
        TestPokemonBuilder::new("Eevee").with_speed(80),
    )
}

fn aimed(battle: &BattleState, attacker: PokemonRef, move_id: &str) -> Choice {
    let foe = PokemonRef::new(attacker.side.foe(), 0);
    Choice::Single(SlotChoice::Move(
        MoveChoice::new(battle, attacker, move_id.into(), false, Some(NormalTarget::Foe(0)), vec![foe]).unwrap(),
    ))
}

fn order(battle: &mut BattleState, choices: Vec<Choice>) -> Vec<PokemonRef> {
    ActionStack::build_initial(battle, choices)
        .unwrap()
        .iter()
        .map(|action| match action {
            BattleAction::Move(choice) => choice.attacker(),
            BattleAction::Switch(choice) => choice.out(),
        })
        .collect()
}

#[test]
fn test_faster_creature_moves_first() {
    let mut battle = battle();
    let choices = vec![aimed(&battle, p2(0), "tackle"), aimed(&battle, p1(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p1(0), p2(0)]);
}

#[test]
fn test_priority_beats_speed() {
    let mut battle = battle();
    let choices = vec![aimed(&battle, p1(0), "tackle"), aimed(&battle, p2(0), "quickattack")];
    assert_eq!(order(&mut battle, choices), vec![p2(0), p1(0)]);
}

#[test]
fn test_switches_go_before_any_move() {
    let mut battle = battle();
    let switch = Choice::Single(SlotChoice::Switch(SwitchChoice::new(&battle, p1(0), p1(1)).unwrap()));
    let choices = vec![aimed(&battle, p2(0), "quickattack"), switch];

    let stack = ActionStack::build_initial(&mut battle, choices).unwrap();
    assert_eq!(stack.len(), 2);
    assert!(matches!(stack.iter().next(), Some(BattleAction::Switch(_))));
}

#[test]
fn test_speed_ties_go_to_player_one() {
    let mut battle = battle_with(
        TestPokemonBuilder::new("Pikachu").with_speed(90),
        TestPokemonBuilder::new("Eevee").with_speed(90),
    );
    // Submission order does not matter.
    let choices = vec![aimed(&battle, p2(0), "tackle"), aimed(&battle, p1(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p1(0), p2(0)]);

    // Nor does the RNG.
    let mut reseeded = battle_with(
        TestPokemonBuilder::new("Pikachu").with_speed(90),
        TestPokemonBuilder::new("Eevee").with_speed(90),
    );
    reseeded.rng = crate::battle::state::TurnRng::seeded(7);
    let choices = vec![aimed(&reseeded, p2(0), "tackle"), aimed(&reseeded, p1(0), "tackle")];
    assert_eq!(order(&mut reseeded, choices), vec![p1(0), p2(0)]);
}

#[test]
fn test_doubles_ties_go_to_the_lower_slot() {
    let mut battle = create_doubles_battle(
        vec![
            TestPokemonBuilder::new("Pikachu").with_speed(90).build(),
            TestPokemonBuilder::new("Eevee").with_speed(90).build(),
        ],
        vec![
            TestPokemonBuilder::new("Charmander").with_speed(90).build(),
            TestPokemonBuilder::new("Squirtle").with_speed(90).build(),
        ],
    );
    let tackle = |battle: &BattleState, attacker: PokemonRef| {
        let foe = PokemonRef::new(attacker.side.foe(), 0);
        SlotChoice::Move(
            MoveChoice::new(battle, attacker, "tackle".into(), false, Some(NormalTarget::Foe(0)), vec![foe]).unwrap(),
        )
    };
    let choices = vec![
        Choice::from_slots(&battle, SideId::P2, vec![tackle(&battle, p2(0)), tackle(&battle, p2(1))]).unwrap(),
        Choice::from_slots(&battle, SideId::P1, vec![tackle(&battle, p1(0)), tackle(&battle, p1(1))]).unwrap(),
    ];
    assert_eq!(order(&mut battle, choices), vec![p1(0), p1(1), p2(0), p2(1)]);
}

#[test]
fn test_prankster_speeds_up_status_moves_only() {
    let mut battle = battle_with(
        TestPokemonBuilder::new("Pikachu").with_speed(100),
        TestPokemonBuilder::new("Eevee").with_speed(80).with_ability("prankster"),
    );

    let choices = vec![aimed(&battle, p1(0), "tackle"), aimed(&battle, p2(0), "thunderwave")];
    assert_eq!(order(&mut battle, choices), vec![p2(0), p1(0)]);

    let choices = vec![aimed(&battle, p1(0), "tackle"), aimed(&battle, p2(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p1(0), p2(0)]);
}

#[test]
fn test_trick_room_reverses_speed() {
    let mut battle = battle();
    execute_command(
        &mut battle,
        BattleCommand::AddFieldEffect {
            effect: "trickroom".into(),
            kind: EffectKind::PseudoWeather,
            source: Some(p2(0)),
            duration: Some(5),
        },
    )
    .unwrap();

    let choices = vec![aimed(&battle, p1(0), "tackle"), aimed(&battle, p2(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p2(0), p1(0)]);

    // Priority still comes first.
    let choices = vec![aimed(&battle, p1(0), "quickattack"), aimed(&battle, p2(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p1(0), p2(0)]);
}

#[test]
fn test_tailwind_doubles_its_side() {
    let mut battle = battle();
    execute_command(
        &mut battle,
        BattleCommand::AddSideCondition {
            side: SideId::P2,
            condition: "tailwind".into(),
            source: Some(p2(0)),
            duration: Some(4),
        },
    )
    .unwrap();

    let choices = vec![aimed(&battle, p1(0), "tackle"), aimed(&battle, p2(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p2(0), p1(0)]);
}

#[test]
fn test_paralysis_and_scarf_change_speed() {
    let mut battle = battle();
    let applied = execute_command(
        &mut battle,
        BattleCommand::SetStatus {
            target: p1(0),
            status: "par".into(),
            source: None,
            duration: None,
        },
    )
    .unwrap();
    assert!(applied);
    let choices = vec![aimed(&battle, p1(0), "tackle"), aimed(&battle, p2(0), "tackle")];
    assert_eq!(order(&mut battle, choices), vec![p2(0), p1(0)]);

    let mut scarfed = battle_with(
        TestPokemonBuilder::new("Pikachu").with_speed(100),
        TestPokemonBuilder::new("Eevee").with_speed(80).with_item("choicescarf"),
    );
    let choices = vec![aimed(&scarfed, p1(0), "tackle"), aimed(&scarfed, p2(0), "tackle")];
    assert_eq!(order(&mut scarfed, choices), vec![p2(0), p1(0)]);
}
