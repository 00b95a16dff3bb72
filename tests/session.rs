use std::collections::HashSet;

use physica::flashcards::{
    normalize_flashcards_session_summary, CardTransition, FixedSeed, FlashcardItem, FlashcardsSessionSummary,
    ManualClock, SessionEffect, SessionEngine, SessionEvent, SessionKey, MOUNT_LOCK_MS, POST_TRANSITION_LOCK_MS,
};
use pretty_assertions::assert_eq;

fn deck(ids: &[&str]) -> Vec<FlashcardItem> {
    ids.iter()
        .map(|id| FlashcardItem {
            id: id.to_string(),
            question: format!("question {}", id),
            answer: format!("answer {}", id),
            topic_slug: "calc/limits".to_string(),
            course_slug: "calc".to_string(),
        })
        .collect()
}

fn mounted(ids: &[&str], seed: u32) -> (SessionEngine<ManualClock>, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let engine = SessionEngine::new(deck(ids), clock.clone(), &FixedSeed(seed));
    clock.advance(MOUNT_LOCK_MS);
    (engine, clock)
}

fn swipe(engine: &mut SessionEngine<ManualClock>, offset: f64) -> Vec<SessionEffect> {
    let mut effects = engine.handle(SessionEvent::DragStart);
    effects.extend(engine.handle(SessionEvent::DragUpdate { offset }));
    effects.extend(engine.handle(SessionEvent::DragEnd { offset, velocity: 0.0 }));
    effects
}

/// Settles a started exit animation and returns everything the commit emitted.
fn settle(engine: &mut SessionEngine<ManualClock>, effects: &[SessionEffect]) -> Vec<SessionEffect> {
    assert!(
        effects
            .iter()
            .any(|effect| matches!(effect, SessionEffect::ExitAnimation { .. })),
        "expected an exit animation in {:?}",
        effects
    );
    engine.handle(SessionEvent::AnimationSettled)
}

fn completions(effects: &[SessionEffect]) -> Vec<FlashcardsSessionSummary> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            SessionEffect::Completed { summary } => Some(summary.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn left_swipe_discards_without_flip() {
    let (mut engine, _clock) = mounted(&["c1", "c2", "c3"], 11);
    let mut discarded = Vec::new();
    let mut emitted = Vec::new();

    while let Some(card) = engine.current_card() {
        discarded.push(card.id.clone());
        let effects = swipe(&mut engine, -140.0);
        emitted.extend(settle(&mut engine, &effects));
    }

    let summaries = completions(&emitted);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].pass_ids, discarded);
    assert!(summaries[0].confirm_ids.is_empty());
}

#[test]
fn first_right_swipe_reveals_then_confirms() {
    let (mut engine, _clock) = mounted(&["c1", "c2", "c3"], 5);
    let first = engine.current_card().unwrap().id.clone();

    let reveal = swipe(&mut engine, 120.0);
    assert!(reveal.contains(&SessionEffect::Flipped { flipped: true }));
    assert!(reveal.contains(&SessionEffect::SpringBack));
    assert!(engine.is_flipped());
    assert_eq!(engine.remaining(), 3);
    assert_eq!(engine.transition(), CardTransition::Idle);

    let confirm = swipe(&mut engine, 120.0);
    assert!(confirm.contains(&SessionEffect::ExitAnimation {
        card_id: first.clone(),
        transition: CardTransition::Correct,
        x: 420.0,
        duration_ms: 320,
    }));
    let committed = settle(&mut engine, &confirm);
    assert_eq!(
        committed,
        vec![SessionEffect::Committed {
            card_id: first.clone(),
            transition: CardTransition::Correct,
        }]
    );
    assert_eq!(engine.summary().confirm_ids, vec![first]);
    assert!(!engine.is_flipped());
}

#[test]
fn mixed_gestures_complete_exactly_once() {
    let ids = ["a", "b", "c", "d", "e", "f"];
    let (mut engine, clock) = mounted(&ids, 42);
    let mut emitted = Vec::new();

    for step in 0..ids.len() {
        clock.advance(POST_TRANSITION_LOCK_MS);
        let effects = match step % 3 {
            0 => engine.handle(SessionEvent::KeyPress(SessionKey::Discard)),
            1 => {
                engine.handle(SessionEvent::KeyPress(SessionKey::Flip));
                engine.handle(SessionEvent::KeyPress(SessionKey::Confirm))
            }
            _ => {
                engine.handle(SessionEvent::Tap);
                engine.handle(SessionEvent::Confirm)
            }
        };
        emitted.extend(settle(&mut engine, &effects));
    }

    // nothing left to resolve, further input is a no-op
    clock.advance(POST_TRANSITION_LOCK_MS);
    emitted.extend(engine.handle(SessionEvent::KeyPress(SessionKey::Discard)));
    emitted.extend(engine.handle(SessionEvent::AnimationSettled));

    let summaries = completions(&emitted);
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.confirm_ids.len() + summary.pass_ids.len(), ids.len());
    assert_eq!(summary.confirm_ids.len(), 4);

    let confirmed: HashSet<&String> = summary.confirm_ids.iter().collect();
    assert!(summary.pass_ids.iter().all(|id| !confirmed.contains(id)));
    assert!(engine.is_complete());
    assert_eq!(engine.view_report(), summary.clone());
}

#[test]
fn restart_plays_the_deck_again() {
    let (mut engine, clock) = mounted(&["a", "b"], 3);
    let mut emitted = Vec::new();
    while engine.current_card().is_some() {
        let effects = swipe(&mut engine, -200.0);
        emitted.extend(settle(&mut engine, &effects));
    }
    assert_eq!(completions(&emitted).len(), 1);

    let seed = engine.seed();
    engine.restart();
    assert_ne!(engine.seed(), seed);
    assert_eq!(engine.remaining(), 2);
    assert!(engine.summary().is_empty());

    clock.advance(1_000);
    let mut again = Vec::new();
    while engine.current_card().is_some() {
        let effects = engine.handle(SessionEvent::Pass);
        again.extend(settle(&mut engine, &effects));
        clock.advance(POST_TRANSITION_LOCK_MS);
    }
    assert_eq!(completions(&again).len(), 1);
}

#[test]
fn normalized_results_partition_the_deck() {
    let deck_ids: Vec<String> = ["x1", "x2", "x3", "x4", "x5"].iter().map(|id| id.to_string()).collect();
    let raw_summaries = [
        FlashcardsSessionSummary::new(vec!["x2".into(), "x2".into(), "gone".into()], vec!["x1".into()]),
        FlashcardsSessionSummary::new(vec![], vec!["x3".into()]),
        FlashcardsSessionSummary::new(
            vec!["x1".into(), "x2".into(), "x3".into(), "x4".into(), "x5".into()],
            vec!["x1".into()],
        ),
        FlashcardsSessionSummary::new(vec![" x4 ".into(), "".into()], vec![]),
    ];

    for raw in &raw_summaries {
        let summary = normalize_flashcards_session_summary(raw, &deck_ids).unwrap();
        let confirmed: HashSet<&String> = summary.confirm_ids.iter().collect();
        let passed: HashSet<&String> = summary.pass_ids.iter().collect();

        assert!(confirmed.is_disjoint(&passed), "{:?}", summary);
        let union: HashSet<&String> = confirmed.union(&passed).copied().collect();
        assert_eq!(union, deck_ids.iter().collect::<HashSet<_>>());
        assert_eq!(summary.len(), deck_ids.len());
    }
}
