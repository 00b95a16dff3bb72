use std::collections::HashSet;

use super::card::FlashcardsSessionSummary;
use super::search::{SearchParams, RESULT_CONFIRMED_PARAM, RESULT_PASSED_PARAM};

/// Trims every id and keeps the first occurrence of each non-empty one.
pub fn sanitize_flashcard_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn summary_or_none(confirm_ids: Vec<String>, pass_ids: Vec<String>) -> Option<FlashcardsSessionSummary> {
    let summary = FlashcardsSessionSummary::new(confirm_ids, pass_ids);
    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}

/// Rebuilds a full partition of `deck_ids`: confirmed cards are kept in
/// summary order, every other deck card counts as passed.
///
/// Returns `None` for an empty deck.
pub fn normalize_flashcards_session_summary<S: AsRef<str>>(
    summary: &FlashcardsSessionSummary,
    deck_ids: &[S],
) -> Option<FlashcardsSessionSummary> {
    let deck_ids = sanitize_flashcard_ids(deck_ids);
    if deck_ids.is_empty() {
        return None;
    }

    let available: HashSet<&str> = deck_ids.iter().map(String::as_str).collect();
    let confirm_ids: Vec<String> = sanitize_flashcard_ids(&summary.confirm_ids)
        .into_iter()
        .filter(|id| available.contains(id.as_str()))
        .collect();

    let confirmed: HashSet<&str> = confirm_ids.iter().map(String::as_str).collect();
    let pass_ids = deck_ids
        .iter()
        .filter(|id| !confirmed.contains(id.as_str()))
        .cloned()
        .collect();

    Some(FlashcardsSessionSummary::new(confirm_ids, pass_ids))
}

/// Restricts both lists to `deck_ids` without inventing passes; a card
/// listed on both sides stays confirmed. `None` when nothing survives.
pub fn filter_flashcards_session_summary<S: AsRef<str>>(
    summary: &FlashcardsSessionSummary,
    deck_ids: &[S],
) -> Option<FlashcardsSessionSummary> {
    let available: HashSet<&str> = deck_ids.iter().map(|id| id.as_ref()).collect();
    let confirm_ids: Vec<String> = sanitize_flashcard_ids(&summary.confirm_ids)
        .into_iter()
        .filter(|id| available.contains(id.as_str()))
        .collect();

    let confirmed: HashSet<&str> = confirm_ids.iter().map(String::as_str).collect();
    let pass_ids: Vec<String> = sanitize_flashcard_ids(&summary.pass_ids)
        .into_iter()
        .filter(|id| available.contains(id.as_str()) && !confirmed.contains(id.as_str()))
        .collect();

    summary_or_none(confirm_ids, pass_ids)
}

/// Writes the summary as repeated `fc_confirmed` / `fc_passed` parameters,
/// replacing any previous ones.
pub fn append_flashcards_session_summary(params: &mut SearchParams, summary: &FlashcardsSessionSummary) {
    params.delete(RESULT_CONFIRMED_PARAM);
    params.delete(RESULT_PASSED_PARAM);

    for id in sanitize_flashcard_ids(&summary.confirm_ids) {
        params.append(RESULT_CONFIRMED_PARAM, &id);
    }
    for id in sanitize_flashcard_ids(&summary.pass_ids) {
        params.append(RESULT_PASSED_PARAM, &id);
    }
}

pub fn parse_flashcards_session_summary(params: &SearchParams) -> Option<FlashcardsSessionSummary> {
    summary_or_none(
        sanitize_flashcard_ids(&params.get_all(RESULT_CONFIRMED_PARAM)),
        sanitize_flashcard_ids(&params.get_all(RESULT_PASSED_PARAM)),
    )
}
