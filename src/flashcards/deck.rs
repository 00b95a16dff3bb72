use std::collections::{BTreeMap, HashSet};

use super::card::{FlashcardItem, FlashcardTopicDeck};
use super::extract::FlashcardSourceFile;
use super::path::{is_same_or_descendant_topic, normalize_flashcard_path};
use super::search::collation_key;

/// Anything that belongs to one topic in one locale.
pub trait LocalizedTopic {
    fn topic_slug(&self) -> &str;
    fn locale(&self) -> &str;
}

impl LocalizedTopic for FlashcardSourceFile {
    fn topic_slug(&self) -> &str {
        &self.topic_slug
    }

    fn locale(&self) -> &str {
        &self.locale
    }
}

impl LocalizedTopic for FlashcardTopicDeck {
    fn topic_slug(&self) -> &str {
        &self.topic_slug
    }

    fn locale(&self) -> &str {
        &self.locale
    }
}

/// Picks, per topic, the variant written in `locale`. Topics without that
/// locale are left out; there is no fallback language. Output is ordered by
/// topic slug, ignoring accents and case.
pub fn select_localized_topic_files<T>(files: Vec<T>, locale: &str) -> Vec<T>
where
    T: LocalizedTopic,
{
    let locale = normalize_flashcard_path(locale);
    let mut grouped: BTreeMap<(String, String), Vec<T>> = BTreeMap::new();

    for file in files {
        grouped
            .entry(slug_order(file.topic_slug()))
            .or_default()
            .push(file);
    }

    grouped
        .into_values()
        .filter_map(|variants| {
            variants
                .into_iter()
                .find(|entry| normalize_flashcard_path(entry.locale()) == locale)
        })
        .collect()
}

fn slug_order(topic_slug: &str) -> (String, String) {
    let slug = normalize_flashcard_path(topic_slug);
    (collation_key(&slug), slug)
}

fn concat_sorted<'a>(decks: impl Iterator<Item = &'a FlashcardTopicDeck>) -> Vec<FlashcardItem> {
    let mut decks: Vec<&FlashcardTopicDeck> = decks.collect();
    decks.sort_by_cached_key(|deck| slug_order(&deck.topic_slug));

    dedupe_flashcards_by_id(decks.into_iter().flat_map(|deck| deck.cards.iter()))
}

/// Keeps the first occurrence of every id, preserving order.
fn dedupe_flashcards_by_id<'a>(cards: impl Iterator<Item = &'a FlashcardItem>) -> Vec<FlashcardItem> {
    let mut seen = HashSet::new();
    cards
        .filter(|card| seen.insert(card.id.as_str()))
        .cloned()
        .collect()
}

/// Every card of the given topic decks, ordered by topic slug.
pub fn build_course_deck(topic_decks: &[FlashcardTopicDeck]) -> Vec<FlashcardItem> {
    concat_sorted(topic_decks.iter())
}

/// Cards of `selected_topic` and of every topic below it.
pub fn build_topic_deck(topic_decks: &[FlashcardTopicDeck], selected_topic: &str) -> Vec<FlashcardItem> {
    let selected = normalize_flashcard_path(selected_topic);
    if selected.is_empty() {
        return Vec::new();
    }

    concat_sorted(
        topic_decks
            .iter()
            .filter(|deck| is_same_or_descendant_topic(&deck.topic_slug, &selected)),
    )
}

pub fn card_ids(cards: &[FlashcardItem]) -> Vec<String> {
    cards.iter().map(|card| card.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, topic: &str) -> FlashcardItem {
        FlashcardItem {
            id: id.to_string(),
            question: format!("q {}", id),
            answer: format!("a {}", id),
            topic_slug: topic.to_string(),
            course_slug: "calc".to_string(),
        }
    }

    fn deck(topic: &str, ids: &[&str]) -> FlashcardTopicDeck {
        FlashcardTopicDeck {
            course_slug: "calc".to_string(),
            topic_slug: topic.to_string(),
            locale: "it".to_string(),
            cards: ids.iter().map(|id| card(id, topic)).collect(),
        }
    }

    struct File {
        topic: &'static str,
        locale: &'static str,
    }

    impl LocalizedTopic for File {
        fn topic_slug(&self) -> &str {
            self.topic
        }

        fn locale(&self) -> &str {
            self.locale
        }
    }

    #[test]
    fn selects_requested_locale_without_fallback() {
        let files = vec![
            File { topic: "a", locale: "en" },
            File { topic: "a", locale: "it" },
            File { topic: "b", locale: "en" },
        ];

        let selected = select_localized_topic_files(files, "it");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].topic, "a");
        assert_eq!(selected[0].locale, "it");
    }

    #[test]
    fn topic_deck_includes_descendants_only() {
        let decks = vec![
            deck("calc/limits/examples", &["c3"]),
            deck("calc/derivatives", &["c4"]),
            deck("calc/limits", &["c1", "c2"]),
        ];

        let ids = card_ids(&build_topic_deck(&decks, "calc/limits"));
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(build_topic_deck(&decks, " / ").is_empty());
    }

    #[test]
    fn course_deck_sorts_by_topic_and_dedupes() {
        let decks = vec![
            deck("calc/limits", &["dup", "c2"]),
            deck("calc/derivatives", &["c1", "dup"]),
        ];

        let cards = build_course_deck(&decks);
        assert_eq!(card_ids(&cards), vec!["c1", "dup", "c2"]);
        assert_eq!(cards[1].topic_slug, "calc/derivatives");
    }

    #[test]
    fn accented_topics_sort_with_their_base_letter() {
        let decks = vec![
            deck("fis/zeta", &["z"]),
            deck("fis/élan", &["e"]),
            deck("fis/Alpha", &["a"]),
        ];
        assert_eq!(card_ids(&build_course_deck(&decks)), vec!["a", "e", "z"]);

        let files = vec![
            File { topic: "fis/zeta", locale: "it" },
            File { topic: "fis/élan", locale: "it" },
        ];
        let topics: Vec<&str> = select_localized_topic_files(files, "it")
            .iter()
            .map(|file| file.topic)
            .collect();
        assert_eq!(topics, vec!["fis/élan", "fis/zeta"]);
    }
}
