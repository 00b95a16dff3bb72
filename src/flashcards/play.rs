//! Resolving a query against the catalog, and the interactive route around
//! a session: which cards to play, and what to persist when it ends.

use std::collections::{HashMap, HashSet};

use crate::i18n::Translations;

use super::card::{FlashcardItem, FlashcardMode, FlashcardScope, FlashcardsRetakeMode, FlashcardsSessionSummary};
use super::deck::{build_course_deck, build_topic_deck, card_ids};
use super::path::normalize_flashcard_path;
use super::search::{
    append_flashcards_retake_mode, build_flashcards_session_storage_key, compare_titles,
    normalize_explorer_search_state, parse_flashcards_retake_mode, FlashcardsNamedOption,
    FlashcardsSearchState, SearchParams,
};
use super::snapshot::FlashcardsExplorerData;
use super::storage::{
    load_flashcards_session_summary, store_flashcards_last_report_summary, store_flashcards_session_summary,
    KeyValueStore, StorageError,
};
use super::summary::{
    append_flashcards_session_summary, filter_flashcards_session_summary, normalize_flashcards_session_summary,
    parse_flashcards_session_summary,
};

pub const EXPLORER_ROUTE: &str = "flashcards";
pub const PLAY_ROUTE: &str = "flashcards/play";

/// `/<locale>/<route>?<query>`
pub fn localized_href(locale: &str, route: &str, query: &str) -> String {
    let path = format!("/{}/{}", normalize_flashcard_path(locale), route.trim_matches('/'));
    if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    }
}

/// The course and topic choices offered for an explorer dataset.
#[derive(Debug, Clone, Default)]
pub struct FlashcardsOptions {
    pub courses: Vec<FlashcardsNamedOption>,
    pub topics_by_course: HashMap<String, Vec<FlashcardsNamedOption>>,
}

impl FlashcardsOptions {
    /// Courses come from the catalog, or from the topics' course titles when
    /// the catalog lists none. Both lists are deduplicated and sorted by title.
    pub fn from_explorer(data: &FlashcardsExplorerData) -> Self {
        let listed: Vec<(&str, &str)> = if data.courses.is_empty() {
            data.topics
                .iter()
                .map(|topic| (topic.course_slug.as_str(), topic.course_title.as_str()))
                .collect()
        } else {
            data.courses
                .iter()
                .map(|course| (course.slug.as_str(), course.title.as_str()))
                .collect()
        };

        // the last title seen for a slug wins, the first position is kept
        let mut courses: Vec<FlashcardsNamedOption> = Vec::new();
        for (slug, title) in listed {
            let slug = normalize_flashcard_path(slug);
            match courses.iter_mut().find(|option| option.slug == slug) {
                Some(existing) => existing.title = title.to_string(),
                None => courses.push(FlashcardsNamedOption::new(&slug, title)),
            }
        }
        courses.sort_by(|a, b| compare_titles(&a.title, &b.title));

        let decks = data.topic_decks();
        let topics_by_course = courses
            .iter()
            .map(|course| {
                let course_decks: Vec<_> = decks
                    .iter()
                    .filter(|deck| normalize_flashcard_path(&deck.course_slug) == course.slug)
                    .cloned()
                    .collect();

                let mut options: Vec<FlashcardsNamedOption> = data
                    .topics
                    .iter()
                    .filter(|topic| normalize_flashcard_path(&topic.course_slug) == course.slug)
                    .map(|topic| FlashcardsNamedOption {
                        slug: topic.topic_slug.clone(),
                        title: topic.title.clone(),
                        card_count: build_topic_deck(&course_decks, &topic.topic_slug).len(),
                    })
                    .collect();
                options.sort_by(|a, b| compare_titles(&a.title, &b.title));

                (course.slug.clone(), options)
            })
            .collect();

        Self {
            courses,
            topics_by_course,
        }
    }

    pub fn normalize(&self, state: &FlashcardsSearchState) -> FlashcardsSearchState {
        normalize_explorer_search_state(state, &self.courses, &self.topics_by_course)
    }

    pub fn topics(&self, course: Option<&str>) -> &[FlashcardsNamedOption] {
        course
            .and_then(|course| self.topics_by_course.get(course))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A normalized selection with its deck.
#[derive(Debug, Clone)]
pub struct FlashcardsSelection {
    pub locale: String,
    pub state: FlashcardsSearchState,
    pub storage_key: String,
    pub cards: Vec<FlashcardItem>,
    pub course_title: String,
    pub topic_label: String,
    pub topic_titles: HashMap<String, String>,
}

impl FlashcardsSelection {
    /// Repairs `state` against the catalog and builds the deck it names.
    pub fn resolve(
        data: &FlashcardsExplorerData,
        options: &FlashcardsOptions,
        state: &FlashcardsSearchState,
        t: &Translations,
    ) -> Self {
        let state = options.normalize(state);
        let course = state.course.clone().unwrap_or_default();

        let scoped: Vec<_> = data
            .topic_decks()
            .into_iter()
            .filter(|deck| normalize_flashcard_path(&deck.course_slug) == course)
            .collect();
        let cards = match (state.scope, state.topic.as_deref()) {
            (FlashcardScope::Course, _) => build_course_deck(&scoped),
            (FlashcardScope::Topic, Some(topic)) => build_topic_deck(&scoped, topic),
            (FlashcardScope::Topic, None) => Vec::new(),
        };

        let storage_key = build_flashcards_session_storage_key(
            &data.locale,
            state.scope,
            state.course.as_deref(),
            state.topic.as_deref(),
        );

        let topic_titles: HashMap<String, String> = data
            .topics
            .iter()
            .map(|topic| (normalize_flashcard_path(&topic.topic_slug), topic.title.clone()))
            .collect();
        let course_title = options
            .courses
            .iter()
            .find(|option| Some(&option.slug) == state.course.as_ref())
            .map(|option| option.title.clone())
            .unwrap_or_else(|| t.t("flashcardsScopeCourse").to_string());
        let topic_label = match state.scope {
            FlashcardScope::Course => t.t("flashcardsTopicAll").to_string(),
            FlashcardScope::Topic => state
                .topic
                .as_ref()
                .and_then(|topic| topic_titles.get(topic))
                .cloned()
                .unwrap_or_else(|| course_title.clone()),
        };

        Self {
            locale: data.locale.clone(),
            state,
            storage_key,
            cards,
            course_title,
            topic_label,
            topic_titles,
        }
    }

    pub fn card_ids(&self) -> Vec<String> {
        card_ids(&self.cards)
    }

    /// `course / topic`, as shown above a deck.
    pub fn heading(&self) -> String {
        format!("{} / {}", self.course_title, self.topic_label)
    }

    pub fn topic_title<'a>(&'a self, topic_slug: &'a str) -> &'a str {
        self.topic_titles
            .get(&normalize_flashcard_path(topic_slug))
            .map(String::as_str)
            .unwrap_or(topic_slug)
    }

    /// Query of this selection in `mode`, without any results.
    pub fn search_params(&self, mode: FlashcardMode) -> SearchParams {
        self.state.with_mode(mode).to_params()
    }

    /// Link to the interactive route, optionally replaying only discarded cards.
    pub fn play_href(&self, retake: FlashcardsRetakeMode) -> String {
        let mut params = self.search_params(FlashcardMode::Interactive);
        append_flashcards_retake_mode(&mut params, retake);
        localized_href(&self.locale, PLAY_ROUTE, &params.to_string())
    }

    /// Normalizes a finished session against the full deck and stores it
    /// under both the scoped and the last-report key.
    pub fn record_result(
        &self,
        store: &mut dyn KeyValueStore,
        raw: &FlashcardsSessionSummary,
    ) -> Result<Option<FlashcardsSessionSummary>, StorageError> {
        let Some(summary) = normalize_flashcards_session_summary(raw, &self.card_ids()) else {
            return Ok(None);
        };

        store_flashcards_session_summary(store, &self.storage_key, &summary)?;
        store_flashcards_last_report_summary(store, &self.locale, &summary)?;
        log::debug!(
            "stored {} confirmed / {} passed under {}",
            summary.confirm_ids.len(),
            summary.pass_ids.len(),
            self.storage_key
        );
        Ok(Some(summary))
    }

    /// Records the result and returns the study link that shows it.
    pub fn view_report(
        &self,
        store: &mut dyn KeyValueStore,
        raw: &FlashcardsSessionSummary,
    ) -> Result<Option<String>, StorageError> {
        let Some(summary) = self.record_result(store, raw)? else {
            return Ok(None);
        };

        let mut params = self.search_params(FlashcardMode::Study);
        append_flashcards_session_summary(&mut params, &summary);
        Ok(Some(localized_href(&self.locale, EXPLORER_ROUTE, &params.to_string())))
    }
}

/// The interactive route: a forced-interactive selection plus the cards
/// this run actually plays.
#[derive(Debug, Clone)]
pub struct FlashcardsPlay {
    pub selection: FlashcardsSelection,
    pub retake: FlashcardsRetakeMode,
    pub game_cards: Vec<FlashcardItem>,
}

impl FlashcardsPlay {
    pub fn resolve(
        data: &FlashcardsExplorerData,
        options: &FlashcardsOptions,
        params: &SearchParams,
        store: &dyn KeyValueStore,
        t: &Translations,
    ) -> Self {
        let state = FlashcardsSearchState::from_params(params).with_mode(FlashcardMode::Interactive);
        let selection = FlashcardsSelection::resolve(data, options, &state, t);
        let retake = parse_flashcards_retake_mode(params);

        let game_cards = match retake {
            FlashcardsRetakeMode::All => selection.cards.clone(),
            FlashcardsRetakeMode::Discarded => discarded_cards(&selection, params, store),
        };

        Self {
            selection,
            retake,
            game_cards,
        }
    }
}

/// Cards discarded in the summary carried by the URL or, failing that, in
/// scoped storage. No summary means nothing to retake.
fn discarded_cards(
    selection: &FlashcardsSelection,
    params: &SearchParams,
    store: &dyn KeyValueStore,
) -> Vec<FlashcardItem> {
    let source = parse_flashcards_session_summary(params)
        .or_else(|| load_flashcards_session_summary(store, &selection.storage_key));
    let Some(summary) = source.and_then(|summary| filter_flashcards_session_summary(&summary, &selection.card_ids()))
    else {
        return Vec::new();
    };

    let discarded: HashSet<&str> = summary.pass_ids.iter().map(String::as_str).collect();
    selection
        .cards
        .iter()
        .filter(|card| discarded.contains(card.id.as_str()))
        .cloned()
        .collect()
}
