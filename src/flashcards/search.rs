//! Query-string codec for the flashcards views, plus the storage keys derived
//! from the same selection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use url::form_urlencoded;

use super::card::{FlashcardMode, FlashcardScope, FlashcardsRetakeMode};
use super::path::normalize_flashcard_path;

const SCOPE_PARAM: &str = "scope";
const MODE_PARAM: &str = "mode";
const COURSE_PARAM: &str = "course";
const TOPIC_PARAM: &str = "topic";
pub(crate) const RESULT_CONFIRMED_PARAM: &str = "fc_confirmed";
pub(crate) const RESULT_PASSED_PARAM: &str = "fc_passed";
const RETAKE_PARAM: &str = "fc_retake";

const RESULT_STORAGE_PREFIX: &str = "open-physica:flashcards:result:v1";
const LAST_REPORT_STORAGE_PREFIX: &str = "open-physica:flashcards:last-report:v1";
const DEFAULT_LOCALE: &str = "it";
const ALL_SENTINEL: &str = "__all";
const COURSE_SENTINEL: &str = "__course";

/// Ordered, repeatable query parameters (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a query string; a leading `?` is ignored.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        Self {
            pairs: form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn append(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Replaces every value of `key` with `value`, keeping the first position.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(first) => {
                self.pairs[first].1 = value.to_string();
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = index <= first || k != key;
                    index += 1;
                    keep
                });
            }
            None => self.append(key, value),
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        f.write_str(&serializer.finish())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardsSearchState {
    pub scope: FlashcardScope,
    pub mode: FlashcardMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

fn normalized_param(value: Option<&str>) -> Option<String> {
    value
        .map(normalize_flashcard_path)
        .filter(|normalized| !normalized.is_empty())
}

impl FlashcardsSearchState {
    pub fn from_params(params: &SearchParams) -> Self {
        Self {
            scope: FlashcardScope::parse(params.get(SCOPE_PARAM)),
            mode: FlashcardMode::parse(params.get(MODE_PARAM)),
            course: normalized_param(params.get(COURSE_PARAM).filter(|v| !v.is_empty())),
            topic: normalized_param(params.get(TOPIC_PARAM).filter(|v| !v.is_empty())),
        }
    }

    pub fn to_params(&self) -> SearchParams {
        let mut params = SearchParams::new();
        params.set(SCOPE_PARAM, self.scope.as_str());
        params.set(MODE_PARAM, self.mode.as_str());

        if let Some(course) = normalized_param(self.course.as_deref()) {
            params.set(COURSE_PARAM, &course);
        }
        if let Some(topic) = normalized_param(self.topic.as_deref()) {
            params.set(TOPIC_PARAM, &topic);
        }
        params
    }

    pub fn with_mode(&self, mode: FlashcardMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }
}

/// `scope` and `mode` are always present; `course`/`topic` only when set.
pub fn build_flashcards_search(state: &FlashcardsSearchState) -> String {
    state.to_params().to_string()
}

/// Tolerant parse: unknown values fall back to `topic` / `interactive`.
pub fn parse_flashcards_search(raw: &str) -> FlashcardsSearchState {
    FlashcardsSearchState::from_params(&SearchParams::parse(raw))
}

pub fn append_flashcards_retake_mode(params: &mut SearchParams, mode: FlashcardsRetakeMode) {
    params.delete(RETAKE_PARAM);
    if mode == FlashcardsRetakeMode::Discarded {
        params.set(RETAKE_PARAM, "discarded");
    }
}

pub fn parse_flashcards_retake_mode(params: &SearchParams) -> FlashcardsRetakeMode {
    match params.get(RETAKE_PARAM) {
        Some("discarded") => FlashcardsRetakeMode::Discarded,
        _ => FlashcardsRetakeMode::All,
    }
}

/// A course or topic choice in the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardsNamedOption {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub card_count: usize,
}

impl FlashcardsNamedOption {
    pub fn new(slug: &str, title: &str) -> Self {
        Self {
            slug: slug.to_string(),
            title: title.to_string(),
            card_count: 0,
        }
    }
}

/// Repairs `state` against the catalog: a missing or unknown course becomes
/// the first course option, a missing or unknown topic the first topic of
/// the resolved course.
pub fn normalize_explorer_search_state(
    state: &FlashcardsSearchState,
    course_options: &[FlashcardsNamedOption],
    topic_options_by_course: &HashMap<String, Vec<FlashcardsNamedOption>>,
) -> FlashcardsSearchState {
    let requested_course = normalized_param(state.course.as_deref());
    let course = requested_course
        .filter(|course| course_options.iter().any(|option| &option.slug == course))
        .or_else(|| course_options.first().map(|option| option.slug.clone()));

    let topic_options = course
        .as_ref()
        .and_then(|course| topic_options_by_course.get(course))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let requested_topic = normalized_param(state.topic.as_deref());
    let topic = requested_topic
        .filter(|topic| topic_options.iter().any(|option| &option.slug == topic))
        .or_else(|| topic_options.first().map(|option| option.slug.clone()));

    FlashcardsSearchState {
        scope: state.scope,
        mode: state.mode,
        course,
        topic,
    }
}

/// Accent- and case-folded form of `value`, for human-facing ordering.
pub(crate) fn collation_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title ordering for option lists: accents and case are ignored first, the
/// raw strings break ties.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn storage_locale(locale: &str) -> String {
    let normalized = normalize_flashcard_path(locale);
    if normalized.is_empty() {
        DEFAULT_LOCALE.to_string()
    } else {
        normalized
    }
}

/// Persistence namespace of one selection:
/// `<prefix>:<locale>:<course|__all>:<scope>:<topic|__all|__course>`.
pub fn build_flashcards_session_storage_key(
    locale: &str,
    scope: FlashcardScope,
    course: Option<&str>,
    topic: Option<&str>,
) -> String {
    let course = normalized_param(course).unwrap_or_else(|| ALL_SENTINEL.to_string());
    let topic = match scope {
        FlashcardScope::Topic => normalized_param(topic).unwrap_or_else(|| ALL_SENTINEL.to_string()),
        FlashcardScope::Course => COURSE_SENTINEL.to_string(),
    };

    format!(
        "{}:{}:{}:{}:{}",
        RESULT_STORAGE_PREFIX,
        storage_locale(locale),
        course,
        scope.as_str(),
        topic
    )
}

pub fn build_flashcards_last_report_storage_key(locale: &str) -> String {
    format!("{}:{}", LAST_REPORT_STORAGE_PREFIX, storage_locale(locale))
}
