use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardItem {
    /// `auto:<normalized source path>#<1-based ordinal>`
    pub id: String,

    /// sanitized inline HTML
    pub question: String,

    /// sanitized inline HTML
    pub answer: String,

    pub topic_slug: String,
    pub course_slug: String,
}

impl FlashcardItem {
    pub fn auto_id(source_path: &str, ordinal: usize) -> String {
        format!("auto:{}#{}", source_path, ordinal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardTopicDeck {
    pub course_slug: String,
    pub topic_slug: String,
    pub locale: String,
    pub cards: Vec<FlashcardItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashcardScope {
    #[default]
    #[serde(rename = "topic")]
    Topic,
    #[serde(rename = "course")]
    Course,
}

impl FlashcardScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashcardScope::Topic => "topic",
            FlashcardScope::Course => "course",
        }
    }

    /// Anything but `course` is a topic scope.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("course") => FlashcardScope::Course,
            _ => FlashcardScope::Topic,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashcardMode {
    #[serde(rename = "study")]
    Study,
    #[default]
    #[serde(rename = "interactive")]
    Interactive,
}

impl FlashcardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashcardMode::Study => "study",
            FlashcardMode::Interactive => "interactive",
        }
    }

    /// Anything but `study` is interactive.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("study") => FlashcardMode::Study,
            _ => FlashcardMode::Interactive,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashcardsRetakeMode {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "discarded")]
    Discarded,
}

/// Outcome of one interactive session.
///
/// `confirm_ids` are the cards the learner judged correct, `pass_ids` the
/// cards that were discarded (or, after normalization, not confirmed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardsSessionSummary {
    pub pass_ids: Vec<String>,
    pub confirm_ids: Vec<String>,
}

impl FlashcardsSessionSummary {
    pub fn new(confirm_ids: Vec<String>, pass_ids: Vec<String>) -> Self {
        Self {
            pass_ids,
            confirm_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pass_ids.is_empty() && self.confirm_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pass_ids.len() + self.confirm_ids.len()
    }
}
