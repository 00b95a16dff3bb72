use std::sync::OnceLock;

use regex::Regex;

/// Course, topic and locale recovered from a `<topic>/flashcards.<locale>.mdx` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardDataPath {
    pub course_slug: String,
    pub topic_slug: String,
    pub locale: String,
}

fn data_path_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?P<topic>.+)/flashcards\.(?P<locale>[a-z0-9-]+)\.mdx$")
            .expect("flashcard data path pattern is valid")
    })
}

/// Trims, collapses repeated slashes, strips leading/trailing slashes and
/// lowercases. Every slug comparison in the crate goes through here.
pub fn normalize_flashcard_path(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    for segment in value.trim().split('/').filter(|s| !s.is_empty()) {
        if !normalized.is_empty() {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }
    normalized.to_lowercase()
}

/// First segment of a normalized path, if any.
pub fn course_from_path(path: &str) -> Option<String> {
    let normalized = normalize_flashcard_path(path);
    normalized
        .split('/')
        .next()
        .filter(|course| !course.is_empty())
        .map(str::to_string)
}

pub fn parse_flashcard_data_path(path: &str) -> Option<FlashcardDataPath> {
    let normalized = normalize_flashcard_path(path);
    let caps = data_path_regex().captures(&normalized)?;

    let topic_slug = normalize_flashcard_path(caps.name("topic")?.as_str());
    let course_slug = course_from_path(&topic_slug)?;

    Some(FlashcardDataPath {
        course_slug,
        topic_slug,
        locale: caps.name("locale")?.as_str().to_lowercase(),
    })
}

/// True when `topic` equals `selected` or lives below it (`selected/...`).
pub fn is_same_or_descendant_topic(topic: &str, selected: &str) -> bool {
    let topic = normalize_flashcard_path(topic);
    let selected = normalize_flashcard_path(selected);

    if topic.is_empty() || selected.is_empty() {
        return false;
    }

    topic == selected
        || topic
            .strip_prefix(selected.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_case() {
        assert_eq!(normalize_flashcard_path("  //Calc///Limits/ "), "calc/limits");
        assert_eq!(normalize_flashcard_path("///"), "");
        assert_eq!(normalize_flashcard_path("Fisica-1"), "fisica-1");
    }

    #[test]
    fn parses_data_path() {
        let parsed = parse_flashcard_data_path("/Calc/Limits/flashcards.IT.mdx").unwrap();
        assert_eq!(parsed.course_slug, "calc");
        assert_eq!(parsed.topic_slug, "calc/limits");
        assert_eq!(parsed.locale, "it");
    }

    #[test]
    fn rejects_non_flashcard_paths() {
        assert!(parse_flashcard_data_path("calc/limits/index.it.mdx").is_none());
        assert!(parse_flashcard_data_path("flashcards.it.mdx").is_none());
        assert!(parse_flashcard_data_path("calc/limits/flashcards.mdx").is_none());
    }

    #[test]
    fn descendant_topics_match_on_segment_boundary() {
        assert!(is_same_or_descendant_topic("calc/limits", "calc/limits"));
        assert!(is_same_or_descendant_topic("calc/limits/examples", "Calc/Limits/"));
        assert!(!is_same_or_descendant_topic("calc/limitsx", "calc/limits"));
        assert!(!is_same_or_descendant_topic("calc/derivatives", "calc/limits"));
        assert!(!is_same_or_descendant_topic("calc", ""));
    }
}
