use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{get_attribute, parse_frontmatter, ContentError, ContentSource, RenderCache};

use super::card::{FlashcardItem, FlashcardTopicDeck};
use super::deck::select_localized_topic_files;
use super::extract::{extract_flashcards_from_source, FlashcardSourceFile};
use super::path::normalize_flashcard_path;

pub const ALL_COURSES_SLUG: &str = "all-courses";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardCourseSnapshot {
    pub course_slug: String,
    pub requested_locale: String,
    pub topics: Vec<FlashcardTopicDeck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerCourse {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerTopic {
    pub course_slug: String,
    pub course_title: String,
    pub topic_slug: String,
    pub title: String,
    pub locale: String,
    pub cards: Vec<FlashcardItem>,
}

/// Everything the explorer and play views need for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardsExplorerData {
    pub course_slug: String,
    pub locale: String,
    pub courses: Vec<ExplorerCourse>,
    pub topics: Vec<ExplorerTopic>,
}

impl FlashcardsExplorerData {
    /// Per-topic decks, as the deck builder consumes them.
    pub fn topic_decks(&self) -> Vec<FlashcardTopicDeck> {
        self.topics
            .iter()
            .map(|topic| FlashcardTopicDeck {
                course_slug: topic.course_slug.clone(),
                topic_slug: topic.topic_slug.clone(),
                locale: topic.locale.clone(),
                cards: topic.cards.clone(),
            })
            .collect()
    }
}

/// The recognized flashcard files of a content source, listed once.
pub struct FlashcardCatalog<'a> {
    source: &'a dyn ContentSource,
    files: Vec<FlashcardSourceFile>,
    paths: HashMap<String, String>,
}

impl<'a> FlashcardCatalog<'a> {
    pub fn load(source: &'a dyn ContentSource) -> Result<Self, ContentError> {
        let listing = source.list_files()?;
        let paths: HashMap<String, String> = listing
            .iter()
            .map(|path| (normalize_flashcard_path(path), path.clone()))
            .collect();

        let mut files: Vec<FlashcardSourceFile> = listing
            .iter()
            .filter_map(|path| FlashcardSourceFile::from_path(path))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        log::debug!("catalog: {} of {} files hold flashcards", files.len(), listing.len());
        Ok(Self { source, files, paths })
    }

    pub fn files(&self) -> &[FlashcardSourceFile] {
        &self.files
    }

    /// Distinct course slugs, in path order.
    pub fn active_courses(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.files
            .iter()
            .filter(|file| seen.insert(file.course_slug.as_str()))
            .map(|file| file.course_slug.clone())
            .collect()
    }

    pub fn is_course_active(&self, course_slug: &str) -> bool {
        let course = normalize_flashcard_path(course_slug);
        self.files.iter().any(|file| file.course_slug == course)
    }

    /// Paths, as listed, of every flashcard file plus the topic pages and
    /// course meta files its titles are read from.
    pub fn mirror_paths(&self) -> Vec<String> {
        let slugs: BTreeSet<&str> = self
            .files
            .iter()
            .flat_map(|file| [file.course_slug.as_str(), file.topic_slug.as_str()])
            .collect();
        let flashcard_paths: BTreeSet<&str> = self.files.iter().map(|file| file.path.as_str()).collect();

        let mut paths: Vec<(&String, &String)> = self
            .paths
            .iter()
            .filter(|(normalized, _)| {
                flashcard_paths.contains(normalized.as_str())
                    || title_source_slug(normalized).is_some_and(|slug| slugs.contains(slug))
            })
            .collect();
        paths.sort();
        paths.into_iter().map(|(_, original)| original.clone()).collect()
    }

    /// Loads a file as listed by the source, whatever its case on disk.
    fn load_normalized(&self, normalized: &str) -> Option<String> {
        let path = self.paths.get(normalized)?;
        self.source.try_load(path)
    }

    fn cards_for_file(&self, file: &FlashcardSourceFile, cache: &RenderCache) -> Vec<FlashcardItem> {
        match self.load_normalized(&file.path) {
            Some(raw) => extract_flashcards_from_source(&raw, file, cache),
            None => {
                log::warn!("{}: failed to load, skipping", file.path);
                Vec::new()
            }
        }
    }

    /// Decks of every topic of `course_slug` written in `locale`. Files are
    /// extracted in parallel; topics come back in slug order and topics
    /// without cards are dropped.
    pub fn course_snapshot(&self, course_slug: &str, locale: &str, cache: &RenderCache) -> FlashcardCourseSnapshot {
        let course_slug = normalize_flashcard_path(course_slug);
        let requested_locale = normalize_flashcard_path(locale);

        if !self.is_course_active(&course_slug) {
            return FlashcardCourseSnapshot {
                course_slug,
                requested_locale,
                topics: Vec::new(),
            };
        }

        let candidates: Vec<FlashcardSourceFile> = self
            .files
            .iter()
            .filter(|file| file.course_slug == course_slug)
            .cloned()
            .collect();
        let selected = select_localized_topic_files(candidates, &requested_locale);

        let topics: Vec<FlashcardTopicDeck> = selected
            .par_iter()
            .map(|file| FlashcardTopicDeck {
                course_slug: file.course_slug.clone(),
                topic_slug: file.topic_slug.clone(),
                locale: file.locale.clone(),
                cards: self.cards_for_file(file, cache),
            })
            .collect();

        FlashcardCourseSnapshot {
            course_slug,
            requested_locale,
            topics: topics.into_iter().filter(|topic| !topic.cards.is_empty()).collect(),
        }
    }

    fn page_title(&self, slug: &str, locale: &str) -> Option<String> {
        let slug = normalize_flashcard_path(slug);
        if slug.is_empty() {
            return None;
        }

        [
            format!("{}/index.{}.mdx", slug, locale),
            format!("{}.{}.mdx", slug, locale),
        ]
        .iter()
        .find_map(|path| self.load_normalized(path))
        .and_then(|raw| parse_frontmatter(&raw).title)
        .filter(|title| !title.trim().is_empty())
    }

    pub fn topic_title(&self, topic_slug: &str, locale: &str) -> String {
        self.page_title(topic_slug, locale)
            .unwrap_or_else(|| normalize_flashcard_path(topic_slug))
    }

    /// Folder meta title, then the course page title, then the slug.
    pub fn course_title(&self, course_slug: &str, locale: &str) -> String {
        let course = normalize_flashcard_path(course_slug);
        let meta_title = [
            format!("{}/meta.{}.json", course, locale),
            format!("{}/meta.json", course),
        ]
        .iter()
        .filter_map(|path| self.load_normalized(path))
        .find_map(|raw| match serde_json::from_str::<Value>(&raw) {
            Ok(meta) => get_attribute::<String>(&meta, "title").filter(|title| !title.trim().is_empty()),
            Err(e) => {
                log::debug!("{}: ignoring malformed meta, {}", course, e);
                None
            }
        });

        meta_title
            .or_else(|| self.page_title(&course, locale))
            .unwrap_or(course)
    }

    pub fn explorer_data(&self, locale: &str, cache: &RenderCache) -> FlashcardsExplorerData {
        let locale = normalize_flashcard_path(locale);
        let snapshots: Vec<FlashcardCourseSnapshot> = self
            .active_courses()
            .iter()
            .map(|course| self.course_snapshot(course, &locale, cache))
            .collect();

        let mut courses = Vec::with_capacity(snapshots.len());
        let mut topics = Vec::new();
        for snapshot in snapshots {
            let course_title = self.course_title(&snapshot.course_slug, &locale);
            for topic in snapshot.topics {
                topics.push(ExplorerTopic {
                    course_slug: snapshot.course_slug.clone(),
                    course_title: course_title.clone(),
                    title: self.topic_title(&topic.topic_slug, &locale),
                    topic_slug: topic.topic_slug,
                    locale: topic.locale,
                    cards: topic.cards,
                });
            }
            courses.push(ExplorerCourse {
                slug: snapshot.course_slug,
                title: course_title,
            });
        }

        FlashcardsExplorerData {
            course_slug: ALL_COURSES_SLUG.to_string(),
            locale,
            courses,
            topics,
        }
    }
}

/// The slug a title file describes: `<slug>/index.<locale>.mdx`,
/// `<slug>.<locale>.mdx`, `<slug>/meta.json` or `<slug>/meta.<locale>.json`.
fn title_source_slug(path: &str) -> Option<&str> {
    if let Some(rest) = path.strip_suffix(".json") {
        let (dir, file) = rest.rsplit_once('/')?;
        return (file == "meta" || file.starts_with("meta.")).then_some(dir);
    }
    let (stem, _locale) = path.strip_suffix(".mdx")?.rsplit_once('.')?;
    Some(stem.strip_suffix("/index").unwrap_or(stem))
}

pub fn get_active_courses(source: &dyn ContentSource) -> Result<Vec<String>, ContentError> {
    Ok(FlashcardCatalog::load(source)?.active_courses())
}

pub fn get_flashcard_course_snapshot(
    source: &dyn ContentSource,
    course_slug: &str,
    locale: &str,
    cache: &RenderCache,
) -> Result<FlashcardCourseSnapshot, ContentError> {
    Ok(FlashcardCatalog::load(source)?.course_snapshot(course_slug, locale, cache))
}

pub fn get_flashcards_explorer_data(
    source: &dyn ContentSource,
    locale: &str,
    cache: &RenderCache,
) -> Result<FlashcardsExplorerData, ContentError> {
    Ok(FlashcardCatalog::load(source)?.explorer_data(locale, cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentSource;

    const CARD: &str = "<Flashcard><FlashcardQuestion>q</FlashcardQuestion><FlashcardAnswer>a</FlashcardAnswer></Flashcard>";

    fn source() -> MemoryContentSource {
        MemoryContentSource::new()
            .with_file("Calc/Limits/flashcards.it.mdx", CARD)
            .with_file("calc/limits/index.it.mdx", "---\ntitle: Limiti\n---\n")
            .with_file("calc/derivatives/flashcards.it.mdx", "no cards here")
            .with_file("calc/series/flashcards.en.mdx", CARD)
            .with_file("calc/meta.it.json", r#"{"title": "Analisi"}"#)
            .with_file("mech/flashcards.it.mdx", CARD)
            .with_file("mech.it.mdx", "---\ntitle: Meccanica\n---\n")
            .with_file("notes.txt", "ignored")
    }

    #[test]
    fn lists_active_courses() {
        let source = source();
        assert_eq!(get_active_courses(&source).unwrap(), vec!["calc", "mech"]);
    }

    #[test]
    fn snapshot_keeps_locale_and_nonempty_topics() {
        let source = source();
        let cache = RenderCache::default();
        let snapshot = get_flashcard_course_snapshot(&source, "/CALC/", "it", &cache).unwrap();

        assert_eq!(snapshot.course_slug, "calc");
        assert_eq!(snapshot.requested_locale, "it");
        assert_eq!(snapshot.topics.len(), 1);
        assert_eq!(snapshot.topics[0].topic_slug, "calc/limits");
        assert_eq!(snapshot.topics[0].cards[0].id, "auto:calc/limits/flashcards.it.mdx#1");

        let inactive = get_flashcard_course_snapshot(&source, "chem", "it", &cache).unwrap();
        assert!(inactive.topics.is_empty());
    }

    #[test]
    fn mirrors_flashcards_and_title_sources() {
        let source = source();
        let catalog = FlashcardCatalog::load(&source).unwrap();
        assert_eq!(
            catalog.mirror_paths(),
            vec![
                "calc/derivatives/flashcards.it.mdx",
                "Calc/Limits/flashcards.it.mdx",
                "calc/limits/index.it.mdx",
                "calc/meta.it.json",
                "calc/series/flashcards.en.mdx",
                "mech.it.mdx",
                "mech/flashcards.it.mdx",
            ]
        );
    }

    #[test]
    fn explorer_titles_fall_back() {
        let source = source();
        let data = get_flashcards_explorer_data(&source, "it", &RenderCache::default()).unwrap();

        assert_eq!(data.course_slug, ALL_COURSES_SLUG);
        assert_eq!(
            data.courses,
            vec![
                ExplorerCourse {
                    slug: "calc".into(),
                    title: "Analisi".into()
                },
                ExplorerCourse {
                    slug: "mech".into(),
                    title: "Meccanica".into()
                },
            ]
        );
        assert_eq!(data.topics.len(), 2);
        assert_eq!(data.topics[0].title, "Limiti");
        assert_eq!(data.topics[0].course_title, "Analisi");
        assert_eq!(data.topics[1].title, "Meccanica");
        assert_eq!(data.topic_decks().len(), 2);
    }
}
