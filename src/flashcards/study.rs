//! The study (explorer) view and its printable sheet.

use std::collections::{BTreeMap, HashSet};

use github_slugger::Slugger;

use crate::i18n::{FlashcardsDeckLabels, Translations};

use super::card::{FlashcardItem, FlashcardsRetakeMode, FlashcardsSessionSummary};
use super::frontmatter::{Frontmatter, RetakeLinks, TopicMeta};
use super::play::{FlashcardsOptions, FlashcardsSelection};
use super::search::{FlashcardsSearchState, SearchParams};
use super::snapshot::FlashcardsExplorerData;
use super::storage::{
    load_flashcards_last_report_summary, load_flashcards_session_summary, store_flashcards_last_report_summary,
    store_flashcards_session_summary, KeyValueStore, StorageError,
};
use super::summary::{normalize_flashcards_session_summary, parse_flashcards_session_summary};

/// Where the shown results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOrigin {
    Url,
    Scoped,
    LastReport,
}

#[derive(Debug, Clone)]
pub struct FlashcardsStudy {
    pub selection: FlashcardsSelection,
    pub labels: FlashcardsDeckLabels,
    pub origin: Option<SummaryOrigin>,
    /// the active summary, normalized against the deck
    pub summary: Option<FlashcardsSessionSummary>,
}

impl FlashcardsStudy {
    /// Resolves the explorer query. Results carried by the URL win and are
    /// persisted; otherwise the scoped entry, then the last report, is shown.
    pub fn resolve(
        data: &FlashcardsExplorerData,
        options: &FlashcardsOptions,
        params: &SearchParams,
        store: &mut dyn KeyValueStore,
        t: &Translations,
    ) -> Result<Self, StorageError> {
        let state = FlashcardsSearchState::from_params(params);
        let selection = FlashcardsSelection::resolve(data, options, &state, t);

        let active = match parse_flashcards_session_summary(params) {
            Some(summary) => {
                store_flashcards_session_summary(store, &selection.storage_key, &summary)?;
                store_flashcards_last_report_summary(store, &selection.locale, &summary)?;
                Some((SummaryOrigin::Url, summary))
            }
            None => {
                let store: &dyn KeyValueStore = store;
                load_flashcards_session_summary(store, &selection.storage_key)
                    .map(|summary| (SummaryOrigin::Scoped, summary))
                    .or_else(|| {
                        load_flashcards_last_report_summary(store, &selection.locale)
                            .map(|summary| (SummaryOrigin::LastReport, summary))
                    })
            }
        };

        let (origin, summary) = match active {
            Some((origin, summary)) => (
                Some(origin),
                normalize_flashcards_session_summary(&summary, &selection.card_ids()),
            ),
            None => (None, None),
        };

        Ok(Self {
            labels: t.deck_labels(),
            selection,
            origin,
            summary,
        })
    }

    pub fn cards(&self) -> &[FlashcardItem] {
        &self.selection.cards
    }

    pub fn passed_count(&self) -> Option<usize> {
        self.summary.as_ref().map(|summary| summary.confirm_ids.len())
    }

    pub fn not_passed_count(&self) -> Option<usize> {
        self.passed_count()
            .map(|passed| self.cards().len().saturating_sub(passed))
    }

    pub fn highlighted(&self) -> HashSet<&str> {
        self.summary
            .iter()
            .flat_map(|summary| summary.confirm_ids.iter().map(String::as_str))
            .collect()
    }

    /// Renders the deck as markdown: a YAML header, then one section per
    /// topic in deck order.
    pub fn render_sheet(&self, t: &Translations) -> Result<String, serde_yaml_ng::Error> {
        let highlighted = self.highlighted();
        let mut slugger = Slugger::default();

        let mut sections: Vec<(&str, String, Vec<(usize, &FlashcardItem)>)> = Vec::new();
        for (index, card) in self.cards().iter().enumerate() {
            match sections.last_mut() {
                Some((slug, _, cards)) if *slug == card.topic_slug => cards.push((index + 1, card)),
                _ => {
                    let anchor = slugger.slug(self.selection.topic_title(&card.topic_slug));
                    sections.push((card.topic_slug.as_str(), anchor, vec![(index + 1, card)]));
                }
            }
        }

        let retake_all = self.selection.play_href(FlashcardsRetakeMode::All);
        let retake_discarded = self.selection.play_href(FlashcardsRetakeMode::Discarded);

        let mut fm: BTreeMap<&str, Frontmatter> = BTreeMap::new();
        let heading = self.selection.heading();
        fm.insert("title", Frontmatter::Text(&heading));
        fm.insert("locale", Frontmatter::Text(&self.selection.locale));
        fm.insert("scope", Frontmatter::Text(self.selection.state.scope.as_str()));
        if let Some(course) = self.selection.state.course.as_deref() {
            fm.insert("course", Frontmatter::Text(course));
        }
        if let Some(topic) = self.selection.state.topic.as_deref() {
            fm.insert("topic", Frontmatter::Text(topic));
        }
        fm.insert("cards", Frontmatter::Count(self.cards().len()));
        if let (Some(passed), Some(not_passed)) = (self.passed_count(), self.not_passed_count()) {
            fm.insert("passed", Frontmatter::Count(passed));
            fm.insert("notPassed", Frontmatter::Count(not_passed));
        }
        fm.insert(
            "topics",
            Frontmatter::Topics(
                sections
                    .iter()
                    .map(|(slug, anchor, cards)| TopicMeta {
                        title: self.selection.topic_title(slug),
                        slug: *slug,
                        anchor: anchor.clone(),
                        cards: cards.len(),
                    })
                    .collect(),
            ),
        );
        fm.insert(
            "retake",
            Frontmatter::Links(RetakeLinks {
                all: &retake_all,
                discarded: &retake_discarded,
            }),
        );

        let mut body = String::new();
        if self.cards().is_empty() {
            body.push_str(t.t("flashcardsNoCards"));
            body.push('\n');
        }
        if let (Some(passed), Some(not_passed)) = (self.passed_count(), self.not_passed_count()) {
            body.push_str(&format!(
                "> **{}**: {} {} · {} {}\n>\n> {}\n\n",
                t.t("flashcardsResultsTitle"),
                passed,
                t.t("flashcardsResultsPassed"),
                not_passed,
                t.t("flashcardsResultsNotPassed"),
                t.t("flashcardsPassedHighlightHint"),
            ));
        }

        for (slug, anchor, cards) in &sections {
            body.push_str(&format!("## {} {{#{}}}\n\n", self.selection.topic_title(slug), anchor));
            for (ordinal, card) in cards {
                let tag = if highlighted.contains(card.id.as_str()) {
                    format!(" · {}", self.labels.passed_tag)
                } else {
                    String::new()
                };
                body.push_str(&format!(
                    "### #{}{}\n\n**{}**: {}\n\n**{}**: {}\n\n",
                    ordinal, tag, self.labels.question, card.question, self.labels.answer, card.answer
                ));
            }
        }

        Ok(format!("---\n{}---\n\n{}", serde_yaml_ng::to_string(&fm)?, body.trim_end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::snapshot::{ExplorerCourse, ExplorerTopic};
    use crate::flashcards::storage::MemoryStore;

    fn topic(slug: &str, title: &str, ids: &[&str]) -> ExplorerTopic {
        ExplorerTopic {
            course_slug: "calc".to_string(),
            course_title: "Analisi".to_string(),
            topic_slug: slug.to_string(),
            title: title.to_string(),
            locale: "en".to_string(),
            cards: ids
                .iter()
                .map(|id| FlashcardItem {
                    id: id.to_string(),
                    question: format!("Q{}", id),
                    answer: format!("A{}", id),
                    topic_slug: slug.to_string(),
                    course_slug: "calc".to_string(),
                })
                .collect(),
        }
    }

    fn data() -> FlashcardsExplorerData {
        FlashcardsExplorerData {
            course_slug: "all-courses".to_string(),
            locale: "en".to_string(),
            courses: vec![ExplorerCourse {
                slug: "calc".to_string(),
                title: "Analysis".to_string(),
            }],
            topics: vec![
                topic("calc/limits", "Limits", &["l1", "l2"]),
                topic("calc/series", "Series", &["s1"]),
            ],
        }
    }

    fn resolve(query: &str, store: &mut MemoryStore) -> FlashcardsStudy {
        let data = data();
        let options = FlashcardsOptions::from_explorer(&data);
        FlashcardsStudy::resolve(
            &data,
            &options,
            &SearchParams::parse(query),
            store,
            &Translations::for_locale("en"),
        )
        .unwrap()
    }

    #[test]
    fn url_summary_wins_and_is_persisted() {
        let mut store = MemoryStore::new();
        let study = resolve("scope=course&mode=study&course=calc&fc_confirmed=l2&fc_passed=s1", &mut store);

        assert_eq!(study.origin, Some(SummaryOrigin::Url));
        assert_eq!(study.passed_count(), Some(1));
        assert_eq!(study.not_passed_count(), Some(2));
        assert!(study.highlighted().contains("l2"));
        assert!(store.get(&study.selection.storage_key).is_some());
        assert!(store.get("open-physica:flashcards:last-report:v1:en").is_some());

        let again = resolve("scope=course&mode=study&course=calc", &mut store);
        assert_eq!(again.origin, Some(SummaryOrigin::Scoped));
        assert_eq!(again.passed_count(), Some(1));
    }

    #[test]
    fn last_report_is_the_fallback() {
        let mut store = MemoryStore::new();
        resolve("scope=course&course=calc&fc_confirmed=l1", &mut store);

        let topic = resolve("scope=topic&course=calc&topic=calc/series", &mut store);
        assert_eq!(topic.origin, Some(SummaryOrigin::LastReport));
        // l1 is not in this deck, so nothing is highlighted
        assert_eq!(topic.passed_count(), Some(0));
        assert_eq!(topic.not_passed_count(), Some(1));
    }

    #[test]
    fn no_summary_means_no_counts() {
        let mut store = MemoryStore::new();
        let study = resolve("scope=topic", &mut store);
        assert_eq!(study.origin, None);
        assert_eq!(study.passed_count(), None);
        assert_eq!(study.selection.state.topic.as_deref(), Some("calc/limits"));
    }

    #[test]
    fn sheet_has_frontmatter_and_anchors() {
        let mut store = MemoryStore::new();
        let study = resolve("scope=course&course=calc&fc_confirmed=s1", &mut store);
        let sheet = study.render_sheet(&Translations::for_locale("en")).unwrap();

        assert!(sheet.starts_with("---\n"));
        assert!(sheet.contains("title: Analysis / Entire course\n"));
        assert!(sheet.contains("passed: 1\n"));
        assert!(sheet.contains("notPassed: 2\n"));
        assert!(sheet.contains("## Limits {#limits}"));
        assert!(sheet.contains("## Series {#series}"));
        assert!(sheet.contains("### #3 · Correct"));
        assert!(sheet.contains("**Question**: Ql1"));
        assert!(sheet.contains("fc_retake=discarded"));
    }
}
