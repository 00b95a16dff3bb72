use serde::Serialize;

use crate::content::{parse_mdx, source_of, ContentNode, ContentTree, RenderCache};

use super::card::FlashcardItem;
use super::path::{normalize_flashcard_path, parse_flashcard_data_path};

/// A recognized `<topic>/flashcards.<locale>.mdx` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSourceFile {
    /// normalized path, also the id namespace of its cards
    pub path: String,
    pub course_slug: String,
    pub topic_slug: String,
    pub locale: String,
}

impl FlashcardSourceFile {
    pub fn from_path(path: &str) -> Option<Self> {
        let parsed = parse_flashcard_data_path(path)?;
        Some(Self {
            path: normalize_flashcard_path(path),
            course_slug: parsed.course_slug,
            topic_slug: parsed.topic_slug,
            locale: parsed.locale,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Flashcard,
    Question,
    Answer,
}

impl Marker {
    fn of(node: &ContentNode) -> Option<Self> {
        match node.name()? {
            "Flashcard" => Some(Marker::Flashcard),
            "FlashcardQuestion" => Some(Marker::Question),
            "FlashcardAnswer" => Some(Marker::Answer),
            _ => None,
        }
    }
}

fn direct_child(children: &[ContentNode], marker: Marker) -> Option<&ContentNode> {
    children.iter().find(|child| Marker::of(child) == Some(marker))
}

/// Mines every well-formed flashcard of `tree`, in document order.
pub fn extract_flashcards(
    tree: &ContentTree,
    file: &FlashcardSourceFile,
    cache: &RenderCache,
) -> Vec<FlashcardItem> {
    let mut cards = Vec::new();
    traverse(&tree.children, file, cache, &mut cards);
    cards
}

fn traverse(
    nodes: &[ContentNode],
    file: &FlashcardSourceFile,
    cache: &RenderCache,
    cards: &mut Vec<FlashcardItem>,
) {
    for node in nodes {
        if Marker::of(node) != Some(Marker::Flashcard) {
            traverse(node.children(), file, cache, cards);
            continue;
        }

        // flashcards never nest, so the card's subtree is not searched further
        let Some((question, answer)) = render_card(node.children(), &file.locale, cache) else {
            log::debug!("{}: dropping malformed flashcard", file.path);
            continue;
        };

        cards.push(FlashcardItem {
            id: FlashcardItem::auto_id(&file.path, cards.len() + 1),
            question,
            answer,
            topic_slug: file.topic_slug.clone(),
            course_slug: file.course_slug.clone(),
        });
    }
}

fn render_card(
    children: &[ContentNode],
    locale: &str,
    cache: &RenderCache,
) -> Option<(String, String)> {
    let question = source_of(direct_child(children, Marker::Question)?.children());
    let answer = source_of(direct_child(children, Marker::Answer)?.children());

    if question.trim().is_empty() || answer.trim().is_empty() {
        return None;
    }

    let question = cache.render(question.trim(), locale);
    let answer = cache.render(answer.trim(), locale);
    if question.is_empty() || answer.is_empty() {
        return None;
    }

    Some((question, answer))
}

/// Parses and extracts one raw MDX document. A document that fails to parse
/// yields no cards.
pub fn extract_flashcards_from_source(
    raw: &str,
    file: &FlashcardSourceFile,
    cache: &RenderCache,
) -> Vec<FlashcardItem> {
    match parse_mdx(raw) {
        Ok(tree) => extract_flashcards(&tree, file, cache),
        Err(e) => {
            log::warn!("{}: skipping flashcards, {}", file.path, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> FlashcardSourceFile {
        FlashcardSourceFile::from_path("Calc/Limits/flashcards.it.mdx").unwrap()
    }

    const DOC: &str = r#"---
title: Limiti
---

# Limiti

<Flashcard>
  <FlashcardQuestion>Quanto vale $\lim_{x \to 0} \frac{\sin x}{x}$?</FlashcardQuestion>
  <FlashcardAnswer>Vale **1**.</FlashcardAnswer>
</Flashcard>

<Flashcard>
  <FlashcardQuestion>Senza risposta</FlashcardQuestion>
</Flashcard>

<Statement kind="example">
<Flashcard>
  <FlashcardAnswer>Risposta prima</FlashcardAnswer>
  <FlashcardQuestion>Domanda dopo</FlashcardQuestion>
</Flashcard>
</Statement>
"#;

    #[test]
    fn extracts_in_document_order_with_stable_ids() {
        let cache = RenderCache::default();
        let cards = extract_flashcards_from_source(DOC, &file(), &cache);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "auto:calc/limits/flashcards.it.mdx#1");
        assert_eq!(cards[1].id, "auto:calc/limits/flashcards.it.mdx#2");
        assert!(cards[0].question.contains("math math-inline"));
        assert_eq!(cards[0].answer, "Vale <strong>1</strong>.");
        assert_eq!(cards[1].question, "Domanda dopo");
        assert_eq!(cards[1].topic_slug, "calc/limits");
        assert_eq!(cards[1].course_slug, "calc");
    }

    #[test]
    fn extraction_is_idempotent() {
        let cache = RenderCache::default();
        let first = extract_flashcards_from_source(DOC, &file(), &cache);
        let second = extract_flashcards_from_source(DOC, &file(), &RenderCache::new(1));
        assert_eq!(first, second);
    }

    #[test]
    fn nested_flashcards_are_not_discovered() {
        let tree = ContentTree {
            children: vec![ContentNode::element(
                "Flashcard",
                vec![
                    ContentNode::element("FlashcardQuestion", vec![ContentNode::text("q")]),
                    ContentNode::element("FlashcardAnswer", vec![ContentNode::text("a")]),
                    ContentNode::element(
                        "Flashcard",
                        vec![
                            ContentNode::element("FlashcardQuestion", vec![ContentNode::text("q2")]),
                            ContentNode::element("FlashcardAnswer", vec![ContentNode::text("a2")]),
                        ],
                    ),
                ],
            )],
        };

        let cards = extract_flashcards(&tree, &file(), &RenderCache::default());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "q");
    }

    #[test]
    fn nested_components_survive_in_fragments() {
        let doc = "<Flashcard><FlashcardQuestion>Vedi <Ref to=\"a\">qui</Ref></FlashcardQuestion><FlashcardAnswer>ok</FlashcardAnswer></Flashcard>";
        let cards = extract_flashcards_from_source(doc, &file(), &RenderCache::default());
        assert_eq!(cards.len(), 1);
        assert!(cards[0].question.starts_with("Vedi &lt;Ref to="));
        assert!(cards[0].question.ends_with("qui&lt;/Ref&gt;"));
    }

    #[test]
    fn broken_documents_yield_nothing() {
        let cards = extract_flashcards_from_source(
            "<Flashcard><FlashcardQuestion>q</FlashcardAnswer>",
            &file(),
            &RenderCache::default(),
        );
        assert!(cards.is_empty());
    }

    fn card(question: &str) -> String {
        format!(
            "<Flashcard><FlashcardQuestion>{}</FlashcardQuestion><FlashcardAnswer>a</FlashcardAnswer></Flashcard>\n\n",
            question
        )
    }

    #[test]
    fn ids_only_depend_on_own_document() {
        let cache = RenderCache::default();
        let other = FlashcardSourceFile::from_path("calc/derivatives/flashcards.it.mdx").unwrap();

        let before = extract_flashcards_from_source(DOC, &file(), &cache);
        let other_before = extract_flashcards_from_source(&(card("x") + &card("y")), &other, &cache);
        assert_eq!(other_before[0].question, "x");

        let reordered = format!("# Derivate\n\n{}Testo.\n\n{}{}", card("y"), card("z"), card("x"));
        let other_after = extract_flashcards_from_source(&reordered, &other, &cache);
        let after = extract_flashcards_from_source(DOC, &file(), &cache);

        assert_eq!(before, after);
        let pairs: Vec<(&str, &str)> = other_after
            .iter()
            .map(|card| (card.id.as_str(), card.question.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("auto:calc/derivatives/flashcards.it.mdx#1", "y"),
                ("auto:calc/derivatives/flashcards.it.mdx#2", "z"),
                ("auto:calc/derivatives/flashcards.it.mdx#3", "x"),
            ]
        );
    }

    #[test]
    fn math_with_angle_brackets_does_not_break_the_document() {
        let doc = format!("Il valore medio $<E>$ si conserva.\n\n{}", card("q"));
        let cards = extract_flashcards_from_source(&doc, &file(), &RenderCache::default());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "q");
    }
}
