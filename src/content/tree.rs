//! Generic tagged-node tree for MDX documents.
//!
//! Component tags (`<Flashcard>`, `<Statement kind="theorem">`, ...) become
//! [`ContentNode::Element`]s; markdown between them stays as
//! [`ContentNode::Text`]. Nothing is rendered while building the tree.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frontmatter::split_frontmatter;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MdxParseError {
    #[error("closing tag </{found}> does not match open <{expected}>")]
    MismatchedTag { expected: String, found: String },

    #[error("closing tag </{0}> has no matching open tag")]
    UnexpectedClose(String),

    #[error("tag <{0}> is never closed")]
    Unclosed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentNode {
    Text {
        value: String,
    },
    Element {
        name: String,
        #[serde(default)]
        props: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    pub fn text(value: impl Into<String>) -> Self {
        ContentNode::Text {
            value: value.into(),
        }
    }

    pub fn element(name: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Element {
            name: name.into(),
            props: BTreeMap::new(),
            children,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ContentNode::Element { name, .. } => Some(name),
            ContentNode::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Element { children, .. } => children,
            ContentNode::Text { .. } => &[],
        }
    }

    /// Writes the node back in MDX source form.
    pub fn write_source(&self, out: &mut String) {
        match self {
            ContentNode::Text { value } => out.push_str(value),
            ContentNode::Element {
                name,
                props,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in props {
                    out.push_str(&format!(" {}=\"{}\"", key, value.replace('"', "&quot;")));
                }
                if children.is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_source(out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

/// Source text of a node list, as written in the document.
pub fn source_of(nodes: &[ContentNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_source(&mut out);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTree {
    pub children: Vec<ContentNode>,
}

fn token_regex() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| {
        Regex::new(concat!(
            r"(?ms)(?P<fence>^[ \t]*(?:```|~~~)[^\n]*\n.*?^[ \t]*(?:```|~~~)[ \t]*$)",
            r"|(?P<code>`[^`\n]+`)",
            r"|(?P<escaped>\\\$)",
            r"|(?P<math>\$\$.*?\$\$|\$[^$\n]+\$)",
            r"|(?P<tag><(?P<close>/)?(?P<name>[A-Z][A-Za-z0-9_.]*)(?P<attrs>(?:\s[^<>]*?)?)\s*(?P<selfclose>/)?>)",
        ))
        .unwrap()
    })
}

fn attr_regex() -> &'static Regex {
    static ATTRS: OnceLock<Regex> = OnceLock::new();
    ATTRS.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][A-Za-z0-9_:.-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|\{([^}]*)\}))?"#)
            .unwrap()
    })
}

fn parse_props(attrs: &str) -> BTreeMap<String, String> {
    attr_regex()
        .captures_iter(attrs)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("true", |m| m.as_str());
            (caps[1].to_string(), value.trim().to_string())
        })
        .collect()
}

struct OpenElement {
    name: String,
    props: BTreeMap<String, String>,
    children: Vec<ContentNode>,
}

fn push_text(children: &mut Vec<ContentNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(ContentNode::Text { value }) = children.last_mut() {
        value.push_str(text);
    } else {
        children.push(ContentNode::text(text));
    }
}

/// Builds the content tree of an MDX document. Frontmatter is dropped,
/// code and TeX math are kept as opaque text.
pub fn parse_mdx(raw: &str) -> Result<ContentTree, MdxParseError> {
    let (_, body) = split_frontmatter(raw);

    let mut root: Vec<ContentNode> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut cursor = 0;

    for caps in token_regex().captures_iter(body) {
        let Some(whole) = caps.get(0) else { continue };
        let before = &body[cursor..whole.start()];
        cursor = whole.end();

        let children = match stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut root,
        };
        push_text(children, before);

        if caps.name("tag").is_none() {
            push_text(children, &caps[0]);
            continue;
        }

        handle_tag(&caps, &mut stack, &mut root)?;
    }

    let children = match stack.last_mut() {
        Some(open) => &mut open.children,
        None => &mut root,
    };
    push_text(children, &body[cursor..]);

    if let Some(open) = stack.pop() {
        return Err(MdxParseError::Unclosed(open.name));
    }

    Ok(ContentTree { children: root })
}

fn handle_tag(
    caps: &Captures,
    stack: &mut Vec<OpenElement>,
    root: &mut Vec<ContentNode>,
) -> Result<(), MdxParseError> {
    let name = caps["name"].to_string();
    let attrs = caps.name("attrs").map_or("", |m| m.as_str());

    if caps.name("close").is_some() {
        let open = stack
            .pop()
            .ok_or_else(|| MdxParseError::UnexpectedClose(name.clone()))?;
        if open.name != name {
            return Err(MdxParseError::MismatchedTag {
                expected: open.name,
                found: name,
            });
        }
        let element = ContentNode::Element {
            name: open.name,
            props: open.props,
            children: open.children,
        };
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => root.push(element),
        }
        return Ok(());
    }

    let props = parse_props(attrs);
    if caps.name("selfclose").is_some() {
        let element = ContentNode::Element {
            name,
            props,
            children: Vec::new(),
        };
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => root.push(element),
        }
    } else {
        stack.push(OpenElement {
            name,
            props,
            children: Vec::new(),
        });
    }

    Ok(())
}
