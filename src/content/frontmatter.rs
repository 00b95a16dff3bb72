use serde::Deserialize;

/// The subset of page frontmatter the flashcards catalog reads.
#[derive(Debug, Default, Deserialize)]
pub struct PageFrontmatter {
    #[serde(default)]
    pub title: Option<String>,
}

/// Splits a leading `---` YAML block from the body. Documents without a
/// closed frontmatter block are returned whole.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let trimmed = raw.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
    else {
        return (None, trimmed);
    };

    if let Some(body) = rest.strip_prefix("---") {
        return (Some(""), body.trim_start_matches(['\r', '\n']));
    }

    match rest.find("\n---") {
        Some(end) => {
            let yaml = &rest[..end];
            let body = &rest[end + 4..];
            let body = body
                .split_once('\n')
                .map(|(_, after)| after)
                .unwrap_or_default();
            (Some(yaml), body)
        }
        None => (None, trimmed),
    }
}

/// Parses the frontmatter of `raw`. Malformed YAML reads as empty.
pub fn parse_frontmatter(raw: &str) -> PageFrontmatter {
    match split_frontmatter(raw).0 {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml_ng::from_str(yaml)
            .map_err(|e| log::debug!("ignoring malformed frontmatter: {}", e))
            .unwrap_or_default(),
        _ => PageFrontmatter::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_frontmatter_from_body() {
        let raw = "---\ntitle: Limiti\n---\n\n# Body\n";
        let (yaml, body) = split_frontmatter(raw);
        assert_eq!(yaml, Some("title: Limiti"));
        assert_eq!(body, "\n# Body\n");
    }

    #[test]
    fn leaves_unclosed_frontmatter_alone() {
        let raw = "---\ntitle: nope\n# Body";
        assert_eq!(split_frontmatter(raw), (None, raw));
    }

    #[test]
    fn reads_title() {
        let fm = parse_frontmatter("---\ntitle: \"Derivate\"\ndescription: x\n---\nbody");
        assert_eq!(fm.title.as_deref(), Some("Derivate"));
        assert!(parse_frontmatter("---\ntitle: [unclosed\n---\n").title.is_none());
        assert!(parse_frontmatter("no frontmatter").title.is_none());
    }
}
