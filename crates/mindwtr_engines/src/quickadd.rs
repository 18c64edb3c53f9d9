#![forbid(unsafe_code)]

use mindwtr_contracts::TaskStatus;

/// Result of tokenizing a quick-add line. Whatever is not a recognized
/// token becomes the title, whitespace-normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuickAdd {
    pub title: String,
    pub tags: Vec<String>,
    pub contexts: Vec<String>,
    pub status: Option<TaskStatus>,
}

/// Parses the quick-add syntax the clients type into the capture bar:
/// `#tag` and `@context` tokens are collected, `!status` picks an initial
/// status, everything else joins into the title. Unknown `!` tokens are
/// kept as title words rather than dropped.
pub fn parse_quick_add(input: &str) -> QuickAdd {
    let mut parsed = QuickAdd::default();
    let mut title_words: Vec<&str> = Vec::new();

    for word in input.split_whitespace() {
        if let Some(tag) = word.strip_prefix('#').filter(|t| !t.is_empty()) {
            if !parsed.tags.iter().any(|existing| existing == tag) {
                parsed.tags.push(tag.to_string());
            }
            continue;
        }
        if let Some(context) = word.strip_prefix('@').filter(|c| !c.is_empty()) {
            let context = format!("@{context}");
            if !parsed.contexts.contains(&context) {
                parsed.contexts.push(context);
            }
            continue;
        }
        if let Some(status) = word.strip_prefix('!').and_then(TaskStatus::parse) {
            parsed.status = Some(status);
            continue;
        }
        title_words.push(word);
    }

    parsed.title = title_words.join(" ");
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_becomes_the_title() {
        let parsed = parse_quick_add("  call the   bank ");
        assert_eq!(parsed.title, "call the bank");
        assert!(parsed.tags.is_empty());
        assert!(parsed.contexts.is_empty());
        assert_eq!(parsed.status, None);
    }

    #[test]
    fn tokens_are_stripped_from_the_title() {
        let parsed = parse_quick_add("buy stamps #errands @town !next");
        assert_eq!(parsed.title, "buy stamps");
        assert_eq!(parsed.tags, vec!["errands".to_string()]);
        assert_eq!(parsed.contexts, vec!["@town".to_string()]);
        assert_eq!(parsed.status, Some(TaskStatus::Next));
    }

    #[test]
    fn unknown_status_token_stays_in_the_title() {
        let parsed = parse_quick_add("ship it !urgent");
        assert_eq!(parsed.title, "ship it !urgent");
        assert_eq!(parsed.status, None);
    }

    #[test]
    fn duplicate_tags_collapse() {
        let parsed = parse_quick_add("read #books #books");
        assert_eq!(parsed.tags, vec!["books".to_string()]);
    }

    #[test]
    fn bare_markers_are_title_words() {
        let parsed = parse_quick_add("ping # @ team");
        assert_eq!(parsed.title, "ping # @ team");
    }
}
