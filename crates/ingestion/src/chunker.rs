//! Paragraph chunking

/// Split canonical text into trimmed, non-empty paragraphs
pub fn split_paragraphs(content: &str) -> Vec<String> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rough token estimate used for context budgeting
pub fn estimate_tokens(text: &str) -> i32 {
    (text.len() / 4) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let content = "Chapter 3: Dawn\nStatus: draft\n\nHello.\n\nWorld.\n";
        assert_eq!(
            split_paragraphs(content),
            vec!["Chapter 3: Dawn\nStatus: draft", "Hello.", "World."]
        );
    }

    #[test]
    fn test_split_skips_empty_paragraphs() {
        assert_eq!(split_paragraphs("a\n\n\n\n  \n\nb"), vec!["a", "b"]);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n\n\n").is_empty());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }
}
