//! # Placeholder Tokenizer
//!
//! One matcher for the `{name}` placeholder syntax, shared by every
//! substitution and cleanup pass so text and image handling can never
//! disagree about what counts as a token.
//!
//! Tokens are literal substrings: an opening brace, one or more word
//! characters (ASCII letters, digits, underscore), a closing brace. There
//! is no escaping mechanism; `{` followed by anything else is plain text.

/// A token occurrence inside a string: byte range of the whole `{name}`
/// substring plus the bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub start: usize,
    pub end: usize,
    pub name: &'a str,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Find every `{name}` occurrence in `text`, left to right, non-overlapping.
pub fn find_tokens(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let mut j = i + 1;
            while j < bytes.len() && is_word_byte(bytes[j]) {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == b'}' {
                tokens.push(Token {
                    start: i,
                    end: j + 1,
                    name: &text[i + 1..j],
                });
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    tokens
}

/// Does `text` contain at least one well-formed `{name}` token?
pub fn contains_token(text: &str) -> bool {
    !find_tokens(text).is_empty()
}

/// Does `text` contain any of the given keys as a `{key}` token?
pub fn contains_any<'a, I>(text: &str, keys: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter().any(|k| text.contains(&wrap(k)))
}

/// The literal placeholder form of a key: `{key}`.
pub fn wrap(key: &str) -> String {
    format!("{{{}}}", key)
}

/// The reserved image-slot token for 1-based slot `k`: `{img_k}`.
pub fn image_slot(k: u32) -> String {
    format!("{{img_{}}}", k)
}

/// The reserved caption token for 1-based slot `k`: `{info_k}`.
pub fn caption_slot(k: u32) -> String {
    format!("{{info_{}}}", k)
}

/// Replace every well-formed token in `text` with the empty string.
pub fn blank_all_tokens(text: &str) -> String {
    let tokens = find_tokens(text);
    if tokens.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for t in &tokens {
        out.push_str(&text[last..t.start]);
        last = t.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tokens_basic() {
        let tokens = find_tokens("a {name} b {img_1} c");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "name");
        assert_eq!(tokens[1].name, "img_1");
        assert_eq!(&"a {name} b {img_1} c"[tokens[1].start..tokens[1].end], "{img_1}");
    }

    #[test]
    fn test_find_tokens_ignores_malformed() {
        assert!(find_tokens("{}").is_empty());
        assert!(find_tokens("{no close").is_empty());
        assert!(find_tokens("{has space}").is_empty());
        assert!(find_tokens("no braces").is_empty());
    }

    #[test]
    fn test_find_tokens_adjacent() {
        let tokens = find_tokens("{a}{b}");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "a");
        assert_eq!(tokens[1].name, "b");
    }

    #[test]
    fn test_cjk_text_around_tokens() {
        let tokens = find_tokens("工程名稱：{project_name}，日期：{date}");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "project_name");
        assert_eq!(tokens[1].name, "date");
    }

    #[test]
    fn test_blank_all_tokens() {
        assert_eq!(blank_all_tokens("x{a}y{img_3}z"), "xyz");
        assert_eq!(blank_all_tokens("no tokens"), "no tokens");
        assert_eq!(blank_all_tokens("說明：{info_5}"), "說明：");
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("hello {name}", ["name"]));
        assert!(!contains_any("hello {name}", ["other"]));
        assert!(!contains_any("name without braces", ["name"]));
    }

    #[test]
    fn test_slot_helpers() {
        assert_eq!(image_slot(1), "{img_1}");
        assert_eq!(caption_slot(8), "{info_8}");
        assert_eq!(wrap("date"), "{date}");
    }
}
