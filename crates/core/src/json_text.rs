//! Helpers for pulling a JSON object out of free-form model text. Shared
//! by the recommendation stage and the agent output recovery pipeline.

/// Locate the most likely JSON object in `text`: a fenced code block if
/// one exists, otherwise the first balanced brace-delimited object.
pub fn first_json_object(text: &str) -> Option<&str> {
    fenced_block(text).or_else(|| first_balanced_object(text))
}

/// The contents of the first ``` or ```json fence containing an object.
pub fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after_open.find('\n').map(|index| index + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    let inner = body[..close].trim();
    inner.starts_with('{').then_some(inner)
}

/// The first substring of `text` that forms a balanced `{...}` object,
/// ignoring braces inside string literals.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{fenced_block, first_balanced_object, first_json_object};

    #[test]
    fn fenced_block_with_language_tag_is_found() {
        let text = "Result:\n```json\n{\"covered\": true}\n```\nDone.";
        assert_eq!(fenced_block(text), Some("{\"covered\": true}"));
    }

    #[test]
    fn fence_without_an_object_is_skipped() {
        let text = "```\nplain text\n```";
        assert!(fenced_block(text).is_none());
    }

    #[test]
    fn balanced_object_spans_nested_braces() {
        let text = "prefix {\"a\": {\"b\": 1}, \"c\": 2} suffix";
        assert_eq!(first_balanced_object(text), Some("{\"a\": {\"b\": 1}, \"c\": 2}"));
    }

    #[test]
    fn braces_inside_string_literals_are_ignored() {
        let text = r#"{"notes": "uses } inside", "ok": true}"#;
        assert_eq!(first_balanced_object(text), Some(text));
    }

    #[test]
    fn fenced_block_wins_over_bare_object() {
        let text = "{\"early\": 1}\n```json\n{\"fenced\": 2}\n```";
        assert_eq!(first_json_object(text), Some("{\"fenced\": 2}"));
    }

    #[test]
    fn unbalanced_text_yields_none() {
        assert!(first_json_object("no discernible structure").is_none());
        assert!(first_json_object("{ broken").is_none());
    }
}
