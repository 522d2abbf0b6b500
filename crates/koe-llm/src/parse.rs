//! Defensive extraction of JSON from model output.
//!
//! Models wrap JSON in markdown fences, prepend prose, or append commentary.
//! These helpers find the JSON anyway, without any network involvement.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LlmError;

/// Characters of the raw response quoted in parse errors.
const SNIPPET_CHARS: usize = 120;

/// Return the body of the first markdown code fence, or the trimmed text when
/// there is none. A language tag after the opening fence is dropped.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[open + 3..];
    let body = match after.find('\n') {
        Some(newline)
            if after[..newline]
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            &after[newline + 1..]
        }
        _ => after,
    };
    let end = body.find("```").unwrap_or(body.len());
    body[..end].trim()
}

/// Every top-level JSON object or array found in `text`, in order.
///
/// The fenced body is tried as a whole first; otherwise balanced `{...}` and
/// `[...]` spans are scanned and kept when they parse.
#[must_use]
pub fn json_candidates(text: &str) -> Vec<Value> {
    let body = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if value.is_object() || value.is_array() {
            return vec![value];
        }
    }

    let mut found = scan_spans(body);
    if found.is_empty() && body.len() != text.trim().len() {
        found = scan_spans(text);
    }
    found
}

/// Deserialize the first JSON candidate that fits `T`.
///
/// # Errors
///
/// Returns [`LlmError::Parse`] when no candidate deserializes into `T`.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    json_candidates(text)
        .into_iter()
        .find_map(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| LlmError::Parse(format!("no usable JSON in response: {}", snippet(text))))
}

/// Locate a list of items: the `field` array of the first object that has
/// one, or else the first bare array.
///
/// # Errors
///
/// Returns [`LlmError::Parse`] when neither shape is present.
pub fn find_array_field(text: &str, field: &str) -> Result<Vec<Value>, LlmError> {
    let candidates = json_candidates(text);

    let from_object = candidates.iter().find_map(|value| {
        value
            .get(field)
            .and_then(Value::as_array)
            .cloned()
    });
    if let Some(items) = from_object {
        return Ok(items);
    }

    candidates
        .into_iter()
        .find_map(|value| match value {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .ok_or_else(|| {
            LlmError::Parse(format!(
                "no `{field}` array in response: {}",
                snippet(text)
            ))
        })
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > SNIPPET_CHARS {
        format!("{}...", trimmed.chars().take(SNIPPET_CHARS).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

fn scan_spans(text: &str) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'{' | b'[') {
            if let Some(end) = matching_close(bytes, i) {
                if let Ok(value) = serde_json::from_str::<Value>(&text[i..=end]) {
                    values.push(value);
                    i = end + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    values
}

/// Index of the bracket closing the one at `start`, skipping string contents.
fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        id: i32,
        name: String,
    }

    #[rstest]
    #[case("```json\n{\"a\": 1}\n```", "{\"a\": 1}")]
    #[case("```\n[1, 2]\n```", "[1, 2]")]
    #[case("Here you go:\n```JSON\n{\"a\": 1}\n```\nThanks", "{\"a\": 1}")]
    #[case("```{\"a\": 1}```", "{\"a\": 1}")]
    #[case("  {\"a\": 1}  ", "{\"a\": 1}")]
    fn strips_fences(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(strip_code_fences(raw), expected);
    }

    #[test]
    fn plain_json_is_single_candidate() {
        let values = json_candidates(r#"{"clusters": []}"#);
        assert_eq!(values, vec![json!({"clusters": []})]);
    }

    #[test]
    fn finds_json_inside_prose() {
        let raw = "Sure! Here is the result: {\"id\": 1, \"name\": \"速度\"} Hope it helps.";
        let named: Named = parse_json(raw).unwrap();
        assert_eq!(
            named,
            Named {
                id: 1,
                name: "速度".into()
            }
        );
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = r#"Result: {"id": 2, "name": "a } tricky [ name"} done"#;
        let named: Named = parse_json(raw).unwrap();
        assert_eq!(named.name, "a } tricky [ name");
    }

    #[test]
    fn skips_unparseable_bracket_spans() {
        let raw = "[note] the answer is {\"id\": 3, \"name\": \"x\"}";
        let named: Named = parse_json(raw).unwrap();
        assert_eq!(named.id, 3);
    }

    #[test]
    fn parse_error_quotes_response() {
        let err = parse_json::<Named>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, LlmError::Parse(ref m) if m.contains("cannot help")));
    }

    #[test]
    fn array_field_from_wrapping_object() {
        let raw = "```json\n{\"issues\": [{\"title\": \"a\"}, {\"title\": \"b\"}]}\n```";
        let items = find_array_field(raw, "issues").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["title"], "b");
    }

    #[test]
    fn array_field_falls_back_to_bare_array() {
        let raw = "Agenda:\n[{\"title\": \"a\"}]";
        let items = find_array_field(raw, "issues").unwrap();
        assert_eq!(items, vec![json!({"title": "a"})]);
    }

    #[test]
    fn array_field_missing_is_parse_error() {
        let err = find_array_field(r#"{"other": 1}"#, "issues").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[test]
    fn unterminated_json_is_parse_error() {
        assert!(find_array_field(r#"{"issues": [{"title": "a"}"#, "issues").is_err());
    }
}
