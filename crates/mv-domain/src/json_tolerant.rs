//! Tolerant JSON parsing for LLM output (spec §9 "Dynamic structures &
//! LLM JSON"). LLM responses arrive as free-form text; this strips
//! non-printable control characters and trailing commas before handing
//! the text to `serde_json`, and extracts the first top-level JSON value
//! if the model wrapped it in prose or a markdown code fence.

/// Attempt to parse `raw` as a `T`, tolerating the common ways an LLM
/// mangles JSON output. Returns `None` on unrecoverable parse failure —
/// callers degrade the stage rather than propagating an error (spec §9).
pub fn parse_tolerant<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let cleaned = strip_control_chars(raw);
    let candidate = extract_json_value(&cleaned)?;
    let candidate = strip_trailing_commas(&candidate);
    serde_json::from_str(&candidate).ok()
}

fn strip_control_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}

/// Find the first balanced `{...}` or `[...]` span in the text, skipping
/// any surrounding prose or markdown fences.
fn extract_json_value(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find(|c| c == '{' || c == '[')?;
    let open = bytes[start] as char;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in text.char_indices().skip(start) {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove trailing commas before `}` or `]` — a common LLM formatting slip.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        a: u32,
        b: String,
    }

    #[test]
    fn parses_clean_json() {
        let s: Sample = parse_tolerant(r#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(s, Sample { a: 1, b: "x".into() });
    }

    #[test]
    fn parses_json_wrapped_in_prose_and_fences() {
        let raw = "Sure, here you go:\n```json\n{\"a\": 2, \"b\": \"y\"}\n```\nHope that helps!";
        let s: Sample = parse_tolerant(raw).unwrap();
        assert_eq!(s, Sample { a: 2, b: "y".into() });
    }

    #[test]
    fn strips_trailing_commas() {
        let raw = "{\"a\": 3, \"b\": \"z\",}";
        let s: Sample = parse_tolerant(raw).unwrap();
        assert_eq!(s, Sample { a: 3, b: "z".into() });
    }

    #[test]
    fn strips_control_characters() {
        let raw = "{\"a\": 4, \"b\": \"w\"}\u{0007}";
        let s: Sample = parse_tolerant(raw).unwrap();
        assert_eq!(s, Sample { a: 4, b: "w".into() });
    }

    #[test]
    fn returns_none_on_garbage() {
        let s: Option<Sample> = parse_tolerant("not json at all");
        assert!(s.is_none());
    }

    #[test]
    fn returns_none_on_empty_string() {
        let s: Option<Sample> = parse_tolerant("");
        assert!(s.is_none());
    }
}
