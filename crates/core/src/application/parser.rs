// Response Parser
// Pure extraction of structured JSON from free-text agent output.
// No I/O; every function here is deterministic on its input.

use serde_json::Value;

/// Outcome of an extraction pass
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub success: bool,
    /// Extracted JSON value, or the trimmed raw text when nothing parsed
    pub data: Value,
    pub error: Option<String>,
}

/// Convert raw process output into structured data.
///
/// When `expect_json` is false the trimmed text is returned unchanged.
/// Otherwise three strategies run in order, stopping at the first that
/// yields valid JSON:
///
/// 1. the whole trimmed text parsed directly;
/// 2. a fenced code block labeled `json`, or failing that the first
///    fence whose body opens with `{` or `[`;
/// 3. a balanced-bracket scan from the first `{` or `[` in the text.
pub fn parse(raw: &str, expect_json: bool) -> Parsed {
    let trimmed = raw.trim();

    if !expect_json {
        return Parsed {
            success: true,
            data: Value::String(trimmed.to_string()),
            error: None,
        };
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return ok(value);
    }

    if let Some(body) = fenced_candidate(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
            return ok(value);
        }
    }

    if let Some(candidate) = balanced_candidate(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return ok(value);
        }
    }

    Parsed {
        success: false,
        data: Value::String(trimmed.to_string()),
        error: Some(
            "no extraction strategy (direct, fenced block, bracket scan) yielded valid JSON"
                .to_string(),
        ),
    }
}

/// Shallow shape check: `data` is a non-null object containing every
/// required key. Value types and nested structure are not validated.
pub fn validate_shape(data: &Value, required_keys: &[&str]) -> bool {
    match data.as_object() {
        Some(map) => required_keys.iter().all(|key| map.contains_key(*key)),
        None => false,
    }
}

fn ok(value: Value) -> Parsed {
    Parsed {
        success: true,
        data: value,
        error: None,
    }
}

/// Pick the body of the most promising fenced code block: a block
/// explicitly labeled `json` wins; otherwise the first block whose body
/// opens with a bracket.
fn fenced_candidate(text: &str) -> Option<&str> {
    let blocks = fenced_blocks(text);

    if let Some((_, body)) = blocks
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case("json"))
    {
        return Some(*body);
    }

    blocks
        .iter()
        .find(|(_, body)| matches!(body.trim_start().chars().next(), Some('{') | Some('[')))
        .map(|(_, body)| *body)
}

/// All ``` fenced blocks as (label, body) pairs, in document order.
/// Unterminated fences are ignored.
fn fenced_blocks(text: &str) -> Vec<(&str, &str)> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let Some(label_end) = after.find('\n') else {
            break;
        };
        let label = after[..label_end].trim();
        let body_start = label_end + 1;
        let Some(close) = after[body_start..].find("```") else {
            break;
        };
        blocks.push((label, &after[body_start..body_start + close]));
        rest = &after[body_start + close + 3..];
    }

    blocks
}

/// Bracket-scanner states. Explicit so the boundary detector is a small
/// auditable machine rather than ad hoc flag juggling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Default,
    InString,
    Escaped,
}

/// Substring from the first `{` or `[` (whichever occurs first) to the
/// position where its nesting depth returns to zero. Brackets inside
/// double-quoted strings are ignored, and backslash escapes inside those
/// strings are honored.
fn balanced_candidate(text: &str) -> Option<&str> {
    let (start, open) = text
        .char_indices()
        .find(|(_, c)| *c == '{' || *c == '[')?;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth: usize = 0;
    let mut state = ScanState::Default;

    for (i, ch) in text[start..].char_indices() {
        match state {
            ScanState::Default => {
                if ch == '"' {
                    state = ScanState::InString;
                } else if ch == open {
                    depth += 1;
                } else if ch == close {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(&text[start..start + i + ch.len_utf8()]);
                    }
                }
            }
            ScanState::InString => {
                if ch == '\\' {
                    state = ScanState::Escaped;
                } else if ch == '"' {
                    state = ScanState::Default;
                }
            }
            ScanState::Escaped => state = ScanState::InString,
        }
    }

    None
}
