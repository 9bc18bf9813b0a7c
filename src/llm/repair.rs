/// JSON recovery for model output
///
/// Models sometimes wrap JSON in Markdown fences or emit raw control
/// characters inside string literals. Output is parsed as-is first, then
/// each strategy in `REPAIR_PIPELINE` is tried in order, from the one that
/// preserves the text to the one that discards layout.
use serde_json::Value;

/// Textual repair applied before a parse retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// Escape raw `\n`, `\r` and `\t` found inside string literals
    EscapeControlCharsInStrings,
    /// Turn every raw newline, carriage return and tab into a space and drop other control characters
    CollapseWhitespace,
}

/// Repairs in the order they are attempted
pub const REPAIR_PIPELINE: [Repair; 2] = [
    Repair::EscapeControlCharsInStrings,
    Repair::CollapseWhitespace,
];

impl Repair {
    pub fn name(&self) -> &'static str {
        match self {
            Repair::EscapeControlCharsInStrings => "escape_control_chars_in_strings",
            Repair::CollapseWhitespace => "collapse_whitespace",
        }
    }

    pub fn apply(&self, input: &str) -> String {
        match self {
            Repair::EscapeControlCharsInStrings => escape_control_chars_in_strings(input),
            Repair::CollapseWhitespace => collapse_whitespace(input),
        }
    }
}

/// Successful parse and the repair it needed, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub value: Value,
    pub repair: Option<Repair>,
}

/// Remove a surrounding Markdown code fence
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse model output, escalating through the repair pipeline
///
/// On total failure returns the message of the last parser error.
pub fn parse_model_json(raw: &str) -> Result<Parsed, String> {
    let text = strip_code_fences(raw);

    let mut last_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(Parsed { value, repair: None }),
        Err(e) => e.to_string(),
    };

    for repair in REPAIR_PIPELINE {
        let repaired = repair.apply(text);
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => {
                tracing::debug!(repair = repair.name(), "recovered malformed model JSON");
                return Ok(Parsed {
                    value,
                    repair: Some(repair),
                });
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(last_error)
}

fn escape_control_chars_in_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }

    out
}

fn collapse_whitespace(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        // Unterminated fence keeps the body
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_json_needs_no_repair() {
        let parsed = parse_model_json(r#"{"themes": ["Trust"]}"#).unwrap();
        assert_eq!(parsed.value, json!({"themes": ["Trust"]}));
        assert_eq!(parsed.repair, None);
    }

    #[test]
    fn test_fenced_json_needs_no_repair() {
        let parsed = parse_model_json("```json\n{\"ok\": true}\n```").unwrap();
        assert_eq!(parsed.value, json!({"ok": true}));
        assert_eq!(parsed.repair, None);
    }

    #[test]
    fn test_raw_newline_inside_string_is_escaped() {
        let raw = "{\"story\": \"Ruth stayed.\nShe gleaned.\tAlways.\"}";
        let parsed = parse_model_json(raw).unwrap();
        assert_eq!(parsed.repair, Some(Repair::EscapeControlCharsInStrings));
        assert_eq!(parsed.value["story"], "Ruth stayed.\nShe gleaned.\tAlways.");
    }

    #[test]
    fn test_escape_repair_leaves_structure_alone() {
        let raw = "{\n  \"a\": \"x\ny\",\n  \"b\": \"say \\\"hi\\\"\"\n}";
        let repaired = Repair::EscapeControlCharsInStrings.apply(raw);
        assert_eq!(repaired, "{\n  \"a\": \"x\\ny\",\n  \"b\": \"say \\\"hi\\\"\"\n}");
    }

    #[test]
    fn test_other_control_chars_need_collapse() {
        let raw = "{\"verse\": \"Be still\u{0008} and know\nthat I am God\"}";
        let parsed = parse_model_json(raw).unwrap();
        assert_eq!(parsed.repair, Some(Repair::CollapseWhitespace));
        assert_eq!(parsed.value["verse"], "Be still and know that I am God");
    }

    #[test]
    fn test_unrepairable_reports_parser_message() {
        let err = parse_model_json("I'm sorry, I can't help with that.").unwrap_err();
        assert!(err.contains("expected"), "unexpected message: {err}");
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(
            REPAIR_PIPELINE.map(|r| r.name()),
            ["escape_control_chars_in_strings", "collapse_whitespace"]
        );
    }
}
