//! Lenient parsers for semi-structured model output.
//!
//! The primary path pulls a JSON object or array out of whatever the model
//! returned (fences, stray prose and all). The fallback path reads the
//! `<<TAG>>` marker-block format requested by the secondary prompt.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Matches the last brace-delimited object or bracket-delimited array that
/// runs to the end of the text. Greedy, so prose before the JSON is skipped
/// and nested braces are swallowed whole.
static JSON_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\{.*\}|\[.*\])\s*$").expect("json tail regex"));

static FENCE_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```json").expect("fence regex"));

/// Extracts and parses the JSON body of a model answer.
///
/// Trims whitespace and a leading BOM, strips ```` ```json ```` / ```` ``` ````
/// fence markers, then parses the end-anchored object/array substring.
/// Anything that prevents a parse comes back as [`Error::NoJsonFound`].
pub fn parse_json_loose(text: &str) -> Result<serde_json::Value> {
    let trimmed = text.trim().trim_start_matches('\u{feff}');
    let unfenced = FENCE_JSON_RE.replace(trimmed, "");
    let mut t = unfenced.trim();
    t = t.strip_prefix("```").unwrap_or(t).trim();
    t = t.strip_suffix("```").unwrap_or(t).trim();

    let body = JSON_TAIL_RE
        .captures(t)
        .and_then(|c| c.get(1))
        .ok_or(Error::NoJsonFound)?
        .as_str();
    serde_json::from_str(body).map_err(|_| Error::NoJsonFound)
}

/// The four fixed sections of the fallback marker-block format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerBlocks {
    pub date: String,
    pub mentor: String,
    pub content: String,
    pub mentoring: String,
}

/// Reads the `<<TAG>>`-delimited fallback format. A missing tag yields an
/// empty string, never an error.
pub fn parse_marker_blocks(text: &str) -> MarkerBlocks {
    MarkerBlocks {
        date: grab_block(text, "DATE"),
        mentor: grab_block(text, "MENTOR"),
        content: grab_block(text, "CONTENT"),
        mentoring: grab_block(text, "MENTORING"),
    }
}

/// Text between `<<TAG>>` and the next `<<` marker (or end of input), trimmed.
fn grab_block(text: &str, tag: &str) -> String {
    let marker = format!("<<{tag}>>");
    let Some(start) = text.find(&marker) else {
        return String::new();
    };
    let rest = &text[start + marker.len()..];
    let end = rest.find("<<").unwrap_or(rest.len());
    rest[..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_object() {
        let v = parse_json_loose(r#"{"summary_title":"주간 점검"}"#).unwrap();
        assert_eq!(v["summary_title"], "주간 점검");
    }

    #[test]
    fn test_json_inside_fence() {
        let text = "```json\n{\"mentor\":\"박지훈\",\"tags\":[\"#성장\"]}\n```";
        let v = parse_json_loose(text).unwrap();
        assert_eq!(v["mentor"], "박지훈");
        assert_eq!(v["tags"][0], "#성장");
    }

    #[test]
    fn test_fence_marker_case_insensitive() {
        let text = "```JSON\n{\"a\":1}\n```";
        assert_eq!(parse_json_loose(text).unwrap()["a"], 1);
    }

    #[test]
    fn test_stray_prose_before_json() {
        let text = "요약 결과는 다음과 같습니다:\n{\"summary_title\":\"결과\"}";
        let v = parse_json_loose(text).unwrap();
        assert_eq!(v["summary_title"], "결과");
    }

    #[test]
    fn test_bom_and_whitespace() {
        let text = "\u{feff}  {\"a\": [1, 2]}  ";
        assert_eq!(parse_json_loose(text).unwrap()["a"][1], 2);
    }

    #[test]
    fn test_top_level_array() {
        let v = parse_json_loose("[\"one\", \"two\"]").unwrap();
        assert_eq!(v[1], "two");
    }

    #[test]
    fn test_multiline_nested_object() {
        let text = "```json\n{\n  \"action_items\": [\n    {\"assignee\": \"이수민\", \"task\": \"정리\", \"due\": null}\n  ]\n}\n```";
        let v = parse_json_loose(text).unwrap();
        assert_eq!(v["action_items"][0]["assignee"], "이수민");
    }

    #[test]
    fn test_no_json_is_error() {
        assert!(matches!(
            parse_json_loose("no structured data here"),
            Err(Error::NoJsonFound)
        ));
    }

    #[test]
    fn test_unbalanced_json_is_error() {
        assert!(matches!(
            parse_json_loose("{\"broken\": "),
            Err(Error::NoJsonFound)
        ));
    }

    #[test]
    fn test_marker_blocks_all_tags() {
        let text = "<<DATE>>\n2025-04-02 19:00\n\n<<MENTOR>>\n박지훈\n\n<<CONTENT>>\n주제 한 줄\n- 하나\n- 둘\n\n<<MENTORING>>\n■ 다음 계획\n계속 진행";
        let blocks = parse_marker_blocks(text);
        assert_eq!(blocks.date, "2025-04-02 19:00");
        assert_eq!(blocks.mentor, "박지훈");
        assert_eq!(blocks.content, "주제 한 줄\n- 하나\n- 둘");
        assert_eq!(blocks.mentoring, "■ 다음 계획\n계속 진행");
    }

    #[test]
    fn test_marker_blocks_missing_tags_yield_empty() {
        let text = "<<DATE>>\nunknown\n<<CONTENT>>\n핵심 주제";
        let blocks = parse_marker_blocks(text);
        assert_eq!(blocks.date, "unknown");
        assert_eq!(blocks.content, "핵심 주제");
        assert_eq!(blocks.mentor, "");
        assert_eq!(blocks.mentoring, "");
    }

    #[test]
    fn test_marker_blocks_empty_input() {
        assert_eq!(parse_marker_blocks(""), MarkerBlocks::default());
    }
}
