//! Two-tier summarization: a strict-JSON prompt first, and on any failure in
//! that path a looser `<<TAG>>` marker-format prompt whose output is rebuilt
//! into the same record shape. Structured decoding is richer; the tagged-text
//! contract survives models that will not honor strict JSON.

use reqwest::Client;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::gemini::ModelGateway;
use crate::parse::{parse_json_loose, parse_marker_blocks, MarkerBlocks};
use crate::record::TranscriptRecord;
use crate::sanitize::sanitize_transcript;

/// Schema description embedded in the primary prompt.
const SCHEMA: &str = r##"스키마:{
 "session_datetime":"YYYY-MM-DD HH:MM"|"unknown",
 "mentor":"string","attendees":["string",...],
 "summary_title":"핵심주제 한줄","highlights":["불릿1","불릿2","불릿3","불릿4","불릿5"],
 "decisions":["결정1",...],
 "action_items":[{"assignee":"이름","task":"할일","due":"YYYY-MM-DD|null"}],
 "risks":["리스크1",...],"next_plan":"다음 계획/요청","tags":["#태그1","#태그2"]
}
규칙: JSON 외 텍스트/마크다운/코드블록 금지
"##;

fn primary_prompt(transcript: &str) -> String {
    format!("아래 녹취록을 요약해. {SCHEMA}\n녹취록:\n{transcript}")
}

fn fallback_prompt(transcript: &str) -> String {
    format!(
        r#"아래 녹취록을 요약하되, 다음 형식만 출력하고 그 외 문구는 금지.

<<DATE>>
YYYY-MM-DD HH:MM 또는 unknown

<<MENTOR>>
이름(모르면 공란)

<<CONTENT>>
(핵심주제 한 줄)
- 하이라이트1
- 하이라이트2
- 하이라이트3

<<MENTORING>>
■ 결정사항
- ...
■ 액션아이템
- [담당자] 할일 (기한: YYYY-MM-DD|null)
■ 리스크/이슈
- ...
■ 다음 계획
...

녹취록:
{transcript}
"#
    )
}

/// Orchestrates sanitize → model call → parse for one transcript.
pub struct Summarizer {
    gateway: ModelGateway,
    max_transcript_chars: usize,
    retry_each: u32,
}

impl Summarizer {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            gateway: ModelGateway::new(client, config),
            max_transcript_chars: config.max_transcript_chars,
            retry_each: config.retry_each,
        }
    }

    /// Produces a [`TranscriptRecord`] for `raw_text`. Failures in the
    /// primary JSON path (gateway, extraction, or parse) are recovered by the
    /// marker-format fallback; a gateway failure in the fallback itself
    /// propagates.
    pub async fn summarize(&self, raw_text: &str) -> Result<TranscriptRecord> {
        let transcript = sanitize_transcript(raw_text, self.max_transcript_chars);

        match self.json_path(&transcript).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!("structured JSON path failed ({e}), retrying with marker format");
                self.marker_path(&transcript).await
            }
        }
    }

    async fn json_path(&self, transcript: &str) -> Result<TranscriptRecord> {
        let output = self
            .gateway
            .call(&primary_prompt(transcript), self.retry_each)
            .await?;
        let value = parse_json_loose(&output)?;
        // Missing fields default to empty, extras are ignored; a shape the
        // record cannot absorb counts as a parse failure.
        serde_json::from_value(value).map_err(|_| crate::error::Error::NoJsonFound)
    }

    async fn marker_path(&self, transcript: &str) -> Result<TranscriptRecord> {
        let output = self
            .gateway
            .call(&fallback_prompt(transcript), self.retry_each)
            .await?;
        let blocks = parse_marker_blocks(&output);
        info!("marker fallback produced date='{}' mentor='{}'", blocks.date, blocks.mentor);
        Ok(record_from_marker_blocks(blocks))
    }
}

/// Rebuilds a best-effort record from the fallback format: title is the
/// first non-blank CONTENT line, highlights the subsequent dash lines, and
/// every JSON-only field stays empty.
pub fn record_from_marker_blocks(blocks: MarkerBlocks) -> TranscriptRecord {
    let lines: Vec<&str> = blocks
        .content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let summary_title = lines.first().copied().unwrap_or("").to_string();
    let highlights = lines
        .iter()
        .skip(1)
        .filter(|l| l.starts_with('-'))
        .map(|l| l.trim_start_matches(['-', ' ']).to_string())
        .collect();

    TranscriptRecord {
        session_datetime: if blocks.date.is_empty() {
            "unknown".to_string()
        } else {
            blocks.date
        },
        mentor: blocks.mentor,
        summary_title,
        highlights,
        ..TranscriptRecord::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_record_title_and_highlights() {
        let blocks = MarkerBlocks {
            date: "2025-05-10 19:00".to_string(),
            mentor: "박지훈".to_string(),
            content: "프로젝트 중간 점검\n- 일정 리스크 공유\n- 다음 스프린트 범위 확정\n부가 설명 줄"
                .to_string(),
            mentoring: String::new(),
        };
        let record = record_from_marker_blocks(blocks);
        assert_eq!(record.summary_title, "프로젝트 중간 점검");
        assert_eq!(
            record.highlights,
            vec!["일정 리스크 공유", "다음 스프린트 범위 확정"]
        );
        assert_eq!(record.session_datetime, "2025-05-10 19:00");
        assert_eq!(record.mentor, "박지훈");
    }

    #[test]
    fn test_marker_record_json_only_fields_stay_empty() {
        let blocks = MarkerBlocks {
            date: String::new(),
            mentor: String::new(),
            content: "제목만 있는 경우".to_string(),
            mentoring: "■ 다음 계획\n계속".to_string(),
        };
        let record = record_from_marker_blocks(blocks);
        assert_eq!(record.session_datetime, "unknown");
        assert_eq!(record.mentor, "");
        assert!(record.attendees.is_empty());
        assert!(record.decisions.is_empty());
        assert!(record.action_items.is_empty());
        assert!(record.risks.is_empty());
        assert_eq!(record.next_plan, "");
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_marker_record_empty_content() {
        let record = record_from_marker_blocks(MarkerBlocks::default());
        assert_eq!(record.summary_title, "");
        assert!(record.highlights.is_empty());
        assert_eq!(record.session_datetime, "unknown");
    }

    #[test]
    fn test_marker_record_non_dash_lines_skipped() {
        let blocks = MarkerBlocks {
            content: "제목\n하이라이트 아님\n- 진짜 하이라이트".to_string(),
            ..MarkerBlocks::default()
        };
        let record = record_from_marker_blocks(blocks);
        assert_eq!(record.highlights, vec!["진짜 하이라이트"]);
    }

    #[test]
    fn test_primary_prompt_embeds_schema_and_transcript() {
        let p = primary_prompt("녹취 본문");
        assert!(p.contains("session_datetime"));
        assert!(p.contains("JSON 외 텍스트/마크다운/코드블록 금지"));
        assert!(p.ends_with("녹취록:\n녹취 본문"));
    }

    #[test]
    fn test_fallback_prompt_lists_all_tags() {
        let p = fallback_prompt("본문");
        for tag in ["<<DATE>>", "<<MENTOR>>", "<<CONTENT>>", "<<MENTORING>>"] {
            assert!(p.contains(tag), "missing {tag}");
        }
    }
}
