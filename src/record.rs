use serde::{Deserialize, Serialize};

/// One action item extracted from a session transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub task: String,
    /// `YYYY-MM-DD` due date, or None when the model answered `null`.
    #[serde(default)]
    pub due: Option<String>,
}

/// Structured summary of a single transcript.
///
/// Every field is present with an empty default so a partial model response
/// never produces a hole the spreadsheet writer has to guard against.
/// `session_datetime` is either `"YYYY-MM-DD HH:MM"` or the sentinel
/// `"unknown"` (an empty string is treated the same as `"unknown"` downstream).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptRecord {
    #[serde(default)]
    pub session_datetime: String,
    #[serde(default)]
    pub mentor: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub summary_title: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub next_plan: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TranscriptRecord {
    /// True when the model could not determine the session date.
    pub fn datetime_is_unknown(&self) -> bool {
        self.session_datetime.is_empty() || self.session_datetime == "unknown"
    }
}
