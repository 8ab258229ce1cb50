//! Append-only writer for the mentoring-log xlsx template.
//!
//! Each call opens the workbook, appends one row at the first blank slot and
//! saves; the file is never held open across transcripts. Rows already in
//! the file are never touched, so re-running a batch appends rather than
//! deduplicates.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use umya_spreadsheet::{Spreadsheet, Worksheet, XlsxError};

use crate::error::{Error, Result};
use crate::record::TranscriptRecord;

/// Template header row, written when the file is first created.
pub const HEADERS: [&str; 7] = [
    "원본파일명",
    "회차",
    "일자 및 시간",
    "장 소",
    "구분",
    "내용",
    "멘토링",
];

const HEADER_ROW: u32 = 1;
/// Columns probed when looking for the first blank row.
const BLANK_PROBE_COLUMNS: u32 = 6;
const SAVE_ATTEMPTS: u32 = 5;
const SAVE_RETRY_WAIT: Duration = Duration::from_secs(2);

const LOCATION_LITERAL: &str = "팀즈 화상";
const CATEGORY_LITERAL: &str = "주제 멘토링";

pub struct ExcelWriter {
    path: PathBuf,
    sheet_name: String,
}

impl ExcelWriter {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// Appends `record` as one row, returning the 1-based row index written.
    ///
    /// Creates the template file on first use. Record cells whose header is
    /// missing from the file are dropped (with a warning); extra columns in
    /// the file are left alone.
    pub fn write(&self, record: &TranscriptRecord, source_filename: &str) -> Result<u32> {
        if !self.path.exists() {
            self.create_template()?;
        }

        let mut book = umya_spreadsheet::reader::xlsx::read(&self.path)
            .map_err(|e| Error::Workbook(format!("{e:?}")))?;
        let sheet = book
            .get_sheet_by_name_mut(&self.sheet_name)
            .ok_or_else(|| Error::MissingSheet(self.sheet_name.clone()))?;

        let header_map = header_columns(sheet);
        let row = next_empty_row(sheet);

        if let Some(&col) = header_map.get("회차") {
            let seq = next_sequence(sheet, col, row);
            sheet.get_cell_mut((col, row)).set_value_number(seq as f64);
        }

        let mut cells = build_cells(record);
        cells.push(("원본파일명", source_filename.to_string()));

        let mut dropped: Vec<&str> = Vec::new();
        for (header, value) in &cells {
            match header_map.get(*header) {
                Some(&col) => {
                    sheet.get_cell_mut((col, row)).set_value(value.clone());
                }
                None => dropped.push(header),
            }
        }
        if !dropped.is_empty() {
            warn!(
                "columns missing from {}, values dropped: {:?}",
                self.path.display(),
                dropped
            );
        }

        self.save_with_retry(&book)?;
        info!("appended row {} to {}", row, self.path.display());
        Ok(row)
    }

    /// Creates a fresh workbook holding only the header row.
    fn create_template(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut book = umya_spreadsheet::new_file();
        let sheet = book
            .get_sheet_by_name_mut("Sheet1")
            .ok_or_else(|| Error::Workbook("fresh workbook has no Sheet1".to_string()))?;
        if self.sheet_name != "Sheet1" {
            sheet.set_name(self.sheet_name.clone());
        }
        for (idx, header) in HEADERS.iter().enumerate() {
            sheet
                .get_cell_mut(((idx as u32) + 1, HEADER_ROW))
                .set_value(*header);
        }
        self.save_with_retry(&book)?;
        info!("created template workbook at {}", self.path.display());
        Ok(())
    }

    /// Saves the workbook, retrying when the file is held by another process
    /// (a spreadsheet application keeping it open). Warns once, waits a fixed
    /// interval between attempts, and gives up with
    /// [`Error::WorkbookLocked`] after the attempt budget.
    fn save_with_retry(&self, book: &Spreadsheet) -> Result<()> {
        for attempt in 1..=SAVE_ATTEMPTS {
            match umya_spreadsheet::writer::xlsx::write(book, &self.path) {
                Ok(()) => return Ok(()),
                Err(XlsxError::Io(e)) if e.kind() == ErrorKind::PermissionDenied => {
                    if attempt == 1 {
                        warn!(
                            "workbook is open elsewhere, close it to continue: {}",
                            self.path.display()
                        );
                    }
                    if attempt < SAVE_ATTEMPTS {
                        std::thread::sleep(SAVE_RETRY_WAIT);
                    }
                }
                Err(e) => return Err(Error::Workbook(format!("{e:?}"))),
            }
        }
        Err(Error::WorkbookLocked {
            path: self.path.clone(),
            attempts: SAVE_ATTEMPTS,
        })
    }
}

/// Maps trimmed header text in row 1 to its 1-based column index.
fn header_columns(sheet: &Worksheet) -> HashMap<String, u32> {
    let mut map = HashMap::new();
    for col in 1..=sheet.get_highest_column() {
        let value = sheet.get_value((col, HEADER_ROW));
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            map.insert(trimmed.to_string(), col);
        }
    }
    map
}

/// First row below the header whose leading cells are all empty. Rows are
/// never reused, so this is also the only insertion point. A cell holding
/// only whitespace still counts as occupied.
fn next_empty_row(sheet: &Worksheet) -> u32 {
    let mut row = HEADER_ROW + 1;
    loop {
        let occupied =
            (1..=BLANK_PROBE_COLUMNS).any(|col| !sheet.get_value((col, row)).is_empty());
        if !occupied {
            return row;
        }
        row += 1;
    }
}

/// Previous row's sequence value plus one; anything absent or non-numeric
/// restarts the count at 1.
fn next_sequence(sheet: &Worksheet, col: u32, row: u32) -> i64 {
    let prev = sheet.get_value((col, row - 1));
    prev.trim()
        .parse::<f64>()
        .map(|v| v as i64 + 1)
        .unwrap_or(1)
}

/// Derives the display cells for one record. The 회차 and 원본파일명 cells
/// are handled by the caller.
fn build_cells(record: &TranscriptRecord) -> Vec<(&'static str, String)> {
    vec![
        ("일자 및 시간", date_mentor_cell(record)),
        ("장 소", LOCATION_LITERAL.to_string()),
        ("구분", CATEGORY_LITERAL.to_string()),
        ("내용", content_cell(record)),
        ("멘토링", mentoring_cell(record)),
    ]
}

/// Session datetime (blank when unknown), then the mentor name on its own
/// line when present.
fn date_mentor_cell(record: &TranscriptRecord) -> String {
    let date = if record.datetime_is_unknown() {
        ""
    } else {
        record.session_datetime.as_str()
    };
    if record.mentor.is_empty() {
        date.to_string()
    } else {
        format!("{date}\n{}", record.mentor).trim().to_string()
    }
}

/// Summary title followed by one highlight per line.
fn content_cell(record: &TranscriptRecord) -> String {
    let mut content = record.summary_title.trim().to_string();
    if !record.highlights.is_empty() {
        content.push('\n');
        content.push_str(&record.highlights.join("\n"));
    }
    content.trim().to_string()
}

/// Up to four labeled sections; a section whose source is empty is omitted
/// entirely.
fn mentoring_cell(record: &TranscriptRecord) -> String {
    let mut out = String::new();

    if !record.decisions.is_empty() {
        out.push_str("■ 결정사항\n");
        let lines: Vec<String> = record.decisions.iter().map(|d| format!("- {d}")).collect();
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
    if !record.action_items.is_empty() {
        out.push_str("■ 액션아이템\n");
        let lines: Vec<String> = record
            .action_items
            .iter()
            .map(|item| {
                let assignee = non_empty_or_dash(&item.assignee);
                let task = non_empty_or_dash(&item.task);
                let due = item
                    .due
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or("-");
                format!("- [{assignee}] {task} (기한: {due})")
            })
            .collect();
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
    if !record.risks.is_empty() {
        out.push_str("■ 리스크/이슈\n");
        let lines: Vec<String> = record.risks.iter().map(|r| format!("- {r}")).collect();
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
    if !record.next_plan.is_empty() {
        out.push_str("■ 다음 계획\n");
        out.push_str(&record.next_plan);
    }

    out.trim().to_string()
}

fn non_empty_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
