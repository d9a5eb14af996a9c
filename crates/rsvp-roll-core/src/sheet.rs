//! Spreadsheet exchange format.
//!
//! A sheet is newline-delimited rows of tab-separated cells:
//!
//! ```text
//! <title link>  ""         <event link>  <event link>  ...
//! ""            ""         <date key>    <date key>    ...
//! <name>        <id>       <mark>        <mark>        ...
//! ```
//!
//! The first two columns identify the person; every later column is one
//! event occurrence. Cells hold the `AttendanceMark` encodings, or any
//! text someone typed in by hand, which is carried through untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::MemberId;

/// Name and id columns preceding the event columns
pub const IDENTITY_COLUMNS: usize = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SheetError {
    #[error("Sheet needs a link row and a date row, found {0} row(s)")]
    MissingHeader(usize),
}

/// Reconciled value of one (person, event) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceMark {
    Yes,
    No,
    Dropped,
    Blank,
    /// Attending an event that was not refreshed, while unknown to the sheet.
    /// Usually the same person under a different id; needs a manual look.
    DuplicateYes,
}

impl AttendanceMark {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceMark::Yes => "y",
            AttendanceMark::No => "n",
            AttendanceMark::Dropped => "d",
            AttendanceMark::Blank => "",
            AttendanceMark::DuplicateYes => "y (dup)",
        }
    }

    pub fn parse(cell: &str) -> Option<Self> {
        match cell.trim() {
            "y" => Some(AttendanceMark::Yes),
            "n" => Some(AttendanceMark::No),
            "d" => Some(AttendanceMark::Dropped),
            "" => Some(AttendanceMark::Blank),
            "y (dup)" => Some(AttendanceMark::DuplicateYes),
            _ => None,
        }
    }

    /// Whether a prior cell says the person was signed up at some point
    pub fn was_going(cell: &str) -> bool {
        matches!(
            Self::parse(cell),
            Some(AttendanceMark::Yes) | Some(AttendanceMark::Dropped)
        )
    }
}

impl std::fmt::Display for AttendanceMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }

    fn render_cell(&self, cell: &str) -> String {
        match self {
            Delimiter::Tab => cell.to_string(),
            Delimiter::Comma => {
                if cell.contains([',', '"', '\n']) {
                    format!("\"{}\"", cell.replace('"', "\"\""))
                } else {
                    cell.to_string()
                }
            }
        }
    }
}

impl std::str::FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tab" | "tsv" => Ok(Delimiter::Tab),
            "comma" | "csv" => Ok(Delimiter::Comma),
            other => Err(format!("unknown delimiter '{}', expected tab or comma", other)),
        }
    }
}

/// One person row of a previously exported sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub cells: Vec<String>,
}

impl SheetRow {
    pub fn name(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or("")
    }

    /// Member id, if the id cell holds one
    pub fn id(&self) -> Option<MemberId> {
        self.cells.get(1).and_then(|c| c.parse().ok())
    }

    /// Cell of event column `column` (0-based, after the identity columns).
    /// Cells missing from a short row read as blank.
    pub fn mark(&self, column: usize) -> &str {
        self.cells
            .get(IDENTITY_COLUMNS + column)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// The identity cells, padded to `IDENTITY_COLUMNS`
    pub fn identity(&self) -> Vec<String> {
        padded_prefix(&self.cells, IDENTITY_COLUMNS)
    }
}

/// A previously exported attendance sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorSheet {
    pub link_row: Vec<String>,
    pub date_row: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl PriorSheet {
    /// Parse pasted sheet text. Blank input means there is no prior sheet.
    pub fn parse(text: &str) -> Result<Option<Self>, SheetError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let mut lines: Vec<&str> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        if lines.len() < 2 {
            return Err(SheetError::MissingHeader(lines.len()));
        }

        let split = |line: &str| -> Vec<String> { line.split('\t').map(str::to_string).collect() };
        let link_row = split(lines[0]);
        let date_row = split(lines[1]);
        let rows: Vec<SheetRow> = lines[2..].iter().map(|l| SheetRow { cells: split(*l) }).collect();

        let sheet = Self {
            link_row,
            date_row,
            rows,
        };
        sheet.warn_ragged_rows();
        Ok(Some(sheet))
    }

    fn warn_ragged_rows(&self) {
        let width = self.date_row.len();
        for (i, row) in self.rows.iter().enumerate() {
            if row.cells.len() < width {
                warn!(
                    row = i + 3,
                    name = row.name(),
                    cells = row.cells.len(),
                    expected = width,
                    "Short sheet row, missing cells read as blank"
                );
            } else if row.cells.len() > width {
                warn!(
                    row = i + 3,
                    name = row.name(),
                    cells = row.cells.len(),
                    expected = width,
                    "Long sheet row, cells past the last date are dropped"
                );
            }
        }
    }

    /// Date keys of the event columns, in sheet order
    pub fn date_keys(&self) -> Vec<&str> {
        self.date_row
            .iter()
            .skip(IDENTITY_COLUMNS)
            .map(|c| c.trim())
            .collect()
    }

    pub fn column_count(&self) -> usize {
        self.date_row.len().saturating_sub(IDENTITY_COLUMNS)
    }

    /// Link cell of event column `column`, blank if the link row is short
    pub fn link(&self, column: usize) -> &str {
        self.link_row
            .get(IDENTITY_COLUMNS + column)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// First `n` cells of `cells`, padded with blanks.
pub(crate) fn padded_prefix(cells: &[String], n: usize) -> Vec<String> {
    (0..n).map(|i| cells.get(i).cloned().unwrap_or_default()).collect()
}

/// Final table: two header rows followed by one row per person.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Matrix {
    rows: Vec<Vec<String>>,
}

impl Matrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Person rows, without the two header rows
    pub fn person_rows(&self) -> &[Vec<String>] {
        self.rows.get(2..).unwrap_or(&[])
    }

    pub fn to_delimited(&self, delimiter: Delimiter) -> String {
        let sep = delimiter.as_char().to_string();
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| delimiter.render_cell(cell))
                    .collect::<Vec<_>>()
                    .join(&sep)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
