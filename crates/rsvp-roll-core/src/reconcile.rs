//! Sheet reconciliation.
//!
//! Merges this run's live attendance into a previously exported sheet.
//! Columns and people already in the sheet are never removed: marks in
//! refreshable columns are recomputed from live data, every other cell is
//! carried over as-is, and members seen for the first time are appended.

use std::collections::HashSet;

use tracing::debug;

use crate::aggregate::{Attendance, EventAttendance};
use crate::models::event::DEFAULT_DATE_FORMAT;
use crate::models::MemberId;
use crate::sheet::{padded_prefix, AttendanceMark, Matrix, PriorSheet, IDENTITY_COLUMNS};

/// Header conventions for a sheet built from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// First cell of the link row
    pub title_link: String,
    /// Appended to an event's link in the link row
    pub link_suffix: String,
    /// chrono format for date keys
    pub date_format: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            title_link: String::new(),
            link_suffix: String::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl SheetLayout {
    fn link_cell(&self, live: &EventAttendance) -> String {
        format!("{}{}", live.event.link, self.link_suffix)
    }
}

/// Date keys explicitly requested for re-evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshFilter {
    keys: HashSet<String>,
}

impl RefreshFilter {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list of date keys. Returns `None` when the
    /// list holds no keys at all.
    pub fn parse(list: &str) -> Option<Self> {
        let keys: HashSet<String> = list
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(Self { keys })
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key.trim())
    }
}

/// Output of `reconcile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub matrix: Matrix,
    /// Date keys whose marks were recomputed from live data
    pub refreshed: Vec<String>,
    /// Live dates with no column in the prior sheet. They get no column;
    /// the header row has to be extended by hand.
    pub unplaced_dates: Vec<String>,
    pub new_people: usize,
}

struct Column<'a> {
    key: String,
    link_cell: String,
    date_cell: String,
    live: Option<&'a EventAttendance>,
    refreshable: bool,
}

impl Column<'_> {
    fn is_attending(&self, id: MemberId) -> bool {
        self.live.is_some_and(|l| l.is_attending(id))
    }
}

fn is_refreshable(
    live: &EventAttendance,
    key: &str,
    first_run: bool,
    filter: Option<&RefreshFilter>,
) -> bool {
    // A failed fetch says nothing about who is attending.
    if live.outcome.is_failed() {
        return false;
    }
    if first_run {
        return true;
    }
    match filter {
        Some(filter) => filter.contains(key),
        None => live.event.is_upcoming(),
    }
}

fn columns<'a>(
    attendance: &'a Attendance,
    prior: Option<&PriorSheet>,
    filter: Option<&RefreshFilter>,
    layout: &SheetLayout,
) -> Vec<Column<'a>> {
    let keyed: Vec<(String, &EventAttendance)> = attendance
        .events
        .iter()
        .map(|e| (e.event.date_key(&layout.date_format), e))
        .collect();

    match prior {
        None => keyed
            .into_iter()
            .map(|(key, live)| Column {
                link_cell: layout.link_cell(live),
                date_cell: key.clone(),
                refreshable: is_refreshable(live, &key, true, filter),
                live: Some(live),
                key,
            })
            .collect(),
        Some(sheet) => sheet
            .date_keys()
            .into_iter()
            .enumerate()
            .map(|(i, key)| {
                let live = keyed.iter().find(|(k, _)| k == key).map(|(_, e)| *e);
                Column {
                    key: key.to_string(),
                    link_cell: match live {
                        Some(live) => layout.link_cell(live),
                        None => sheet.link(i).to_string(),
                    },
                    date_cell: sheet.date_row[IDENTITY_COLUMNS + i].clone(),
                    refreshable: live.is_some_and(|l| is_refreshable(l, key, false, filter)),
                    live,
                }
            })
            .collect(),
    }
}

/// Merge live attendance with an optional prior sheet.
///
/// Pure: no network access, no I/O. The matrix is the link row, the date
/// row, every prior person in prior order, then new people by name.
pub fn reconcile(
    attendance: &Attendance,
    prior: Option<&PriorSheet>,
    filter: Option<&RefreshFilter>,
    layout: &SheetLayout,
) -> Reconciliation {
    let columns = columns(attendance, prior, filter, layout);
    let mut matrix = Matrix::new();

    // Header rows
    let (mut link_row, mut date_row) = match prior {
        Some(sheet) => (
            padded_prefix(&sheet.link_row, IDENTITY_COLUMNS),
            padded_prefix(&sheet.date_row, IDENTITY_COLUMNS),
        ),
        None => (
            vec![layout.title_link.clone(), String::new()],
            vec![String::new(), String::new()],
        ),
    };
    link_row.extend(columns.iter().map(|c| c.link_cell.clone()));
    date_row.extend(columns.iter().map(|c| c.date_cell.clone()));
    matrix.push_row(link_row);
    matrix.push_row(date_row);

    // People already in the sheet
    let prior_rows = prior.map(|s| s.rows.as_slice()).unwrap_or(&[]);
    let known: HashSet<MemberId> = prior_rows.iter().filter_map(|r| r.id()).collect();

    for row in prior_rows {
        let id = row.id();
        let mut cells = row.identity();
        for (i, column) in columns.iter().enumerate() {
            let previous = row.mark(i);
            let cell = if column.refreshable {
                let attending = id.is_some_and(|id| column.is_attending(id));
                if attending {
                    AttendanceMark::Yes.to_string()
                } else if AttendanceMark::was_going(previous) {
                    AttendanceMark::Dropped.to_string()
                } else {
                    AttendanceMark::No.to_string()
                }
            } else {
                previous.to_string()
            };
            cells.push(cell);
        }
        matrix.push_row(cells);
    }

    // People seen for the first time
    let mut newcomers: Vec<(&str, MemberId)> = attendance
        .sessions
        .iter()
        .filter(|s| !known.contains(&s.person.id))
        .map(|s| (s.person.name.as_str(), s.person.id))
        .collect();
    newcomers.sort();

    for &(name, id) in &newcomers {
        let mut cells = vec![name.to_string(), id.to_string()];
        for column in &columns {
            let attending = column.is_attending(id);
            let mark = match (column.refreshable, attending) {
                (true, true) => AttendanceMark::Yes,
                (true, false) => AttendanceMark::No,
                (false, true) => AttendanceMark::DuplicateYes,
                (false, false) => AttendanceMark::Blank,
            };
            cells.push(mark.to_string());
        }
        matrix.push_row(cells);
    }

    let unplaced_dates: Vec<String> = match prior {
        Some(_) => {
            let placed: HashSet<&str> = columns.iter().map(|c| c.key.as_str()).collect();
            let mut unplaced: Vec<String> = Vec::new();
            for live in &attendance.events {
                let key = live.event.date_key(&layout.date_format);
                if !placed.contains(key.as_str()) && !unplaced.contains(&key) {
                    unplaced.push(key);
                }
            }
            unplaced
        }
        None => Vec::new(),
    };

    let refreshed: Vec<String> = columns
        .iter()
        .filter(|c| c.refreshable)
        .map(|c| c.key.clone())
        .collect();

    debug!(
        columns = columns.len(),
        refreshed = refreshed.len(),
        existing = prior_rows.len(),
        new = newcomers.len(),
        "Sheet reconciled"
    );

    Reconciliation {
        matrix,
        refreshed,
        unplaced_dates,
        new_people: newcomers.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::event;
    use crate::aggregate::FetchOutcome;
    use crate::models::{EventStatus, Person};
    use crate::sheet::Delimiter;

    fn layout() -> SheetLayout {
        SheetLayout {
            title_link: "https://tinyurl.com/SiThrowabout".to_string(),
            link_suffix: "attendees".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    fn sheet(text: &str) -> PriorSheet {
        PriorSheet::parse(text).unwrap().unwrap()
    }

    fn live(entries: Vec<(&str, (i32, u32, u32), EventStatus, Vec<Person>)>) -> Attendance {
        Attendance::from_outcomes(
            entries
                .into_iter()
                .map(|(id, date, status, people)| (event(id, date, status), FetchOutcome::Fetched(people)))
                .collect(),
        )
    }

    fn cells(row: &[String]) -> Vec<&str> {
        row.iter().map(String::as_str).collect()
    }

    fn link(id: &str) -> String {
        format!("https://www.meetup.com/Silicon-Throwabout/events/{}/attendees", id)
    }

    #[test]
    fn test_first_run_sorts_people_by_name() {
        let attendance = live(vec![(
            "1",
            (2021, 9, 1),
            EventStatus::Past,
            vec![Person::new(2, "Cara"), Person::new(1, "Bob")],
        )]);

        let result = reconcile(&attendance, None, None, &layout());
        let rows = result.matrix.rows();

        assert_eq!(cells(&rows[0]), vec!["https://tinyurl.com/SiThrowabout", "", link("1").as_str()]);
        assert_eq!(cells(&rows[1]), vec!["", "", "01/09/21"]);
        assert_eq!(cells(&rows[2]), vec!["Bob", "1", "y"]);
        assert_eq!(cells(&rows[3]), vec!["Cara", "2", "y"]);
        assert_eq!(rows.len(), 4);
        assert_eq!(result.new_people, 2);
        assert_eq!(result.refreshed, vec!["01/09/21"]);
    }

    #[test]
    fn test_first_run_marks_absent_people_no() {
        let attendance = live(vec![
            ("1", (2021, 9, 1), EventStatus::Past, vec![Person::new(1, "Bob")]),
            ("2", (2021, 9, 8), EventStatus::Upcoming, vec![Person::new(2, "Cara")]),
        ]);

        let result = reconcile(&attendance, None, None, &layout());
        let people = result.matrix.person_rows();
        assert_eq!(cells(&people[0]), vec!["Bob", "1", "y", "n"]);
        assert_eq!(cells(&people[1]), vec!["Cara", "2", "n", "y"]);
    }

    #[test]
    fn test_refreshed_absentee_is_dropped() {
        let prior = sheet("t\t\told-link\n\t\t01/09/21\nAda\t7\ty\n");
        let attendance = live(vec![(
            "1",
            (2021, 9, 1),
            EventStatus::Past,
            vec![Person::new(1, "Bob")],
        )]);
        let filter = RefreshFilter::parse("01/09/21");

        let result = reconcile(&attendance, Some(&prior), filter.as_ref(), &layout());
        let people = result.matrix.person_rows();
        assert_eq!(cells(&people[0]), vec!["Ada", "7", "d"]);
        assert_eq!(cells(&people[1]), vec!["Bob", "1", "y"]);
    }

    #[test]
    fn test_upcoming_column_refreshes_without_filter() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nAda\t7\ty\nBea\t8\td\nCy\t9\tn\nDot\t10\t\n");
        let attendance = live(vec![(
            "1",
            (2021, 9, 1),
            EventStatus::Upcoming,
            vec![Person::new(9, "Cy")],
        )]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        let marks: Vec<&str> = result.matrix.person_rows().iter().map(|r| r[2].as_str()).collect();
        assert_eq!(marks, vec!["d", "d", "y", "n"]);
    }

    #[test]
    fn test_past_column_without_filter_is_carried() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nAda\t7\ty\n");
        let attendance = live(vec![("1", (2021, 9, 1), EventStatus::Past, vec![])]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        assert_eq!(cells(&result.matrix.person_rows()[0]), vec!["Ada", "7", "y"]);
        assert!(result.refreshed.is_empty());
    }

    #[test]
    fn test_filter_excludes_unlisted_upcoming_columns() {
        let prior = sheet("t\t\tl1\tl2\n\t\t01/09/21\t08/09/21\nAda\t7\tn\ty\n");
        let attendance = live(vec![
            ("1", (2021, 9, 1), EventStatus::Past, vec![Person::new(7, "Ada")]),
            ("2", (2021, 9, 8), EventStatus::Upcoming, vec![]),
        ]);
        let filter = RefreshFilter::new(["01/09/21"]);

        let result = reconcile(&attendance, Some(&prior), Some(&filter), &layout());
        assert_eq!(cells(&result.matrix.person_rows()[0]), vec!["Ada", "7", "y", "y"]);
        assert_eq!(result.refreshed, vec!["01/09/21"]);
    }

    #[test]
    fn test_column_without_live_event_is_preserved() {
        let prior = sheet(
            "t\t\thttps://old/15\thttps://old/22\n\t\t15/09/21\t22/09/21\nAda\t7\ty\tpaid\nBob\t1\tn\n",
        );
        let attendance = live(vec![(
            "22",
            (2021, 9, 22),
            EventStatus::Upcoming,
            vec![Person::new(7, "Ada"), Person::new(1, "Bob")],
        )]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        let rows = result.matrix.rows();
        assert_eq!(cells(&rows[0]), vec!["t", "", "https://old/15", link("22").as_str()]);
        assert_eq!(cells(&rows[2]), vec!["Ada", "7", "y", "y"]);
        assert_eq!(cells(&rows[3]), vec!["Bob", "1", "n", "y"]);
    }

    #[test]
    fn test_new_person_in_carried_column_is_flagged() {
        let prior = sheet("t\t\tl1\tl2\n\t\t01/09/21\t08/09/21\nAda\t7\ty\tn\n");
        let attendance = live(vec![
            ("1", (2021, 9, 1), EventStatus::Past, vec![Person::new(70, "Ada L")]),
            ("2", (2021, 9, 8), EventStatus::Upcoming, vec![Person::new(5, "Eve")]),
        ]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        let people = result.matrix.person_rows();
        assert_eq!(cells(&people[0]), vec!["Ada", "7", "y", "n"]);
        assert_eq!(cells(&people[1]), vec!["Ada L", "70", "y (dup)", "n"]);
        assert_eq!(cells(&people[2]), vec!["Eve", "5", "", "y"]);
        assert_eq!(result.new_people, 2);
    }

    #[test]
    fn test_new_people_sorted_case_sensitively_after_existing() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nZoe\t3\ty\n");
        let attendance = live(vec![(
            "1",
            (2021, 9, 1),
            EventStatus::Upcoming,
            vec![Person::new(4, "bea"), Person::new(5, "Cy"), Person::new(3, "Zoe"), Person::new(6, "Al")],
        )]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        let names: Vec<&str> = result.matrix.person_rows().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["Zoe", "Al", "Cy", "bea"]);
    }

    #[test]
    fn test_existing_person_keeps_sheet_name() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nAda\t7\tn\n");
        let attendance = live(vec![(
            "1",
            (2021, 9, 1),
            EventStatus::Upcoming,
            vec![Person::new(7, "Ada Lovelace")],
        )]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        assert_eq!(result.matrix.person_rows().len(), 1);
        assert_eq!(cells(&result.matrix.person_rows()[0]), vec!["Ada", "7", "y"]);
    }

    #[test]
    fn test_ragged_rows_are_padded_and_truncated() {
        let prior = sheet("t\n\t\t01/09/21\t08/09/21\nAda\t7\nBob\t1\ty\tn\textra\n");
        let attendance = live(vec![]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        let rows = result.matrix.rows();
        assert_eq!(cells(&rows[0]), vec!["t", "", "", ""]);
        assert_eq!(cells(&rows[2]), vec!["Ada", "7", "", ""]);
        assert_eq!(cells(&rows[3]), vec!["Bob", "1", "y", "n"]);
    }

    #[test]
    fn test_failed_fetch_column_is_carried() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nAda\t7\ty\n");
        let attendance = Attendance::from_outcomes(vec![(
            event("1", (2021, 9, 1), EventStatus::Upcoming),
            FetchOutcome::Failed("timeout".to_string()),
        )]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        assert_eq!(cells(&result.matrix.person_rows()[0]), vec!["Ada", "7", "y"]);
        assert!(result.refreshed.is_empty());
    }

    #[test]
    fn test_unplaced_live_dates_are_reported() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nAda\t7\ty\n");
        let attendance = live(vec![
            ("1", (2021, 9, 1), EventStatus::Past, vec![]),
            ("2", (2021, 9, 8), EventStatus::Upcoming, vec![Person::new(7, "Ada")]),
        ]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        assert_eq!(result.unplaced_dates, vec!["08/09/21"]);
        assert_eq!(result.matrix.rows()[1].len(), 3);
    }

    #[test]
    fn test_unparseable_id_row_is_kept() {
        let prior = sheet("t\t\tl\n\t\t01/09/21\nGuest\t\ty\n");
        let attendance = live(vec![("1", (2021, 9, 1), EventStatus::Upcoming, vec![])]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        assert_eq!(cells(&result.matrix.person_rows()[0]), vec!["Guest", "", "d"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let attendance = live(vec![
            ("1", (2021, 9, 1), EventStatus::Past, vec![Person::new(1, "Bob"), Person::new(2, "Cara")]),
            ("2", (2021, 9, 8), EventStatus::Upcoming, vec![Person::new(2, "Cara"), Person::new(3, "Dan")]),
        ]);

        let first = reconcile(&attendance, None, None, &layout());
        let text = first.matrix.to_delimited(Delimiter::Tab);
        let prior = sheet(&text);

        let second = reconcile(&attendance, Some(&prior), None, &layout());
        assert_eq!(second.matrix, first.matrix);
        assert_eq!(second.matrix.to_delimited(Delimiter::Tab), text);
        assert_eq!(second.new_people, 0);
    }

    #[test]
    fn test_every_prior_person_appears_once() {
        let prior = sheet("t\t\tl1\tl2\n\t\t01/09/21\t08/09/21\nAda\t7\ty\ty\nBob\t1\tn\td\nCy\t9\t\tn\n");
        let attendance = live(vec![
            ("1", (2021, 9, 1), EventStatus::Upcoming, vec![Person::new(1, "Bob"), Person::new(4, "Dee")]),
            ("2", (2021, 9, 8), EventStatus::Upcoming, vec![Person::new(9, "Cy")]),
        ]);

        let result = reconcile(&attendance, Some(&prior), None, &layout());
        let people = result.matrix.person_rows();
        assert!(people.len() >= prior.rows.len());
        for row in &prior.rows {
            let id = row.cells[1].as_str();
            assert_eq!(people.iter().filter(|r| r[1] == id).count(), 1, "id {}", id);
        }
        assert_eq!(cells(&people[0]), vec!["Ada", "7", "d", "d"]);
        assert_eq!(cells(&people[1]), vec!["Bob", "1", "y", "d"]);
        assert_eq!(cells(&people[2]), vec!["Cy", "9", "n", "y"]);
        assert_eq!(cells(&people[3]), vec!["Dee", "4", "y", "n"]);
    }

    #[test]
    fn test_refresh_filter_parse() {
        assert_eq!(RefreshFilter::parse(""), None);
        assert_eq!(RefreshFilter::parse(" , "), None);
        let filter = RefreshFilter::parse("01/09/21, 08/09/21").unwrap();
        assert!(filter.contains("01/09/21"));
        assert!(filter.contains("08/09/21"));
        assert!(!filter.contains("15/09/21"));
    }
}
