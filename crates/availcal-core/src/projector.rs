//! Joins the roster against the days of the active month.
//!
//! Rows are built positionally: day N of the month reads index N-1 of the
//! person's status array for that year and month, whatever the weekday.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::{debug, trace};

use crate::calendar::DayCell;
use crate::roster::{DailyStatus, Person};

pub const SUMMARY_FIELD_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Name,
    RemainingHolidays,
    AvailableTime,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub kind: ColumnKind,
}

impl Column {
    fn summary(key: &str, label: &str, kind: ColumnKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub name: String,
    pub remaining_holidays: Option<u64>,
    pub available_time: Option<u64>,
    /// `(ISO day key, status)` in day order.
    pub cells: Vec<(String, DailyStatus)>,
}

impl DisplayRow {
    pub fn status_on(&self, key: &str) -> Option<DailyStatus> {
        self.cells
            .iter()
            .find(|(cell_key, _)| cell_key == key)
            .map(|(_, status)| *status)
    }

    pub fn count(&self, status: DailyStatus) -> usize {
        self.cells.iter().filter(|(_, s)| *s == status).count()
    }

    pub fn field_count(&self) -> usize {
        SUMMARY_FIELD_COUNT + self.cells.len()
    }
}

impl Serialize for DisplayRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("remainingHolidays", &self.remaining_holidays)?;
        map.serialize_entry("availableTime", &self.available_time)?;
        for (key, status) in &self.cells {
            map.serialize_entry(key, status.as_str())?;
        }
        map.end()
    }
}

/// Case-insensitive substring match; an empty filter matches everyone.
pub fn name_matches(name: &str, filter: &str) -> bool {
    filter.is_empty() || name.to_lowercase().contains(&filter.to_lowercase())
}

pub fn columns(days: &[DayCell]) -> Vec<Column> {
    let mut out = Vec::with_capacity(SUMMARY_FIELD_COUNT + days.len());
    out.push(Column::summary("name", "Name", ColumnKind::Name));
    out.push(Column::summary(
        "remainingHolidays",
        "Remaining holidays",
        ColumnKind::RemainingHolidays,
    ));
    out.push(Column::summary(
        "availableTime",
        "Available time",
        ColumnKind::AvailableTime,
    ));
    out.extend(days.iter().map(|day| Column {
        key: day.key.clone(),
        label: day.label.clone(),
        kind: ColumnKind::Day,
    }));
    out
}

#[tracing::instrument(skip(people, days), fields(people = people.len(), days = days.len()))]
pub fn project(
    people: &[Person],
    days: &[DayCell],
    filter: &str,
    year: i32,
    month: u32,
) -> Vec<DisplayRow> {
    let rows: Vec<DisplayRow> = people
        .iter()
        .filter(|person| name_matches(&person.name, filter))
        .map(|person| {
            let cells = days
                .iter()
                .map(|day| {
                    let status = person
                        .status_for(year, month, day.index_in_month())
                        .or_unknown();
                    (day.key.clone(), status)
                })
                .collect();
            trace!(person = %person.name, "projected row");
            DisplayRow {
                name: person.name.clone(),
                remaining_holidays: person.remaining_holidays,
                available_time: person.available_time,
                cells,
            }
        })
        .collect();

    debug!(rows = rows.len(), "projected availability table");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::day_cells;
    use crate::roster::DailyStatus::{Busy, Free, Unknown};

    fn first_days(year: i32, month: u32, count: usize) -> Vec<DayCell> {
        let mut cells = day_cells(year, month).expect("valid month");
        cells.truncate(count);
        cells
    }

    fn roster() -> Vec<Person> {
        vec![
            Person::new("Alice").with_month(2024, 5, [Free, Busy]),
            Person::new("Bob").with_month(2024, 5, [Busy, Busy, Free]),
            Person::new("bobby tables"),
            Person::new("Charlie"),
        ]
    }

    #[test]
    fn short_status_array_pads_with_unknown() {
        let people = vec![Person::new("Alice").with_month(2024, 5, [Free, Busy])];
        let days = first_days(2024, 5, 3);

        let rows = project(&people, &days, "", 2024, 5);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status_on("2024-05-01"), Some(Free));
        assert_eq!(rows[0].status_on("2024-05-02"), Some(Busy));
        assert_eq!(rows[0].status_on("2024-05-03"), Some(Unknown));
    }

    #[test]
    fn filter_is_case_insensitive_and_keeps_order() {
        let days = first_days(2024, 5, 3);
        let rows = project(&roster(), &days, "bob", 2024, 5);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "bobby tables"]);

        let rows = project(&roster(), &days, "LIC", 2024, 5);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Alice");

        let rows = project(&roster(), &days, "", 2024, 5);
        assert_eq!(rows.len(), 4);

        let rows = project(&roster(), &days, "zed", 2024, 5);
        assert!(rows.is_empty());
    }

    #[test]
    fn every_matching_person_appears_exactly_once() {
        let people = roster();
        let days = first_days(2024, 5, 1);
        for filter in ["", "b", "o", "E", "char", "x"] {
            let rows = project(&people, &days, filter, 2024, 5);
            let expected: Vec<&str> = people
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&filter.to_lowercase()))
                .map(|p| p.name.as_str())
                .collect();
            let got: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(got, expected, "filter {filter:?}");
        }
    }

    #[test]
    fn missing_month_resolves_every_cell_to_unknown() {
        let days = day_cells(2024, 6).expect("valid month");
        let rows = project(&roster(), &days, "alice", 2024, 6);
        assert_eq!(rows[0].cells.len(), 30);
        assert!(rows[0].cells.iter().all(|(_, s)| *s == Unknown));

        let rows = project(&roster(), &days, "alice", 2023, 5);
        assert!(rows[0].cells.iter().all(|(_, s)| *s == Unknown));
    }

    #[test]
    fn projection_is_idempotent_and_leaves_roster_untouched() {
        let people = roster();
        let snapshot = people.clone();
        let days = day_cells(2024, 5).expect("valid month");

        let first = project(&people, &days, "o", 2024, 5);
        let second = project(&people, &days, "o", 2024, 5);
        assert_eq!(first, second);
        assert_eq!(people, snapshot);
    }

    #[test]
    fn row_shape_matches_active_month() {
        let mut people = roster();
        people[0].remaining_holidays = Some(4);
        let days = day_cells(2024, 2).expect("valid month");
        let rows = project(&people, &days, "", 2024, 2);
        assert!(rows.iter().all(|r| r.field_count() == SUMMARY_FIELD_COUNT + 29));
        assert_eq!(rows[0].remaining_holidays, Some(4));
        assert_eq!(rows[0].available_time, None);
    }

    #[test]
    fn columns_lead_with_summary_fields() {
        let days = first_days(2024, 5, 2);
        let cols = columns(&days);
        let keys: Vec<&str> = cols.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["name", "remainingHolidays", "availableTime", "2024-05-01", "2024-05-02"]
        );
        assert_eq!(cols[3].label, "May 1");
        assert_eq!(cols[3].kind, ColumnKind::Day);
    }

    #[test]
    fn rows_serialize_as_flat_objects() {
        let days = first_days(2024, 5, 2);
        let rows = project(&roster(), &days, "alice", 2024, 5);
        let value = serde_json::to_value(&rows).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!([{
                "name": "Alice",
                "remainingHolidays": null,
                "availableTime": null,
                "2024-05-01": "Free",
                "2024-05-02": "Busy"
            }])
        );
    }

    #[test]
    fn free_and_busy_counts() {
        let days = first_days(2024, 5, 4);
        let rows = project(&roster(), &days, "bob", 2024, 5);
        assert_eq!(rows[0].count(Busy), 2);
        assert_eq!(rows[0].count(Free), 1);
        assert_eq!(rows[0].count(Unknown), 1);
    }
}
