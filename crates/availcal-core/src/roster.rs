use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::RosterError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DailyStatus {
    Free,
    Busy,
    #[default]
    Unknown,
}

impl DailyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Busy => "Busy",
            Self::Unknown => "Unknown",
        }
    }

    /// Case-insensitive; anything else is not a status.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "busy" => Some(Self::Busy),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for DailyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of looking a day up in a person's yearly data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLookup {
    Found(DailyStatus),
    Missing,
}

impl StatusLookup {
    pub fn or_unknown(self) -> DailyStatus {
        match self {
            Self::Found(status) => status,
            Self::Missing => DailyStatus::Unknown,
        }
    }
}

/// Day-of-month position -> status. `None` marks an entry that was present in
/// the data file but not a recognised status.
pub type MonthStatuses = Vec<Option<DailyStatus>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub remaining_holidays: Option<u64>,
    pub available_time: Option<u64>,
    pub yearly: BTreeMap<i32, BTreeMap<u32, MonthStatuses>>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_month<I>(mut self, year: i32, month: u32, statuses: I) -> Self
    where
        I: IntoIterator<Item = DailyStatus>,
    {
        self.yearly
            .entry(year)
            .or_default()
            .insert(month, statuses.into_iter().map(Some).collect());
        self
    }

    /// Positional lookup: `day_index` 0 is the first of the month.
    pub fn status_for(&self, year: i32, month: u32, day_index: usize) -> StatusLookup {
        self.yearly
            .get(&year)
            .and_then(|months| months.get(&month))
            .and_then(|days| days.get(day_index))
            .copied()
            .flatten()
            .map(StatusLookup::Found)
            .unwrap_or(StatusLookup::Missing)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawPerson {
    name: String,
    #[serde(default, rename = "remainingHolidays")]
    remaining_holidays: Option<Value>,
    #[serde(default, rename = "availableTime")]
    available_time: Option<Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

pub struct Roster;

impl Roster {
    /// Decodes a roster document. Only a non-array top level is an error;
    /// bad records are skipped and bad nested values are dropped so that they
    /// read back as missing.
    #[tracing::instrument(skip(text))]
    pub fn from_json_str(text: &str) -> Result<Vec<Person>, RosterError> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|err| RosterError::malformed(format!("invalid json: {err}")))?;

        let Value::Array(items) = doc else {
            return Err(RosterError::malformed("expected a json array of people"));
        };

        let mut people = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<RawPerson>(item) {
                Ok(raw) => people.push(normalize_person(raw)),
                Err(err) => {
                    warn!(index = idx, error = %err, "skipping malformed roster record");
                }
            }
        }

        debug!(count = people.len(), "decoded roster");
        Ok(people)
    }
}

fn normalize_person(raw: RawPerson) -> Person {
    let remaining_holidays = raw
        .remaining_holidays
        .as_ref()
        .and_then(non_negative_count(&raw.name, "remainingHolidays"));
    let available_time = raw
        .available_time
        .as_ref()
        .and_then(non_negative_count(&raw.name, "availableTime"));

    let mut yearly = BTreeMap::new();
    for (key, value) in raw.extra {
        let Ok(year) = key.trim().parse::<i32>() else {
            debug!(person = %raw.name, key = %key, "ignoring non-year key");
            continue;
        };
        let months = normalize_year(&raw.name, year, value);
        if !months.is_empty() {
            yearly.insert(year, months);
        }
    }

    Person {
        name: raw.name,
        remaining_holidays,
        available_time,
        yearly,
    }
}

fn non_negative_count<'a>(person: &'a str, field: &'a str) -> impl Fn(&Value) -> Option<u64> + 'a {
    move |value| {
        if value.is_null() {
            return None;
        }
        // 12.0 counts; 7.5 and negatives don't
        let count = value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
                .map(|n| n as u64)
        });
        if count.is_none() {
            debug!(person, field, value = %value, "dropping non-count summary value");
        }
        count
    }
}

fn normalize_year(person: &str, year: i32, value: Value) -> BTreeMap<u32, MonthStatuses> {
    let Value::Object(months) = value else {
        debug!(person, year, "year entry is not an object");
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for (key, days) in months {
        let month = match key.trim().parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => month,
            _ => {
                debug!(person, year, key = %key, "ignoring non-month key");
                continue;
            }
        };

        let Value::Array(days) = days else {
            debug!(person, year, month, "month entry is not an array");
            continue;
        };

        let statuses = days
            .iter()
            .map(|day| day.as_str().and_then(DailyStatus::parse))
            .collect();
        out.insert(month, statuses);
    }
    out
}

#[tracing::instrument]
pub fn load_roster(path: &Path) -> Result<Vec<Person>, RosterError> {
    let text = fs::read_to_string(path).map_err(|source| RosterError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let people = Roster::from_json_str(&text).map_err(|err| err.with_path(path))?;
    info!(path = %path.display(), count = people.len(), "loaded roster");
    Ok(people)
}

/// A roster that cannot be loaded is treated as empty.
pub fn load_roster_or_empty(path: &Path) -> Vec<Person> {
    match load_roster(path) {
        Ok(people) => people,
        Err(err) => {
            warn!(error = %err, "roster unavailable; continuing with an empty roster");
            Vec::new()
        }
    }
}
