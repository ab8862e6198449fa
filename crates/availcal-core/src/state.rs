use tracing::debug;

use crate::calendar::{self, DayCell};
use crate::error::CalendarError;
use crate::projector::{self, Column, DisplayRow};
use crate::roster::Person;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    SetYear(i32),
    SetMonth(u32),
    SetFilter(String),
    RosterLoaded(Vec<Person>),
    /// Previous/next month navigation.
    ShiftMonth(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub columns: Vec<Column>,
    pub rows: Vec<DisplayRow>,
}

/// The whole view: selected month, name filter and the loaded roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    year: i32,
    month: u32,
    filter: String,
    roster: Vec<Person>,
}

impl ViewState {
    pub fn new(year: i32, month: u32) -> Result<Self, CalendarError> {
        calendar::days_in_month(year, month)?;
        Ok(Self {
            year,
            month,
            filter: String::new(),
            roster: Vec::new(),
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn roster(&self) -> &[Person] {
        &self.roster
    }

    /// Applies one update. A rejected event leaves the state unchanged.
    pub fn apply(&mut self, event: ViewEvent) -> Result<(), CalendarError> {
        match event {
            ViewEvent::SetYear(year) => {
                calendar::days_in_month(year, self.month)?;
                self.year = year;
            }
            ViewEvent::SetMonth(month) => {
                calendar::days_in_month(self.year, month)?;
                self.month = month;
            }
            ViewEvent::SetFilter(filter) => {
                self.filter = filter;
            }
            ViewEvent::RosterLoaded(people) => {
                self.roster = people;
            }
            ViewEvent::ShiftMonth(delta) => {
                let (year, month) = calendar::shift_month(self.year, self.month, delta)?;
                self.year = year;
                self.month = month;
            }
        }

        debug!(
            year = self.year,
            month = self.month,
            filter = %self.filter,
            roster = self.roster.len(),
            "view state updated"
        );
        Ok(())
    }

    pub fn days(&self) -> Vec<DayCell> {
        // year and month are validated on every transition
        calendar::day_cells(self.year, self.month).unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<DisplayRow> {
        projector::project(&self.roster, &self.days(), &self.filter, self.year, self.month)
    }

    pub fn projection(&self) -> Projection {
        let days = self.days();
        Projection {
            columns: projector::columns(&days),
            rows: projector::project(&self.roster, &days, &self.filter, self.year, self.month),
        }
    }
}
