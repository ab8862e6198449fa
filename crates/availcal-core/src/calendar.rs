use chrono::{
  Datelike,
  Month,
  NaiveDate
};

use crate::error::CalendarError;

const ISO_DAY_FORMAT: &str = "%Y-%m-%d";
const DAY_LABEL_FORMAT: &str = "%b %-d";

/// One day column of the active month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
  pub date:  NaiveDate,
  pub key:   String,
  pub label: String
}

impl DayCell {
  #[must_use]
  pub fn from_date(
    date: NaiveDate
  ) -> Self {
    Self {
      date,
      key: date
        .format(ISO_DAY_FORMAT)
        .to_string(),
      label: date
        .format(DAY_LABEL_FORMAT)
        .to_string()
    }
  }

  /// 0-based position of this day in
  /// its month.
  #[must_use]
  pub fn index_in_month(
    &self
  ) -> usize {
    self.date.day0() as usize
  }
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> Result<NaiveDate, CalendarError> {
  if !(1..=12).contains(&month) {
    return Err(
      CalendarError::InvalidMonth(month)
    );
  }
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .ok_or(CalendarError::InvalidYear(
    year
  ))
}

/// Every date of `month` in `year`,
/// ascending, first through last day
/// inclusive.
pub fn days_in_month(
  year: i32,
  month: u32
) -> Result<Vec<NaiveDate>, CalendarError>
{
  let first =
    first_day_of_month(year, month)?;
  let days: Vec<NaiveDate> = first
    .iter_days()
    .take_while(|day| {
      day.month() == month
    })
    .collect();

  tracing::trace!(
    year,
    month,
    count = days.len(),
    "computed month range"
  );
  Ok(days)
}

pub fn day_cells(
  year: i32,
  month: u32
) -> Result<Vec<DayCell>, CalendarError>
{
  Ok(
    days_in_month(year, month)?
      .into_iter()
      .map(DayCell::from_date)
      .collect()
  )
}

/// Full English month name, as the
/// month picker lists it.
#[must_use]
pub fn month_name(
  month: u32
) -> Option<&'static str> {
  let month = u8::try_from(month).ok()?;
  Month::try_from(month)
    .ok()
    .map(|m| m.name())
}

/// Resolves a month picker token: a
/// number in 1..=12 or an unambiguous
/// English name prefix ("may", "sep").
#[must_use]
pub fn parse_month(
  token: &str
) -> Option<u32> {
  let token = token.trim();
  if let Ok(value) = token.parse::<u32>()
  {
    return (1..=12)
      .contains(&value)
      .then_some(value);
  }

  let lowered = token.to_lowercase();
  if lowered.is_empty() {
    return None;
  }

  let mut matches = (1..=12_u32)
    .filter(|m| {
      month_name(*m)
        .map(|name| {
          name
            .to_lowercase()
            .starts_with(&lowered)
        })
        .unwrap_or(false)
    });
  let first = matches.next()?;
  if matches.next().is_some() {
    None
  } else {
    Some(first)
  }
}

/// Moves `(year, month)` by `delta`
/// months, carrying across year
/// boundaries.
pub fn shift_month(
  year: i32,
  month: u32,
  delta: i32
) -> Result<(i32, u32), CalendarError>
{
  first_day_of_month(year, month)?;

  let zero_based = i64::from(year) * 12
    + i64::from(month)
    - 1
    + i64::from(delta);
  let new_year = zero_based.div_euclid(12);
  let new_month =
    zero_based.rem_euclid(12) as u32 + 1;
  let new_year = i32::try_from(new_year)
    .map_err(|_| {
      CalendarError::InvalidYear(year)
    })?;

  first_day_of_month(
    new_year, new_month
  )?;
  Ok((new_year, new_month))
}
