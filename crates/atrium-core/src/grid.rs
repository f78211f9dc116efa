use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  Duration,
  Months,
  NaiveDate
};
use tracing::trace;

use crate::clock::week_start;

pub const MONTH_GRID_CELLS: usize = 42;
pub const WEEK_GRID_CELLS: usize = 7;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default
)]
pub enum CalendarView {
  #[default]
  Month,
  Week,
  Day
}

impl CalendarView {
  pub fn as_str(self) -> &'static str {
    match self {
      | CalendarView::Month => "month",
      | CalendarView::Week => "week",
      | CalendarView::Day => "day"
    }
  }
}

impl fmt::Display for CalendarView {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CalendarView {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" => Ok(CalendarView::Month),
      | "week" => Ok(CalendarView::Week),
      | "day" => Ok(CalendarView::Day),
      | other => {
        Err(anyhow!(
          "unknown calendar view: \
           {other} (expected day, week \
           or month)"
        ))
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq
)]
pub enum Direction {
  Prev,
  Next
}

pub fn build_grid(
  reference: NaiveDate,
  view: CalendarView
) -> Vec<NaiveDate> {
  let (start, cells) = match view {
    | CalendarView::Day => {
      (reference, 1)
    }
    | CalendarView::Week => {
      (
        week_start(reference),
        WEEK_GRID_CELLS
      )
    }
    | CalendarView::Month => {
      (
        week_start(first_of_month(
          reference
        )),
        MONTH_GRID_CELLS
      )
    }
  };
  trace!(%reference, %view, %start, cells, "building date grid");

  start.iter_days().take(cells).collect()
}

// Month cells are plain dates;
// membership is month and year equality.
pub fn is_in_month(
  date: NaiveDate,
  reference: NaiveDate
) -> bool {
  date.year() == reference.year()
    && date.month() == reference.month()
}

// Month steps clamp the day
// (Jan 31 + 1 month is Feb 28/29).
pub fn navigate(
  reference: NaiveDate,
  view: CalendarView,
  direction: Direction
) -> NaiveDate {
  let moved = match (view, direction) {
    | (
      CalendarView::Month,
      Direction::Next
    ) => {
      reference
        .checked_add_months(Months::new(1))
    }
    | (
      CalendarView::Month,
      Direction::Prev
    ) => {
      reference
        .checked_sub_months(Months::new(1))
    }
    | (
      CalendarView::Week,
      Direction::Next
    ) => {
      reference.checked_add_signed(
        Duration::days(7)
      )
    }
    | (
      CalendarView::Week,
      Direction::Prev
    ) => {
      reference.checked_sub_signed(
        Duration::days(7)
      )
    }
    | (
      CalendarView::Day,
      Direction::Next
    ) => reference.succ_opt(),
    | (
      CalendarView::Day,
      Direction::Prev
    ) => reference.pred_opt()
  };
  moved.unwrap_or(reference)
}

fn first_of_month(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}
