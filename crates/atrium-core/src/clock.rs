use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveTime,
  Weekday
};
use regex::Regex;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};

pub const MINUTES_PER_DAY: u32 =
  24 * 60;

// Minutes past midnight; every value
// is a valid wall-clock time.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash
)]
pub struct ClockTime(u32);

impl ClockTime {
  pub const MIDNIGHT: Self = Self(0);

  pub const fn from_hm(
    hour: u32,
    minute: u32
  ) -> Option<Self> {
    if hour > 23 || minute > 59 {
      return None;
    }
    Some(Self(hour * 60 + minute))
  }

  pub const fn minutes(self) -> u32 {
    self.0
  }

  pub fn hour(self) -> u32 {
    self.0 / 60
  }

  pub fn minute(self) -> u32 {
    self.0 % 60
  }

  pub fn to_naive_time(
    self
  ) -> NaiveTime {
    NaiveTime::from_hms_opt(
      self.hour(),
      self.minute(),
      0
    )
    .unwrap_or(NaiveTime::MIN)
  }

  pub fn minutes_until(
    self,
    later: ClockTime
  ) -> u32 {
    later.0.saturating_sub(self.0)
  }
}

impl fmt::Display for ClockTime {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:02}:{:02}",
      self.hour(),
      self.minute()
    )
  }
}

impl FromStr for ClockTime {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (hour, minute) =
      parse_clock_time(s).ok_or_else(
        || {
          anyhow!(
            "invalid clock time: {s}"
          )
        }
      )?;
    Self::from_hm(hour, minute)
      .ok_or_else(|| {
        anyhow!(
          "clock time out of range: \
           {s}"
        )
      })
  }
}

impl Serialize for ClockTime {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de>
  for ClockTime
{
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      String::deserialize(deserializer)?;
    raw
      .parse()
      .map_err(serde::de::Error::custom)
  }
}

// ISO numbering: Monday is 1, Sunday 7.
pub fn iso_weekday(
  date: NaiveDate
) -> u32 {
  date.weekday().number_from_monday()
}

pub fn week_start(
  date: NaiveDate
) -> NaiveDate {
  let back = date
    .weekday()
    .num_days_from_monday()
    as i64;
  date
    .checked_sub_signed(Duration::days(
      back
    ))
    .unwrap_or(date)
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  let rel_re = relative_regex()
    .ok_or_else(|| {
      anyhow!(
        "internal regex compile \
         failure"
      )
    })?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let days = match unit {
      | "d" => num,
      | "w" => num.saturating_mul(7),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    return shift_days(
      today,
      if sign == "-" {
        -days
      } else {
        days
      }
    );
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map_err(|_| {
    anyhow!(
      "unrecognized date expression: \
       {input}"
    )
  })
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd, +Nw/-Nw, YYYY-MM-DD"
  })
}

fn shift_days(
  from: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      from.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {from} \
         {days:+} days"
      )
    })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx =
    target.num_days_from_monday() as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

fn relative_regex()
-> Option<&'static Regex> {
  static RELATIVE_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  RELATIVE_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
      )
      .ok()
    })
    .as_ref()
}

fn clock_regex()
-> Option<&'static Regex> {
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<ampm>[ap]m)?$"
      )
      .ok()
    })
    .as_ref()
}

// Accepts 24h `H:MM`/`HH:MM` and 12h
// `9am`, `9:30pm`. A bare hour needs
// the am/pm suffix.
fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let captures =
    clock_regex()?.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = match captures
    .name("minute")
  {
    | Some(m) => {
      m.as_str().parse::<u32>().ok()?
    }
    | None if captures
      .name("ampm")
      .is_some() =>
    {
      0
    }
    | None => return None
  };
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm_match
      .as_str()
      .to_ascii_lowercase()
      .as_str()
    {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}
