use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use tracing::trace;

use crate::appointment::{
  Appointment,
  AppointmentType,
  Status
};
use crate::clock::parse_date_expr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pred {
  DateFrom(NaiveDate),
  DateTo(NaiveDate),
  LocationEq(u64),
  StatusIn(Vec<Status>),
  TypeIn(Vec<AppointmentType>),
  ClientContains(String),
  TextContains(String)
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
  preds: Vec<Pred>
}

impl AppointmentFilter {
  #[tracing::instrument(skip(
    terms, today
  ))]
  pub fn parse(
    terms: &[String],
    today: NaiveDate
  ) -> anyhow::Result<Self> {
    let preds = terms
      .iter()
      .filter(|term| {
        !term.trim().is_empty()
      })
      .map(|term| {
        parse_term(term.trim(), today)
      })
      .collect::<anyhow::Result<Vec<_>>>(
      )?;
    trace!(?preds, "parsed appointment filter");
    Ok(Self {
      preds
    })
  }

  pub fn preds(&self) -> &[Pred] {
    &self.preds
  }

  pub fn location(&self) -> Option<u64> {
    self.preds.iter().find_map(|pred| {
      match pred {
        | Pred::LocationEq(id) => Some(*id),
        | _ => None
      }
    })
  }

  // Terms AND together; no terms
  // matches everything.
  pub fn matches(
    &self,
    appointment: &Appointment
  ) -> bool {
    self.preds.iter().all(|pred| {
      eval_pred(pred, appointment)
    })
  }

  pub fn apply(
    &self,
    appointments: &[Appointment]
  ) -> Vec<Appointment> {
    appointments
      .iter()
      .filter(|appt| self.matches(appt))
      .cloned()
      .collect()
  }
}

fn parse_term(
  term: &str,
  today: NaiveDate
) -> anyhow::Result<Pred> {
  let Some((key, value)) =
    term.split_once(':')
  else {
    return Ok(Pred::TextContains(
      term.to_ascii_lowercase()
    ));
  };
  let value = value.trim();

  match key
    .to_ascii_lowercase()
    .as_str()
  {
    | "from" => {
      parse_date_expr(value, today)
        .map(Pred::DateFrom)
        .with_context(|| {
          format!(
            "invalid filter term: {term}"
          )
        })
    }
    | "to" => {
      parse_date_expr(value, today)
        .map(Pred::DateTo)
        .with_context(|| {
          format!(
            "invalid filter term: {term}"
          )
        })
    }
    | "location" | "loc" => {
      value
        .parse::<u64>()
        .map(Pred::LocationEq)
        .with_context(|| {
          format!(
            "invalid location id in \
             filter term: {term}"
          )
        })
    }
    | "status" => {
      split_list(value)
        .map(str::parse::<Status>)
        .collect::<anyhow::Result<Vec<_>>>(
        )
        .map(Pred::StatusIn)
    }
    | "type" => {
      split_list(value)
        .map(
          str::parse::<AppointmentType>
        )
        .collect::<anyhow::Result<Vec<_>>>(
        )
        .map(Pred::TypeIn)
    }
    | "client" => {
      Ok(Pred::ClientContains(
        value.to_ascii_lowercase()
      ))
    }
    | other => {
      Err(anyhow!(
        "unknown filter key: {other}"
      ))
    }
  }
}

fn split_list(
  value: &str
) -> impl Iterator<Item = &str> {
  value
    .split(',')
    .map(str::trim)
    .filter(|item| !item.is_empty())
}

fn contains_ignore_case(
  haystack: &str,
  needle: &str
) -> bool {
  haystack
    .to_ascii_lowercase()
    .contains(needle)
}

fn eval_pred(
  pred: &Pred,
  appt: &Appointment
) -> bool {
  match pred {
    | Pred::DateFrom(from) => {
      appt.date >= *from
    }
    | Pred::DateTo(to) => appt.date <= *to,
    | Pred::LocationEq(id) => {
      appt.location_id == *id
    }
    | Pred::StatusIn(statuses) => {
      statuses.contains(&appt.status)
    }
    | Pred::TypeIn(kinds) => {
      kinds.contains(&appt.kind)
    }
    | Pred::ClientContains(needle) => {
      appt
        .client_name
        .as_deref()
        .is_some_and(|name| {
          contains_ignore_case(name, needle)
        })
    }
    | Pred::TextContains(needle) => {
      contains_ignore_case(
        &appt.title,
        needle
      ) || contains_ignore_case(
        &appt.code, needle
      ) || appt
        .client_name
        .as_deref()
        .is_some_and(|name| {
          contains_ignore_case(name, needle)
        })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{
    AppointmentFilter,
    Pred
  };
  use crate::appointment::fixtures::{
    appointment,
    day
  };
  use crate::appointment::{
    AppointmentType,
    Status
  };

  fn terms(raw: &[&str]) -> Vec<String> {
    raw
      .iter()
      .map(|s| s.to_string())
      .collect()
  }

  #[test]
  fn empty_filter_matches_everything() {
    let filter = AppointmentFilter::parse(
      &[],
      day(2026, 3, 10)
    )
    .expect("parse");
    assert!(filter.matches(&appointment(
      1, "09:00", "10:00", 1
    )));
  }

  #[test]
  fn terms_combine_with_and() {
    let today = day(2026, 3, 10);
    let filter = AppointmentFilter::parse(
      &terms(&[
        "from:today",
        "to:+2d",
        "status:confirmed,pending",
        "location:1"
      ]),
      today
    )
    .expect("parse");

    let inside =
      appointment(1, "09:00", "10:00", 1);
    let mut cancelled =
      appointment(2, "09:00", "10:00", 1);
    cancelled.status = Status::Cancelled;
    let mut later =
      appointment(3, "09:00", "10:00", 1);
    later.date = day(2026, 3, 13);
    let mut elsewhere =
      appointment(4, "09:00", "10:00", 1);
    elsewhere.location_id = 9;

    let kept = filter.apply(&[
      inside, cancelled, later, elsewhere
    ]);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, 1);
    assert_eq!(filter.location(), Some(1));
  }

  #[test]
  fn text_and_client_search_ignore_case()
  {
    let mut appt =
      appointment(1, "09:00", "10:00", 1);
    appt.title =
      "Quarterly Review".to_string();
    appt.client_name =
      Some("Ana Ruiz".to_string());

    let today = day(2026, 3, 10);
    let by_title = AppointmentFilter::parse(
      &terms(&["REVIEW"]),
      today
    )
    .expect("parse");
    let by_client =
      AppointmentFilter::parse(
        &terms(&["client:ruiz"]),
        today
      )
      .expect("parse");
    let by_code = AppointmentFilter::parse(
      &terms(&["apt-001"]),
      today
    )
    .expect("parse");
    let miss = AppointmentFilter::parse(
      &terms(&["client:perez"]),
      today
    )
    .expect("parse");
    assert!(by_title.matches(&appt));
    assert!(by_client.matches(&appt));
    assert!(by_code.matches(&appt));
    assert!(!miss.matches(&appt));
  }

  #[test]
  fn type_lists_parse_into_closed_variants()
  {
    let filter = AppointmentFilter::parse(
      &terms(&["type:demo, training"]),
      day(2026, 3, 10)
    )
    .expect("parse");
    assert_eq!(
      filter.preds(),
      &[Pred::TypeIn(vec![
        AppointmentType::Demo,
        AppointmentType::Training
      ])]
    );
  }

  #[test]
  fn rejects_unknown_keys_and_values() {
    let today = day(2026, 3, 10);
    for bad in [
      "room:1",
      "status:done",
      "location:abc",
      "from:someday",
      "to:+9999999999999999d"
    ] {
      assert!(
        AppointmentFilter::parse(
          &terms(&[bad]),
          today
        )
        .is_err(),
        "{bad}"
      );
    }
  }
}
