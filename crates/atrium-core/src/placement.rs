use chrono::NaiveDate;
use serde::Serialize;
use tracing::trace;

use crate::appointment::CalendarEvent;
use crate::slots::TimeSlot;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
pub struct Placement {
  pub start_slot_index: usize,
  pub slot_span:        u32
}

// Half-open: the end slot is free.
pub fn occupies_slot(
  event: &CalendarEvent<'_>,
  slot: &TimeSlot
) -> bool {
  let start =
    event.start_time().minutes();
  let end = event.end_time().minutes();
  start <= slot.minute_offset
    && slot.minute_offset < end
}

// 09:05 on a 30 minute step starts in
// the 09:00 row.
pub fn snapped_start(
  event: &CalendarEvent<'_>,
  step_minutes: u32
) -> u32 {
  let start =
    event.start_time().minutes();
  if step_minutes == 0 {
    return start;
  }
  start - start % step_minutes
}

pub fn is_start_slot(
  event: &CalendarEvent<'_>,
  slot: &TimeSlot,
  step_minutes: u32
) -> bool {
  slot.minute_offset
    == snapped_start(event, step_minutes)
}

pub fn slot_span(
  event: &CalendarEvent<'_>,
  step_minutes: u32
) -> u32 {
  if step_minutes == 0 {
    return 1;
  }
  event
    .duration_minutes()
    .div_ceil(step_minutes)
    .max(1)
}

pub fn place_event(
  event: &CalendarEvent<'_>,
  slots: &[TimeSlot],
  step_minutes: u32
) -> Option<Placement> {
  let start_slot_index =
    slots.iter().position(|slot| {
      is_start_slot(
        event,
        slot,
        step_minutes
      )
    })?;
  let placement = Placement {
    start_slot_index,
    slot_span: slot_span(
      event,
      step_minutes
    )
  };
  trace!(
    appointment = event.appointment.id,
    start_slot_index,
    slot_span = placement.slot_span,
    "placed event"
  );
  Some(placement)
}

pub fn events_on_day<'a>(
  events: &[CalendarEvent<'a>],
  date: NaiveDate
) -> Vec<CalendarEvent<'a>> {
  events
    .iter()
    .filter(|event| event.date() == date)
    .copied()
    .collect()
}

pub fn events_in_range<'a>(
  events: &[CalendarEvent<'a>],
  from: NaiveDate,
  to: NaiveDate
) -> Vec<CalendarEvent<'a>> {
  events
    .iter()
    .filter(|event| {
      (from..=to).contains(&event.date())
    })
    .copied()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::{
    Placement,
    events_in_range,
    events_on_day,
    is_start_slot,
    occupies_slot,
    place_event,
    slot_span
  };
  use crate::appointment::CalendarEvent;
  use crate::appointment::fixtures::{
    appointment,
    at,
    day
  };
  use crate::slots::{
    calendar_slots,
    generate_slots
  };

  #[test]
  fn off_grid_start_snaps_down_and_spans_two_slots()
  {
    let appt =
      appointment(1, "09:15", "10:00", 1);
    let event =
      CalendarEvent::from_appointment(&appt);
    let slots = generate_slots(
      at("09:00"),
      at("11:00"),
      30
    );

    let starts: Vec<&str> = slots
      .iter()
      .filter(|slot| {
        is_start_slot(&event, slot, 30)
      })
      .map(|slot| slot.label.as_str())
      .collect();
    assert_eq!(starts, vec!["09:00"]);
    assert_eq!(slot_span(&event, 30), 2);
    assert_eq!(
      place_event(&event, &slots, 30),
      Some(Placement {
        start_slot_index: 0,
        slot_span:        2
      })
    );
  }

  #[test]
  fn snapping_uses_the_lower_half_hour() {
    let appt =
      appointment(1, "09:45", "10:15", 1);
    let event =
      CalendarEvent::from_appointment(&appt);
    let slots = generate_slots(
      at("09:00"),
      at("11:00"),
      30
    );
    let placement =
      place_event(&event, &slots, 30)
        .expect("placed");
    assert_eq!(
      slots[placement.start_slot_index]
        .label,
      "09:30"
    );
    assert_eq!(placement.slot_span, 1);
  }

  #[test]
  fn occupancy_excludes_the_end_slot() {
    let appt =
      appointment(1, "09:00", "10:00", 1);
    let event =
      CalendarEvent::from_appointment(&appt);
    let slots = generate_slots(
      at("08:30"),
      at("10:30"),
      30
    );
    let occupied: Vec<&str> = slots
      .iter()
      .filter(|slot| {
        occupies_slot(&event, slot)
      })
      .map(|slot| slot.label.as_str())
      .collect();
    assert_eq!(
      occupied,
      vec!["09:00", "09:30"]
    );
  }

  #[test]
  fn short_events_span_at_least_one_slot()
  {
    let appt =
      appointment(1, "09:00", "09:10", 1);
    let event =
      CalendarEvent::from_appointment(&appt);
    assert_eq!(slot_span(&event, 30), 1);
    assert_eq!(slot_span(&event, 0), 1);
  }

  #[test]
  fn events_before_opening_are_not_placed()
  {
    let appt =
      appointment(1, "06:00", "07:30", 1);
    let event =
      CalendarEvent::from_appointment(&appt);
    assert_eq!(
      place_event(
        &event,
        &calendar_slots(),
        30
      ),
      None
    );
  }

  #[test]
  fn day_and_range_queries_use_the_start_date()
  {
    let mut monday =
      appointment(1, "09:00", "10:00", 1);
    monday.date = day(2026, 3, 9);
    let tuesday =
      appointment(2, "09:00", "10:00", 1);
    let mut friday =
      appointment(3, "09:00", "10:00", 1);
    friday.date = day(2026, 3, 13);

    let records = [monday, tuesday, friday];
    let events: Vec<CalendarEvent<'_>> =
      records
        .iter()
        .map(CalendarEvent::from_appointment)
        .collect();

    let today = events_on_day(
      &events,
      day(2026, 3, 10)
    );
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].appointment.id, 2);

    let ids: Vec<u64> = events_in_range(
      &events,
      day(2026, 3, 9),
      day(2026, 3, 10)
    )
    .iter()
    .map(|event| event.appointment.id)
    .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
      events_in_range(
        &events,
        day(2026, 3, 9),
        day(2026, 3, 13)
      )
      .len(),
      3
    );
  }
}
