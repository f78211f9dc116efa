use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::appointment::{
  Appointment,
  Location
};
use crate::clock::ClockTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
  pub location_id:  u64,
  pub date:         NaiveDate,
  pub start_time:   ClockTime,
  pub end_time:     ClockTime,
  pub participants: u32,
  // id of the record being edited
  pub replaces:     Option<u64>
}

impl From<&Appointment> for Candidate {
  fn from(
    appointment: &Appointment
  ) -> Self {
    Self {
      location_id:  appointment
        .location_id,
      date:         appointment.date,
      start_time:   appointment
        .start_time,
      end_time:     appointment.end_time,
      participants: appointment
        .participants,
      replaces:     Some(appointment.id)
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize
)]
#[serde(
  tag = "type",
  rename_all = "snake_case"
)]
pub enum ConflictResult {
  Clear,
  Overlap {
    conflicting: Vec<Appointment>
  },
  Capacity {
    requested: u32,
    available: u32
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
#[serde(rename_all = "snake_case")]
pub enum Remedy {
  DifferentTime,
  DifferentLocation,
  AdjustDuration,
  FewerParticipants,
  LargerLocation,
  SplitSession
}

impl ConflictResult {
  pub fn is_clear(&self) -> bool {
    matches!(self, ConflictResult::Clear)
  }

  pub fn remedies(
    &self
  ) -> &'static [Remedy] {
    match self {
      | ConflictResult::Clear => &[],
      | ConflictResult::Overlap {
        ..
      } => &[
        Remedy::DifferentTime,
        Remedy::DifferentLocation,
        Remedy::AdjustDuration
      ],
      | ConflictResult::Capacity {
        ..
      } => &[
        Remedy::FewerParticipants,
        Remedy::LargerLocation,
        Remedy::SplitSession
      ]
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
#[serde(
  tag = "type",
  rename_all = "snake_case"
)]
pub enum HoursViolation {
  Closed,
  OutsideHours {
    opening: ClockTime,
    closing: ClockTime
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize
)]
#[serde(
  tag = "outcome",
  rename_all = "snake_case"
)]
pub enum Booking {
  Rejected {
    violation: HoursViolation
  },
  Checked {
    result: ConflictResult
  }
}

impl Booking {
  pub fn is_clear(&self) -> bool {
    matches!(
      self,
      Booking::Checked { result }
        if result.is_clear()
    )
  }
}

// Half-open: [s1, e1) and [s2, e2).
pub fn intervals_overlap(
  s1: ClockTime,
  e1: ClockTime,
  s2: ClockTime,
  e2: ClockTime
) -> bool {
  s1 < e2 && s2 < e1
}

fn overlaps_candidate(
  candidate: &Candidate,
  appointment: &Appointment
) -> bool {
  intervals_overlap(
    candidate.start_time,
    candidate.end_time,
    appointment.start_time,
    appointment.end_time
  )
}

fn same_room<'a>(
  candidate: &Candidate,
  existing: &'a [Appointment]
) -> Vec<&'a Appointment> {
  existing
    .iter()
    .filter(|appt| {
      appt.location_id
        == candidate.location_id
        && appt.date == candidate.date
        && !appt.is_cancelled()
        && candidate.replaces
          != Some(appt.id)
    })
    .collect()
}

pub fn requested_headcount(
  candidate: &Candidate,
  existing: &[Appointment]
) -> u32 {
  same_room(candidate, existing)
    .into_iter()
    .filter(|appt| {
      overlaps_candidate(candidate, appt)
    })
    .fold(
      candidate.participants,
      |total, appt| {
        total
          .saturating_add(appt.participants)
      }
    )
}

// Capacity rule alone: only Clear or
// Capacity come back.
pub fn check_capacity(
  candidate: &Candidate,
  existing: &[Appointment],
  location_capacity: u32
) -> ConflictResult {
  let requested = requested_headcount(
    candidate, existing
  );
  if requested > location_capacity {
    debug!(
      location_id = candidate.location_id,
      date = %candidate.date,
      requested,
      available = location_capacity,
      "capacity conflict"
    );
    return ConflictResult::Capacity {
      requested,
      available: location_capacity
    };
  }
  ConflictResult::Clear
}

// Overlap is checked first; a
// double-booking is never reported as
// a full room.
pub fn validate(
  candidate: &Candidate,
  existing: &[Appointment],
  location_capacity: u32
) -> ConflictResult {
  let conflicting: Vec<Appointment> =
    same_room(candidate, existing)
      .into_iter()
      .filter(|appt| {
        overlaps_candidate(
          candidate, appt
        )
      })
      .cloned()
      .collect();

  if !conflicting.is_empty() {
    debug!(
      location_id = candidate.location_id,
      date = %candidate.date,
      count = conflicting.len(),
      "overlap conflict"
    );
    return ConflictResult::Overlap {
      conflicting
    };
  }

  check_capacity(
    candidate,
    existing,
    location_capacity
  )
}

pub fn check_opening_hours(
  candidate: &Candidate,
  location: &Location
) -> Option<HoursViolation> {
  if !location
    .working_days
    .contains(candidate.date)
  {
    return Some(HoursViolation::Closed);
  }
  if candidate.start_time
    < location.opening
    || candidate.end_time
      > location.closing
  {
    return Some(
      HoursViolation::OutsideHours {
        opening: location.opening,
        closing: location.closing
      }
    );
  }
  None
}

pub fn validate_at(
  candidate: &Candidate,
  existing: &[Appointment],
  location: &Location
) -> Booking {
  if let Some(violation) =
    check_opening_hours(
      candidate, location
    )
  {
    debug!(location_id = location.id, ?violation, "booking outside opening hours");
    return Booking::Rejected {
      violation
    };
  }
  Booking::Checked {
    result: validate(
      candidate,
      existing,
      location.capacity
    )
  }
}
