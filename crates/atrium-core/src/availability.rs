use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::appointment::{Appointment, CalendarEvent, Location};
use crate::placement::occupies_slot;
use crate::slots::{TimeSlot, generate_slots};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub conflicts: Vec<Appointment>,
}

impl SlotAvailability {
    pub fn is_available(&self) -> bool {
        self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub location_id: u64,
    pub date: NaiveDate,
    pub blocked: bool,
    pub slots: Vec<SlotAvailability>,
}

// Closed days come back blocked with no slots.
pub fn slot_availability(
    date: NaiveDate,
    location: &Location,
    existing: &[Appointment],
    step_minutes: u32,
) -> DayAvailability {
    if !location.working_days.contains(date) {
        debug!(location_id = location.id, %date, "location closed on this weekday");
        return DayAvailability {
            location_id: location.id,
            date,
            blocked: true,
            slots: Vec::new(),
        };
    }

    let events: Vec<CalendarEvent<'_>> = existing
        .iter()
        .filter(|appt| appt.location_id == location.id && appt.date == date && !appt.is_cancelled())
        .map(CalendarEvent::from_appointment)
        .collect();

    let slots = generate_slots(location.opening, location.closing, step_minutes)
        .into_iter()
        .map(|slot| {
            let conflicts = events
                .iter()
                .filter(|event| occupies_slot(event, &slot))
                .map(|event| event.appointment.clone())
                .collect();
            SlotAvailability { slot, conflicts }
        })
        .collect();

    DayAvailability {
        location_id: location.id,
        date,
        blocked: false,
        slots,
    }
}

#[cfg(test)]
mod tests {
    use super::slot_availability;
    use crate::appointment::fixtures::{appointment, day, room};
    use crate::appointment::{Status, WorkingDays};

    #[test]
    fn marks_occupied_slots_with_their_appointments() {
        let mut cancelled = appointment(3, "11:00", "12:00", 1);
        cancelled.status = Status::Cancelled;
        let existing = vec![
            appointment(1, "09:00", "10:00", 2),
            appointment(2, "09:30", "10:15", 2),
            cancelled,
        ];

        let day_view = slot_availability(day(2026, 3, 10), &room(10), &existing, 30);
        assert!(!day_view.blocked);
        assert_eq!(day_view.slots.len(), 18);

        let ids = |idx: usize| -> Vec<u64> {
            day_view.slots[idx]
                .conflicts
                .iter()
                .map(|appt| appt.id)
                .collect()
        };
        assert_eq!(ids(0), vec![1]);
        assert_eq!(ids(1), vec![1, 2]);
        assert_eq!(ids(2), vec![2]);
        assert!(day_view.slots[3].is_available());
        assert!(day_view.slots[4].is_available());
    }

    #[test]
    fn closed_weekday_is_blocked() {
        let day_view = slot_availability(day(2026, 3, 14), &room(10), &[], 30);
        assert!(day_view.blocked);
        assert!(day_view.slots.is_empty());

        let mut weekend_room = room(10);
        weekend_room.working_days = WorkingDays::EVERY_DAY;
        assert!(!slot_availability(day(2026, 3, 14), &weekend_room, &[], 30).blocked);
    }
}
