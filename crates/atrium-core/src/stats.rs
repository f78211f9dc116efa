use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::appointment::{Appointment, AppointmentType, Location, Status};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
    pub by_type: BTreeMap<AppointmentType, usize>,
}

// Every known status and type is a key, zero when absent.
pub fn aggregate(appointments: &[Appointment]) -> EventStats {
    let mut by_status: BTreeMap<Status, usize> =
        Status::ALL.into_iter().map(|status| (status, 0)).collect();
    let mut by_type: BTreeMap<AppointmentType, usize> =
        AppointmentType::ALL.into_iter().map(|kind| (kind, 0)).collect();

    for appt in appointments {
        *by_status.entry(appt.status).or_default() += 1;
        *by_type.entry(appt.kind).or_default() += 1;
    }

    EventStats {
        total: appointments.len(),
        by_status,
        by_type,
    }
}

pub fn daily_load(appointments: &[Appointment], days: &[NaiveDate]) -> Vec<(NaiveDate, usize)> {
    days.iter()
        .map(|day| {
            let count = appointments
                .iter()
                .filter(|appt| appt.date == *day && !appt.is_cancelled())
                .count();
            (*day, count)
        })
        .collect()
}

pub fn peak_hours(appointments: &[Appointment]) -> Vec<(u32, usize)> {
    let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for appt in appointments.iter().filter(|appt| !appt.is_cancelled()) {
        *per_hour.entry(appt.start_time.hour()).or_default() += 1;
    }
    rank_busiest_first(per_hour)
}

pub fn most_used_locations(appointments: &[Appointment]) -> Vec<(u64, usize)> {
    let mut per_location: BTreeMap<u64, usize> = BTreeMap::new();
    for appt in appointments.iter().filter(|appt| !appt.is_cancelled()) {
        *per_location.entry(appt.location_id).or_default() += 1;
    }
    rank_busiest_first(per_location)
}

// Mean of participants / capacity over non-cancelled appointments at a
// known location with non-zero capacity. None when nothing qualifies.
pub fn average_occupancy(appointments: &[Appointment], locations: &[Location]) -> Option<f64> {
    let capacity: BTreeMap<u64, u32> = locations
        .iter()
        .filter(|location| location.capacity > 0)
        .map(|location| (location.id, location.capacity))
        .collect();

    let ratios: Vec<f64> = appointments
        .iter()
        .filter(|appt| !appt.is_cancelled())
        .filter_map(|appt| {
            capacity
                .get(&appt.location_id)
                .map(|cap| f64::from(appt.participants) / f64::from(*cap))
        })
        .collect();

    if ratios.is_empty() {
        return None;
    }
    Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
}

// Ties keep ascending key order.
fn rank_busiest_first<K: Ord + Copy>(counts: BTreeMap<K, usize>) -> Vec<(K, usize)> {
    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::{aggregate, average_occupancy, daily_load, most_used_locations, peak_hours};
    use crate::appointment::fixtures::{appointment, day, room};
    use crate::appointment::{AppointmentType, Status};

    #[test]
    fn empty_input_reports_every_key_with_zero() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_status.len(), Status::ALL.len());
        assert_eq!(stats.by_type.len(), AppointmentType::ALL.len());
        assert!(stats.by_status.values().all(|count| *count == 0));
        assert!(stats.by_type.values().all(|count| *count == 0));
    }

    #[test]
    fn counts_by_status_and_type() {
        let mut pending = appointment(1, "09:00", "10:00", 1);
        pending.status = Status::Pending;
        let mut demo = appointment(2, "10:00", "11:00", 1);
        demo.kind = AppointmentType::Demo;
        let confirmed = appointment(3, "11:00", "12:00", 1);

        let stats = aggregate(&[pending, demo, confirmed]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status[&Status::Pending], 1);
        assert_eq!(stats.by_status[&Status::Confirmed], 2);
        assert_eq!(stats.by_status[&Status::Cancelled], 0);
        assert_eq!(stats.by_type[&AppointmentType::Meeting], 2);
        assert_eq!(stats.by_type[&AppointmentType::Demo], 1);
        assert_eq!(stats.by_type[&AppointmentType::Training], 0);
    }

    #[test]
    fn daily_load_skips_cancelled() {
        let mut cancelled = appointment(2, "10:00", "11:00", 1);
        cancelled.status = Status::Cancelled;
        let records = [appointment(1, "09:00", "10:00", 1), cancelled];

        let load = daily_load(&records, &[day(2026, 3, 9), day(2026, 3, 10)]);
        assert_eq!(load, vec![(day(2026, 3, 9), 0), (day(2026, 3, 10), 1)]);
    }

    #[test]
    fn peak_hours_rank_busiest_first() {
        let records = [
            appointment(1, "09:00", "09:30", 1),
            appointment(2, "14:00", "15:00", 1),
            appointment(3, "14:30", "15:00", 1),
            appointment(4, "11:00", "12:00", 1),
        ];
        assert_eq!(peak_hours(&records), vec![(14, 2), (9, 1), (11, 1)]);
    }

    #[test]
    fn most_used_locations_skip_cancelled_and_break_ties_by_id() {
        let mut hall = appointment(1, "09:00", "10:00", 1);
        hall.location_id = 7;
        let mut hall_again = appointment(2, "10:00", "11:00", 1);
        hall_again.location_id = 7;
        let mut dropped = appointment(3, "11:00", "12:00", 1);
        dropped.location_id = 9;
        dropped.status = Status::Cancelled;
        let mut annex = appointment(4, "12:00", "13:00", 1);
        annex.location_id = 3;
        let board = appointment(5, "13:00", "14:00", 1);

        assert_eq!(
            most_used_locations(&[hall, hall_again, dropped, annex, board]),
            vec![(7, 2), (1, 1), (3, 1)]
        );
        assert!(most_used_locations(&[]).is_empty());
    }

    #[test]
    fn average_occupancy_against_room_capacity() {
        let room = room(10);
        let mut cancelled = appointment(3, "11:00", "12:00", 10);
        cancelled.status = Status::Cancelled;
        let mut unknown_room = appointment(4, "12:00", "13:00", 10);
        unknown_room.location_id = 99;
        let records = [
            appointment(1, "09:00", "10:00", 2),
            appointment(2, "10:00", "11:00", 6),
            cancelled,
            unknown_room,
        ];

        let occupancy = average_occupancy(&records, &[room]).expect("occupancy");
        assert!((occupancy - 0.4).abs() < 1e-9);
    }

    #[test]
    fn average_occupancy_needs_a_capacity() {
        let records = [appointment(1, "09:00", "10:00", 2)];
        assert_eq!(average_occupancy(&records, &[]), None);
        assert_eq!(average_occupancy(&records, &[room(0)]), None);
    }
}
