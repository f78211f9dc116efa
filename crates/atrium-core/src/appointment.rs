use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::clock::{ClockTime, iso_weekday};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Pending,
        Status::Confirmed,
        Status::InProgress,
        Status::Completed,
        Status::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Confirmed => "confirmed",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == lower)
            .ok_or_else(|| anyhow!("unknown appointment status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    Meeting,
    Consultation,
    Maintenance,
    Event,
    Reservation,
    Training,
    Demo,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 7] = [
        AppointmentType::Meeting,
        AppointmentType::Consultation,
        AppointmentType::Maintenance,
        AppointmentType::Event,
        AppointmentType::Reservation,
        AppointmentType::Training,
        AppointmentType::Demo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentType::Meeting => "meeting",
            AppointmentType::Consultation => "consultation",
            AppointmentType::Maintenance => "maintenance",
            AppointmentType::Event => "event",
            AppointmentType::Reservation => "reservation",
            AppointmentType::Training => "training",
            AppointmentType::Demo => "demo",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        AppointmentType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| anyhow!("unknown appointment type: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: u64,

    pub code: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub location_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    pub date: NaiveDate,

    pub start_time: ClockTime,

    pub end_time: ClockTime,

    pub status: Status,

    #[serde(rename = "type")]
    pub kind: AppointmentType,

    pub participants: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> u32 {
        self.start_time.minutes_until(self.end_time)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == Status::Cancelled
    }

    // Empty or inverted ranges and empty parties never reach the engine.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.end_time <= self.start_time {
            bail!(
                "appointment {} ends at {} which is not after its start {}",
                self.id,
                self.end_time,
                self.start_time
            );
        }
        if self.participants == 0 {
            bail!("appointment {} has no participants", self.id);
        }
        Ok(())
    }
}

// Bit 0 is Monday, bit 6 Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingDays(u8);

impl WorkingDays {
    pub const MONDAY_TO_FRIDAY: Self = Self(0b001_1111);
    pub const EVERY_DAY: Self = Self(0b111_1111);

    pub fn from_iso_days(days: &[u32]) -> Self {
        let bits = days
            .iter()
            .filter(|day| (1..=7).contains(*day))
            .fold(0u8, |acc, day| acc | (1u8 << (day - 1)));
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        (self.0 & (1u8 << (iso_weekday(date) - 1))) != 0
    }
}

impl Default for WorkingDays {
    fn default() -> Self {
        Self::MONDAY_TO_FRIDAY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub code: String,

    pub capacity: u32,

    pub opening: ClockTime,

    pub closing: ClockTime,

    #[serde(default)]
    pub working_days: WorkingDays,
}

#[derive(Debug, Clone, Copy)]
pub struct CalendarEvent<'a> {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub appointment: &'a Appointment,
}

impl<'a> CalendarEvent<'a> {
    pub fn from_appointment(appointment: &'a Appointment) -> Self {
        Self {
            start: appointment
                .date
                .and_time(appointment.start_time.to_naive_time()),
            end: appointment.date.and_time(appointment.end_time.to_naive_time()),
            appointment,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_time(&self) -> ClockTime {
        self.appointment.start_time
    }

    pub fn end_time(&self) -> ClockTime {
        self.appointment.end_time
    }

    pub fn duration_minutes(&self) -> u32 {
        u32::try_from((self.end - self.start).num_minutes()).unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::{Appointment, AppointmentType, Location, Status, WorkingDays};
    use crate::clock::ClockTime;

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub fn at(s: &str) -> ClockTime {
        s.parse().expect("valid clock time")
    }

    pub fn appointment(id: u64, start: &str, end: &str, participants: u32) -> Appointment {
        Appointment {
            id,
            code: format!("APT-{id:03}"),
            title: format!("Appointment {id}"),
            description: None,
            location_id: 1,
            client_name: None,
            date: day(2026, 3, 10),
            start_time: at(start),
            end_time: at(end),
            status: Status::Confirmed,
            kind: AppointmentType::Meeting,
            participants,
            notes: None,
        }
    }

    pub fn room(capacity: u32) -> Location {
        Location {
            id: 1,
            name: "Board Room".to_string(),
            code: "BR1".to_string(),
            capacity,
            opening: at("09:00"),
            closing: at("18:00"),
            working_days: WorkingDays::MONDAY_TO_FRIDAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{appointment, at, day};
    use super::{AppointmentType, CalendarEvent, Status, WorkingDays};

    #[test]
    fn status_and_type_round_trip_their_wire_names() {
        assert_eq!("in_progress".parse::<Status>().expect("status"), Status::InProgress);
        assert_eq!(
            serde_json::to_string(&Status::InProgress).expect("serialize"),
            "\"in_progress\""
        );
        assert_eq!(
            "Training".parse::<AppointmentType>().expect("type"),
            AppointmentType::Training
        );
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn parses_appointment_json_line() {
        let line = r#"{"id":7,"code":"APT-007","title":"Quarterly review","location_id":2,
            "date":"2026-03-10","start_time":"09:15","end_time":"10:00",
            "status":"pending","type":"consultation","participants":4}"#;
        let parsed: super::Appointment = serde_json::from_str(line).expect("parse");
        assert_eq!(parsed.start_time, at("09:15"));
        assert_eq!(parsed.kind, AppointmentType::Consultation);
        assert_eq!(parsed.duration_minutes(), 45);
        parsed.check().expect("valid record");
    }

    #[test]
    fn check_rejects_inverted_and_empty_records() {
        assert!(appointment(1, "10:00", "10:00", 1).check().is_err());
        assert!(appointment(2, "11:00", "10:00", 1).check().is_err());
        assert!(appointment(3, "09:00", "10:00", 0).check().is_err());
    }

    #[test]
    fn calendar_event_combines_date_and_times() {
        let appt = appointment(1, "09:15", "10:00", 2);
        let event = CalendarEvent::from_appointment(&appt);
        assert_eq!(event.date(), day(2026, 3, 10));
        assert_eq!(event.start.format("%H:%M").to_string(), "09:15");
        assert_eq!(event.duration_minutes(), 45);
    }

    #[test]
    fn working_days_use_iso_numbering() {
        let weekend = WorkingDays::from_iso_days(&[6, 7]);
        assert!(weekend.contains(day(2026, 3, 8)));
        assert!(!weekend.contains(day(2026, 3, 9)));
        assert!(WorkingDays::default().contains(day(2026, 3, 13)));
        assert!(!WorkingDays::default().contains(day(2026, 3, 14)));
        assert_eq!(WorkingDays::from_iso_days(&[0, 8]).bits(), 0);
    }
}
