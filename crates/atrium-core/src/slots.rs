use serde::Serialize;
use tracing::trace;

use crate::clock::{ClockTime, MINUTES_PER_DAY};

pub const DEFAULT_OPENING: ClockTime = match ClockTime::from_hm(7, 0) {
    Some(t) => t,
    None => ClockTime::MIDNIGHT,
};
pub const DEFAULT_CLOSING: ClockTime = match ClockTime::from_hm(22, 0) {
    Some(t) => t,
    None => ClockTime::MIDNIGHT,
};
pub const DEFAULT_STEP_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub label: String,
    pub minute_offset: u32,
}

impl TimeSlot {
    fn at(minute_offset: u32) -> Self {
        Self {
            label: format!("{:02}:{:02}", minute_offset / 60, minute_offset % 60),
            minute_offset,
        }
    }
}

// Half-open [opening, closing); empty for a zero step or inverted range.
pub fn generate_slots(opening: ClockTime, closing: ClockTime, step_minutes: u32) -> Vec<TimeSlot> {
    if step_minutes == 0 || closing <= opening {
        trace!(%opening, %closing, step_minutes, "degenerate slot range");
        return Vec::new();
    }

    (opening.minutes()..closing.minutes())
        .step_by(step_minutes as usize)
        .map(TimeSlot::at)
        .collect()
}

// Calendar view axis, 22:00 tick included.
pub fn calendar_slots() -> Vec<TimeSlot> {
    let end = (DEFAULT_CLOSING.minutes() + DEFAULT_STEP_MINUTES).min(MINUTES_PER_DAY);
    (DEFAULT_OPENING.minutes()..end)
        .step_by(DEFAULT_STEP_MINUTES as usize)
        .map(TimeSlot::at)
        .collect()
}
