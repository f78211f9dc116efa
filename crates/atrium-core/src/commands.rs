use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument};

use crate::appointment::{Appointment, CalendarEvent, Location};
use crate::availability::slot_availability;
use crate::cli::Command;
use crate::clock::{ClockTime, parse_date_expr};
use crate::config::{Config, ScheduleSettings};
use crate::conflict::{Candidate, validate_at};
use crate::datastore::DataStore;
use crate::filter::AppointmentFilter;
use crate::grid::{CalendarView, build_grid};
use crate::placement::{events_on_day, occupies_slot, place_event};
use crate::render::{Renderer, SlotRow, StatsReport};
use crate::slots::{DEFAULT_STEP_MINUTES, calendar_slots, generate_slots};
use crate::stats::{aggregate, average_occupancy, daily_load, most_used_locations, peak_hours};

#[instrument(skip(data_dir, cfg, renderer, command))]
pub fn dispatch(
    data_dir: &Path,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    debug!(?command, %today, data_dir = %data_dir.display(), "dispatching command");

    if let Command::Show = command {
        return cmd_show(cfg);
    }

    let store = DataStore::open(data_dir)
        .with_context(|| format!("failed to open datastore at {}", data_dir.display()))?;
    let store = &store;

    match command {
        Command::Grid {
            view,
            date,
            location,
        } => cmd_grid(store, renderer, &view, &date, location, today),
        Command::Slots {
            date,
            location,
            step,
        } => cmd_slots(store, cfg, renderer, &date, location, step, today),
        Command::Check {
            location,
            date,
            start,
            end,
            participants,
        } => {
            let request = CheckRequest {
                location,
                date: &date,
                start: &start,
                end: &end,
                participants,
            };
            cmd_check(store, renderer, &request, today)
        }
        Command::List { terms } => cmd_list(store, renderer, &terms, today),
        Command::Stats { terms } => cmd_stats(store, renderer, &terms, today),
        Command::Show => cmd_show(cfg),
    }
}

#[instrument(skip(store, renderer, today))]
fn cmd_grid(
    store: &DataStore,
    renderer: &mut Renderer,
    view: &str,
    date: &str,
    location: Option<u64>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command grid");
    let view: CalendarView = view.parse()?;
    let reference = parse_date_expr(date, today)?;

    let mut appointments = store.load_appointments()?;
    if let Some(id) = location {
        appointments.retain(|appt| appt.location_id == id);
    }

    let days = build_grid(reference, view);
    let load = daily_load(&appointments, &days);
    renderer.print_grid(reference, &load)
}

#[instrument(skip(store, cfg, renderer, today))]
fn cmd_slots(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    date: &str,
    location: Option<u64>,
    step: Option<u32>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command slots");
    let schedule = cfg.schedule()?;
    let step = step.unwrap_or(schedule.step_minutes);
    let day = parse_date_expr(date, today)?;

    let mut appointments = store.load_appointments()?;
    appointments.retain(|appt| appt.date == day && !appt.is_cancelled());

    let location = location.map(|id| store.find_location(id)).transpose()?;
    if let Some(loc) = &location {
        appointments.retain(|appt| appt.location_id == loc.id);
    }

    let (slots, availability) = match &location {
        Some(loc) => {
            let availability = slot_availability(day, loc, &appointments, step);
            if availability.blocked {
                return renderer.print_blocked_day(&availability);
            }
            let slots = availability
                .slots
                .iter()
                .map(|entry| entry.slot.clone())
                .collect::<Vec<_>>();
            (slots, Some(availability))
        }
        None if schedule == ScheduleSettings::default() && step == DEFAULT_STEP_MINUTES => {
            (calendar_slots(), None)
        }
        None => (generate_slots(schedule.opening, schedule.closing, step), None),
    };

    let events: Vec<CalendarEvent<'_>> =
        appointments.iter().map(CalendarEvent::from_appointment).collect();
    let events = events_on_day(&events, day);

    let rows: Vec<SlotRow<'_>> = slots
        .iter()
        .enumerate()
        .map(|(idx, slot)| SlotRow {
            slot,
            starts: events
                .iter()
                .filter_map(|event| {
                    place_event(event, &slots, step)
                        .filter(|placement| placement.start_slot_index == idx)
                        .map(|placement| (event.appointment, placement))
                })
                .collect(),
            occupied: events.iter().filter(|event| occupies_slot(event, slot)).count(),
            free: availability
                .as_ref()
                .and_then(|avail| avail.slots.get(idx))
                .map(|entry| entry.is_available()),
        })
        .collect();

    renderer.print_slots(&rows)
}

struct CheckRequest<'a> {
    location: u64,
    date: &'a str,
    start: &'a str,
    end: &'a str,
    participants: u32,
}

#[instrument(skip(store, renderer, request, today), fields(location = request.location))]
fn cmd_check(
    store: &DataStore,
    renderer: &mut Renderer,
    request: &CheckRequest<'_>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command check");
    let candidate = build_candidate(request, today)?;
    let location: Location = store.find_location(request.location)?;
    let existing: Vec<Appointment> = store.load_appointments()?;

    let booking = validate_at(&candidate, &existing, &location);
    renderer.print_booking(&booking)?;

    if booking.is_clear() {
        Ok(())
    } else {
        Err(anyhow!("booking rejected for location {}", location.id))
    }
}

fn build_candidate(request: &CheckRequest<'_>, today: NaiveDate) -> anyhow::Result<Candidate> {
    let start: ClockTime = request
        .start
        .parse()
        .with_context(|| format!("invalid --start: {}", request.start))?;
    let end: ClockTime = request
        .end
        .parse()
        .with_context(|| format!("invalid --end: {}", request.end))?;
    if end <= start {
        return Err(anyhow!("--end {end} must be after --start {start}"));
    }
    if request.participants == 0 {
        return Err(anyhow!("--participants must be at least 1"));
    }

    Ok(Candidate {
        location_id: request.location,
        date: parse_date_expr(request.date, today)?,
        start_time: start,
        end_time: end,
        participants: request.participants,
        replaces: None,
    })
}

fn load_filtered(
    store: &DataStore,
    terms: &[String],
    today: NaiveDate,
) -> anyhow::Result<Vec<Appointment>> {
    let filter = AppointmentFilter::parse(terms, today)?;
    let mut rows = filter.apply(&store.load_appointments()?);
    rows.sort_by_key(|appt| (appt.date, appt.start_time, appt.id));
    debug!(count = rows.len(), "filtered appointments");
    Ok(rows)
}

#[instrument(skip(store, renderer, terms, today))]
fn cmd_list(
    store: &DataStore,
    renderer: &mut Renderer,
    terms: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");
    let rows = load_filtered(store, terms, today)?;
    renderer.print_appointment_table(&rows)
}

#[instrument(skip(store, renderer, terms, today))]
fn cmd_stats(
    store: &DataStore,
    renderer: &mut Renderer,
    terms: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command stats");
    let rows = load_filtered(store, terms, today)?;
    let locations = store.load_locations()?;
    let report = StatsReport {
        stats: aggregate(&rows),
        peaks: peak_hours(&rows),
        locations: most_used_locations(&rows),
        occupancy: average_occupancy(&rows, &locations),
    };
    renderer.print_stats(&report)
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        println!("{key}={value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{CheckRequest, build_candidate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date")
    }

    fn request<'a>(start: &'a str, end: &'a str, participants: u32) -> CheckRequest<'a> {
        CheckRequest {
            location: 1,
            date: "tomorrow",
            start,
            end,
            participants,
        }
    }

    #[test]
    fn builds_candidate_from_flags() {
        let candidate = build_candidate(&request("9:00", "10:30", 3), today()).expect("candidate");
        assert_eq!(candidate.date, NaiveDate::from_ymd_opt(2026, 3, 11).expect("valid"));
        assert_eq!(candidate.start_time.to_string(), "09:00");
        assert_eq!(candidate.end_time.to_string(), "10:30");
        assert_eq!(candidate.participants, 3);
    }

    #[test]
    fn rejects_inverted_and_empty_requests() {
        assert!(build_candidate(&request("10:00", "09:00", 1), today()).is_err());
        assert!(build_candidate(&request("10:00", "10:00", 1), today()).is_err());
        assert!(build_candidate(&request("09:00", "10:00", 0), today()).is_err());
        assert!(build_candidate(&request("nine", "10:00", 1), today()).is_err());
    }
}
