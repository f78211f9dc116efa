use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::appointment::{Appointment, Status};
use crate::availability::DayAvailability;
use crate::config::Config;
use crate::conflict::{Booking, ConflictResult, HoursViolation, Remedy};
use crate::grid::is_in_month;
use crate::placement::Placement;
use crate::slots::TimeSlot;
use crate::stats::EventStats;

#[derive(Debug, Clone)]
pub struct SlotRow<'a> {
    pub slot: &'a TimeSlot,
    pub starts: Vec<(&'a Appointment, Placement)>,
    pub occupied: usize,
    pub free: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct StatsReport {
    pub stats: EventStats,
    pub peaks: Vec<(u32, usize)>,
    pub locations: Vec<(u64, usize)>,
    pub occupancy: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, load))]
    pub fn print_grid(
        &mut self,
        reference: NaiveDate,
        load: &[(NaiveDate, usize)],
    ) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        let headers = ["Date", "Weekday", "Month", "Load"]
            .map(str::to_string)
            .to_vec();

        let rows = load
            .iter()
            .map(|(date, count)| {
                let label = date.format("%Y-%m-%d").to_string();
                let label = if *date == reference {
                    self.paint(&label, "1")
                } else {
                    label
                };
                let month = if is_in_month(*date, reference) {
                    String::new()
                } else {
                    self.paint("other", "90")
                };
                vec![
                    label,
                    date.format("%u").to_string(),
                    month,
                    count.to_string(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_slots(&mut self, rows: &[SlotRow<'_>]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        let headers = ["Time", "Busy", "Free", "Starts"]
            .map(str::to_string)
            .to_vec();

        let rows = rows
            .iter()
            .map(|row| {
                let starts = row
                    .starts
                    .iter()
                    .map(|(appt, placement)| {
                        format!("#{} {} ({} slots)", appt.id, appt.title, placement.slot_span)
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                let free = match row.free {
                    Some(true) => self.paint("yes", "32"),
                    Some(false) => self.paint("no", "31"),
                    None => "-".to_string(),
                };
                vec![row.slot.label.clone(), row.occupied.to_string(), free, starts]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, availability))]
    pub fn print_blocked_day(&mut self, availability: &DayAvailability) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "location {} is closed on {}",
            availability.location_id,
            availability.date.format("%Y-%m-%d")
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, booking))]
    pub fn print_booking(&mut self, booking: &Booking) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_booking(&mut out, booking)?;
        if booking.is_clear() {
            writeln!(out, "{}", self.paint("booking is free of conflicts", "32"))?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, appointments))]
    pub fn print_appointment_table(&mut self, appointments: &[Appointment]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        let headers = ["ID", "Date", "Time", "Loc", "Status", "Type", "Pax", "Title"]
            .map(str::to_string)
            .to_vec();

        let rows = appointments
            .iter()
            .map(|appt| {
                let status = match appt.status {
                    Status::Cancelled => self.paint(appt.status.as_str(), "31"),
                    Status::Pending => self.paint(appt.status.as_str(), "33"),
                    _ => appt.status.to_string(),
                };
                vec![
                    self.paint(&appt.id.to_string(), "33"),
                    appt.date.format("%Y-%m-%d").to_string(),
                    format!("{}-{}", appt.start_time, appt.end_time),
                    appt.location_id.to_string(),
                    status,
                    appt.kind.to_string(),
                    appt.participants.to_string(),
                    appt.title.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, report))]
    pub fn print_stats(&mut self, report: &StatsReport) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_stats(&mut out, report)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn remedy_text(remedy: Remedy) -> &'static str {
    match remedy {
        Remedy::DifferentTime => "select a different time",
        Remedy::DifferentLocation => "choose a different location",
        Remedy::AdjustDuration => "modify the appointment duration",
        Remedy::FewerParticipants => "reduce the number of participants",
        Remedy::LargerLocation => "select a location with greater capacity",
        Remedy::SplitSession => "split the appointment into multiple sessions",
    }
}

fn write_booking<W: Write>(mut writer: W, booking: &Booking) -> anyhow::Result<()> {
    match booking {
        Booking::Rejected {
            violation: HoursViolation::Closed,
        } => writeln!(writer, "location is closed on that day")?,
        Booking::Rejected {
            violation: HoursViolation::OutsideHours { opening, closing },
        } => writeln!(writer, "outside opening hours {opening}-{closing}")?,
        Booking::Checked { result } => write_conflict(&mut writer, result)?,
    }
    Ok(())
}

fn write_conflict<W: Write>(mut writer: W, result: &ConflictResult) -> anyhow::Result<()> {
    match result {
        ConflictResult::Clear => return Ok(()),
        ConflictResult::Overlap { conflicting } => {
            writeln!(
                writer,
                "schedule conflict with {} existing appointment(s):",
                conflicting.len()
            )?;
            for appt in conflicting {
                writeln!(
                    writer,
                    "  #{} {} {}-{}",
                    appt.id, appt.title, appt.start_time, appt.end_time
                )?;
            }
        }
        ConflictResult::Capacity {
            requested,
            available,
        } => {
            writeln!(
                writer,
                "capacity exceeded: requested {requested}, location holds {available}"
            )?;
        }
    }

    for remedy in result.remedies() {
        writeln!(writer, "  - {}", remedy_text(*remedy))?;
    }
    Ok(())
}

fn write_stats<W: Write>(mut writer: W, report: &StatsReport) -> anyhow::Result<()> {
    let stats = &report.stats;
    writeln!(writer, "total     {}", stats.total)?;
    for (status, count) in &stats.by_status {
        writeln!(writer, "status    {:<12} {count}", status.as_str())?;
    }
    for (kind, count) in &stats.by_type {
        writeln!(writer, "type      {:<12} {count}", kind.as_str())?;
    }
    for (hour, count) in &report.peaks {
        writeln!(writer, "peak      {hour:02}:00        {count}")?;
    }
    for (location_id, count) in &report.locations {
        writeln!(writer, "location  {location_id:<12} {count}")?;
    }
    match report.occupancy {
        Some(ratio) => writeln!(writer, "occupancy {:.1}%", ratio * 100.0)?,
        None => writeln!(writer, "occupancy -")?,
    }
    Ok(())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
