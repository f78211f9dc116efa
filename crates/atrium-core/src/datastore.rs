use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::appointment::{Appointment, Location};

// Read-only; every load is a fresh snapshot of the files.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub appointments_path: PathBuf,
    pub locations_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct LocationCatalog {
    #[serde(default)]
    location: Vec<Location>,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        if !data_dir.is_dir() {
            return Err(anyhow!("data directory does not exist: {}", data_dir.display()));
        }

        let appointments_path = data_dir.join("appointments.data");
        let locations_path = data_dir.join("locations.toml");

        info!(
            data_dir = %data_dir.display(),
            appointments = %appointments_path.display(),
            locations = %locations_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            appointments_path,
            locations_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_appointments(&self) -> anyhow::Result<Vec<Appointment>> {
        if !self.appointments_path.exists() {
            warn!(file = %self.appointments_path.display(), "no appointments file; empty snapshot");
            return Ok(Vec::new());
        }
        load_jsonl(&self.appointments_path).context("failed to load appointments.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_locations(&self) -> anyhow::Result<Vec<Location>> {
        if !self.locations_path.exists() {
            warn!(file = %self.locations_path.display(), "no locations file; empty catalog");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.locations_path)
            .with_context(|| format!("failed reading {}", self.locations_path.display()))?;
        let catalog: LocationCatalog = toml::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.locations_path.display()))?;
        debug!(count = catalog.location.len(), "loaded locations");
        Ok(catalog.location)
    }

    pub fn find_location(&self, id: u64) -> anyhow::Result<Location> {
        self.load_locations()?
            .into_iter()
            .find(|location| location.id == id)
            .ok_or_else(|| anyhow!("unknown location id: {id}"))
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Appointment>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let appointment: Appointment = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        appointment
            .check()
            .with_context(|| format!("rejected {} line {}", path.display(), idx + 1))?;
        out.push(appointment);
    }

    debug!(count = out.len(), "loaded appointments from jsonl");
    Ok(out)
}
