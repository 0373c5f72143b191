use crate::types::{Acquisition, LstError, LstResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque spatial boundary.
///
/// The processing core only hands the region through to the archive for
/// filtering and clipping; it never introspects the geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    id: String,
}

impl Region {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Inclusive acquisition date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering one full calendar year
    pub fn calendar_year(year: i32) -> Self {
        // Jan 1 and Dec 31 exist in every calendar year
        let start = NaiveDate::from_ymd_opt(year, 1, 1).expect("January 1st is always valid");
        let end = NaiveDate::from_ymd_opt(year, 12, 31).expect("December 31st is always valid");
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Query handed to the archive collaborator
#[derive(Debug, Clone)]
pub struct ArchiveQuery {
    /// Archive collection identifier (e.g. "LANDSAT/LT05/C02/T1_L2")
    pub collection_id: String,
    pub dates: DateRange,
    pub region: Region,
    /// Maximum acceptable scene cloud cover percentage
    pub max_cloud_cover: f32,
}

/// The satellite image archive, source of acquisitions and their calibration
/// metadata.
///
/// Implementations return acquisitions ordered by date, clipped to the query
/// region, filtered to the date range and cloud-cover threshold.
pub trait ImageArchive {
    fn query(&self, query: &ArchiveQuery) -> LstResult<Vec<Acquisition>>;
}

/// Query the archive, retrying transient fetch failures with a doubling
/// backoff.
///
/// Only `Fetch` errors are retried; anything else is a caller bug and
/// surfaces immediately. After `attempts` failures the last fetch error is
/// returned and the caller degrades the year to an empty collection.
pub fn fetch_with_retry<A: ImageArchive>(
    archive: &A,
    query: &ArchiveQuery,
    attempts: u32,
    initial_backoff: Duration,
) -> LstResult<Vec<Acquisition>> {
    let mut backoff = initial_backoff;
    let mut attempt = 1;
    loop {
        match archive.query(query) {
            Ok(acquisitions) => {
                log::debug!(
                    "fetched {} acquisitions from '{}' for {}..{}",
                    acquisitions.len(),
                    query.collection_id,
                    query.dates.start,
                    query.dates.end
                );
                return Ok(acquisitions);
            }
            Err(LstError::Fetch(reason)) if attempt < attempts => {
                log::warn!(
                    "archive fetch attempt {}/{} failed ({}); retrying in {:?}",
                    attempt,
                    attempts,
                    reason,
                    backoff
                );
                std::thread::sleep(backoff);
                backoff *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
