// Copyright 2026 Marmalade Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Grandfather-father-son retention calculation.
//!
//! Pure and deterministic: given the filenames currently in the bucket and
//! a schedule, decide which files survive in each tier. No I/O.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::schedule::RetentionSchedule;

/// The files retained by each tier, in the order the tier slots were won.
///
/// The lists are disjoint: a file claimed by the daily tier is not listed
/// again under monthly or yearly even when it is also the representative
/// of those buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedFiles {
    pub yearly: Vec<String>,
    pub monthly: Vec<String>,
    pub daily: Vec<String>,
}

impl RetainedFiles {
    /// Every retained file across all tiers, de-duplicated and sorted
    /// descending. The date prefix sorts lexicographically, so descending
    /// by name is descending by date.
    pub fn all(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .yearly
            .iter()
            .chain(&self.monthly)
            .chain(&self.daily)
            .cloned()
            .collect();
        all.sort_unstable();
        all.dedup();
        all.reverse();
        all
    }
}

/// Computes which of `files` survive under `schedule`.
///
/// Files are walked newest-first (oldest-first when the schedule is
/// inverted) and grouped into day, month and year buckets keyed on their
/// `YYYY-MM-DD` name prefix. The first file seen for a bucket becomes its
/// representative; the newest N buckets per tier are kept. Names that do
/// not start with a valid date are discarded and will therefore never be
/// retained.
pub fn calculate_retention(files: &[String], schedule: &RetentionSchedule) -> RetainedFiles {
    let mut sorted: Vec<&str> = files.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    if !schedule.inverted {
        sorted.reverse();
    }

    let mut daily_buckets: Vec<String> = Vec::new();
    let mut monthly_buckets: Vec<String> = Vec::new();
    let mut yearly_buckets: Vec<String> = Vec::new();
    let mut representatives: HashMap<String, &str> = HashMap::new();

    for &file in &sorted {
        let date_part = file.split('.').next().unwrap_or(file);
        let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            continue;
        };
        // Require the canonical zero-padded form; chrono would otherwise
        // accept dates like 2025-3-5.
        let day_key = date.format("%Y-%m-%d").to_string();
        if day_key != date_part {
            continue;
        }

        if !daily_buckets.contains(&day_key) {
            representatives.insert(day_key.clone(), file);
            daily_buckets.push(day_key);
        }

        let month_key = date.format("%Y-%m").to_string();
        if !monthly_buckets.contains(&month_key) {
            representatives.insert(month_key.clone(), file);
            monthly_buckets.push(month_key);
        }

        let year_key = date.format("%Y").to_string();
        if !yearly_buckets.contains(&year_key) {
            representatives.insert(year_key.clone(), file);
            yearly_buckets.push(year_key);
        }
    }

    // Newest buckets first, so retaining is taking the top N.
    daily_buckets.sort_unstable();
    daily_buckets.reverse();
    monthly_buckets.sort_unstable();
    monthly_buckets.reverse();
    yearly_buckets.sort_unstable();
    yearly_buckets.reverse();

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut retained = RetainedFiles::default();

    for bucket in daily_buckets.iter().take(schedule.daily as usize) {
        let file = representatives[bucket];
        if claimed.insert(file) {
            retained.daily.push(file.to_string());
        }
    }
    for bucket in monthly_buckets.iter().take(schedule.monthly as usize) {
        let file = representatives[bucket];
        if claimed.insert(file) {
            retained.monthly.push(file.to_string());
        }
    }
    for bucket in yearly_buckets.iter().take(schedule.yearly as usize) {
        let file = representatives[bucket];
        if claimed.insert(file) {
            retained.yearly.push(file.to_string());
        }
    }

    retained
}
