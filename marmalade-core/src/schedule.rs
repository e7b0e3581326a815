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

//! Retention schedule parsing.
//!
//! A schedule is a compact string such as `"7d 12m/2160h 7y/8760h%"`:
//! up to one period per unit (`d`aily, `m`onthly, `y`early), each with an
//! optional `/Nh` lock duration and an optional trailing `%` marking the
//! lock as rolling. A leading `"- "` inverts bucket tie-breaking so the
//! oldest file in a bucket wins instead of the newest.

use std::fmt;
use thiserror::Error;

/// How a tier's Object Lock is maintained across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockType {
    /// Retention is set at upload and extended only when a file newly
    /// enters the tier.
    #[default]
    Simple,
    /// Retention is extended on every run while the file stays in the tier.
    Rolling,
}

/// Per-tier lock settings. Zero hours disables locking for the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockSchedule {
    pub lock_type: LockType,
    pub lock_hours: u32,
}

/// A parsed retention schedule. Immutable once parsed.
///
/// Counts are the number of survivors kept per tier; a count of zero
/// disables the tier entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetentionSchedule {
    pub daily: u32,
    pub monthly: u32,
    pub yearly: u32,

    pub daily_lock: LockSchedule,
    pub monthly_lock: LockSchedule,
    pub yearly_lock: LockSchedule,

    /// When set, the oldest file in a bucket wins the slot instead of the
    /// newest.
    pub inverted: bool,
}

/// Schedule string parse failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule is empty")]
    Empty,

    #[error("unrecognized period: {0}")]
    UnrecognizedPeriod(String),

    #[error("unrecognized unit: {0}")]
    UnrecognizedUnit(char),

    #[error("period {period} duplicates unit {unit}")]
    DuplicateUnit { period: String, unit: char },
}

/// Parses a schedule string such as `"- 7d 12m/2160h 7y/8760h%"`.
///
/// Each period must re-serialize byte-identically, which rejects inputs
/// like `12m/h` or counts with leading zeros instead of silently accepting
/// them.
pub fn parse_schedule(input: &str) -> Result<RetentionSchedule, ScheduleError> {
    let mut remaining = input.trim();

    let mut schedule = RetentionSchedule::default();
    if let Some(rest) = remaining.strip_prefix("- ") {
        schedule.inverted = true;
        remaining = rest;
    }

    if remaining.is_empty() {
        return Err(ScheduleError::Empty);
    }

    let mut parsed_units: Vec<char> = Vec::new();
    for period in remaining.split(' ') {
        let (to_parse, lock_type) = match period.strip_suffix('%') {
            Some(stripped) => (stripped, LockType::Rolling),
            None => (period, LockType::Simple),
        };

        let (value, unit, hours) = parse_period(to_parse)
            .ok_or_else(|| ScheduleError::UnrecognizedPeriod(period.to_string()))?;

        if parsed_units.contains(&unit) {
            return Err(ScheduleError::DuplicateUnit {
                period: period.to_string(),
                unit,
            });
        }
        parsed_units.push(unit);

        let lock = LockSchedule {
            lock_type,
            lock_hours: hours,
        };
        match unit {
            'd' => {
                schedule.daily = value;
                schedule.daily_lock = lock;
            }
            'm' => {
                schedule.monthly = value;
                schedule.monthly_lock = lock;
            }
            'y' => {
                schedule.yearly = value;
                schedule.yearly_lock = lock;
            }
            other => return Err(ScheduleError::UnrecognizedUnit(other)),
        }
    }

    Ok(schedule)
}

/// Parses `"7d"` or `"12m/216h"` into (count, unit, lock hours).
///
/// Returns None unless the input matches one of the two forms exactly,
/// verified by re-serializing the parsed values.
fn parse_period(to_parse: &str) -> Option<(u32, char, u32)> {
    if let Some((head, tail)) = to_parse.split_once('/') {
        let hours: u32 = tail.strip_suffix('h')?.parse().ok()?;
        let (value, unit) = parse_count_and_unit(head)?;
        if format!("{value}{unit}/{hours}h") != to_parse {
            return None;
        }
        Some((value, unit, hours))
    } else {
        let (value, unit) = parse_count_and_unit(to_parse)?;
        if format!("{value}{unit}") != to_parse {
            return None;
        }
        Some((value, unit, 0))
    }
}

/// Splits `"7d"` into (7, 'd'). The unit is exactly one character.
fn parse_count_and_unit(s: &str) -> Option<(u32, char)> {
    let digits_end = s.find(|c: char| !c.is_ascii_digit())?;
    let value: u32 = s[..digits_end].parse().ok()?;
    let mut rest = s[digits_end..].chars();
    let unit = rest.next()?;
    if rest.next().is_some() {
        return None;
    }
    Some((value, unit))
}

impl fmt::Display for RetentionSchedule {
    /// Canonical form: enabled periods in `d`, `m`, `y` order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers = [
            (self.daily, self.daily_lock, 'd'),
            (self.monthly, self.monthly_lock, 'm'),
            (self.yearly, self.yearly_lock, 'y'),
        ];

        let mut parts: Vec<String> = Vec::new();
        for (count, lock, unit) in tiers {
            if count == 0 && lock.lock_hours == 0 {
                continue;
            }
            let mut part = format!("{count}{unit}");
            if lock.lock_hours > 0 {
                part.push_str(&format!("/{}h", lock.lock_hours));
            }
            if lock.lock_type == LockType::Rolling {
                part.push('%');
            }
            parts.push(part);
        }

        if self.inverted {
            write!(f, "- ")?;
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schedule() {
        struct Case {
            input: &'static str,
            expected: Result<RetentionSchedule, ScheduleError>,
        }

        let cases = [
            Case {
                input: "7d 12m 8y",
                expected: Ok(RetentionSchedule {
                    daily: 7,
                    monthly: 12,
                    yearly: 8,
                    ..Default::default()
                }),
            },
            Case {
                input: "12m",
                expected: Ok(RetentionSchedule {
                    monthly: 12,
                    ..Default::default()
                }),
            },
            Case {
                input: "- 12m",
                expected: Ok(RetentionSchedule {
                    monthly: 12,
                    inverted: true,
                    ..Default::default()
                }),
            },
            Case {
                input: "12m/216h%",
                expected: Ok(RetentionSchedule {
                    monthly: 12,
                    monthly_lock: LockSchedule {
                        lock_type: LockType::Rolling,
                        lock_hours: 216,
                    },
                    ..Default::default()
                }),
            },
            Case {
                input: "7x",
                expected: Err(ScheduleError::UnrecognizedUnit('x')),
            },
            Case {
                input: "7xy",
                expected: Err(ScheduleError::UnrecognizedPeriod("7xy".to_string())),
            },
            Case {
                input: "7d 0d",
                expected: Err(ScheduleError::DuplicateUnit {
                    period: "0d".to_string(),
                    unit: 'd',
                }),
            },
            Case {
                input: "",
                expected: Err(ScheduleError::Empty),
            },
        ];

        for case in cases {
            assert_eq!(
                parse_schedule(case.input),
                case.expected,
                "input: {:?}",
                case.input
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical_periods() {
        // The re-serialization guard refuses anything the canonical
        // formatter would not emit.
        assert_eq!(
            parse_schedule("12m/h"),
            Err(ScheduleError::UnrecognizedPeriod("12m/h".to_string()))
        );
        assert_eq!(
            parse_schedule("07d"),
            Err(ScheduleError::UnrecognizedPeriod("07d".to_string()))
        );
        assert_eq!(
            parse_schedule("7d/010h"),
            Err(ScheduleError::UnrecognizedPeriod("7d/010h".to_string()))
        );
        assert_eq!(
            parse_schedule("-5d"),
            Err(ScheduleError::UnrecognizedPeriod("-5d".to_string()))
        );
    }

    #[test]
    fn test_display_round_trips() {
        for input in ["7d", "7d 12m/2160h 7y/8760h%", "- 12m", "12m/216h%", "3d%"] {
            let schedule = parse_schedule(input).unwrap();
            assert_eq!(schedule.to_string(), input);
            assert_eq!(parse_schedule(&schedule.to_string()).unwrap(), schedule);
        }
    }
}
