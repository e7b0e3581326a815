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

//! Retention scheduling and backup orchestration.
//!
//! The entry point is [`backup`]: given a configured S3 client, a parsed
//! [`RetentionSchedule`], the backup instant and a local file path, it
//! uploads the file (with its SHA-256 sidecar), extends Object Lock
//! retention on surviving backups and prunes everything that fell out of
//! the schedule.

pub mod backup;
pub mod error;
pub mod retention;
pub mod schedule;

pub use backup::{backup, SIDECAR_SUFFIX};
pub use error::BackupError;
pub use retention::{calculate_retention, RetainedFiles};
pub use schedule::{parse_schedule, LockSchedule, LockType, RetentionSchedule, ScheduleError};
