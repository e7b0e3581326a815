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

//! The backup run: upload, lock extension, pruning.
//!
//! One run is a straight-line sequence of calls against the bucket. The
//! listing taken at the start is the sole view of remote state for the
//! run; every decision below derives from it. Orderings that matter:
//! the sidecar is uploaded before the main object, lock extension walks
//! tiers daily then monthly then yearly, and deletion happens last.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use marmalade_s3::{Client, ObjectIdentifier, ObjectLockRetention, RetentionMode};

use crate::error::BackupError;
use crate::retention::calculate_retention;
use crate::schedule::{LockSchedule, LockType, RetentionSchedule};

/// Suffix of the digest sidecar accompanying every backup object.
pub const SIDECAR_SUFFIX: &str = ".sha256";

/// Backs up `file_path` to the bucket and applies the retention schedule.
///
/// The file is named `YYYY-MM-DD.<tail>` from the UTC date of `at` and the
/// original file name with its first dot-segment removed. The upload is
/// skipped when an object of that name already exists or when the schedule
/// would not retain it; either way, locks on retained survivors are
/// extended and versions falling out of retention are deleted.
///
/// Objects still under COMPLIANCE retention fail deletion server-side;
/// those failures are logged and do not fail the run, since a later run
/// will retry them once the lock expires.
pub async fn backup(
    client: &Client,
    schedule: &RetentionSchedule,
    at: DateTime<Utc>,
    file_path: &Path,
) -> Result<(), BackupError> {
    let contents = Bytes::from(tokio::fs::read(file_path).await?);
    let digest = hex::encode(Sha256::digest(&contents));

    let backup_name = backup_name(file_path, at)?;

    let listing = client
        .list_object_versions("", "", "", 500)
        .await
        .map_err(BackupError::ListObjectVersions)?;
    if listing.is_truncated {
        return Err(BackupError::TruncatedListing);
    }

    // Current backups: latest versions only, sidecars folded into their stem.
    let backups: HashSet<&str> = listing
        .versions
        .iter()
        .filter(|v| v.is_latest && !v.key.ends_with(SIDECAR_SUFFIX))
        .map(|v| v.key.as_str())
        .collect();

    let present: Vec<String> = backups.iter().map(|k| k.to_string()).collect();
    let old_retained = calculate_retention(&present, schedule);

    let mut with_new = present.clone();
    with_new.push(backup_name.clone());
    let retained = calculate_retention(&with_new, schedule);

    if !backups.contains(backup_name.as_str()) && retained.all().contains(&backup_name) {
        info!("uploading {backup_name}");

        let retention = upload_retention(schedule, &retained, &backup_name, at);

        client
            .put_object(
                &format!("{backup_name}{SIDECAR_SUFFIX}"),
                Bytes::from(digest.into_bytes()),
                retention.as_ref(),
            )
            .await
            .map_err(BackupError::PutObjectHash)?;
        client
            .put_object(&backup_name, contents, retention.as_ref())
            .await
            .map_err(BackupError::PutObject)?;
    } else {
        info!("skipping upload, {backup_name} will not be retained");
    }

    let tiers: [(&str, &LockSchedule, &[String], &[String]); 3] = [
        ("daily", &schedule.daily_lock, &retained.daily, &old_retained.daily),
        ("monthly", &schedule.monthly_lock, &retained.monthly, &old_retained.monthly),
        ("yearly", &schedule.yearly_lock, &retained.yearly, &old_retained.yearly),
    ];
    for (period, lock, files, previously_retained) in tiers {
        if lock.lock_hours == 0 {
            continue;
        }
        let retention = compliance_until(at, lock.lock_hours);

        for file in files {
            if *file == backup_name {
                continue;
            }
            // Rolling locks are refreshed every run; simple locks only on
            // the run where the file first enters the tier.
            if lock.lock_type == LockType::Rolling || !previously_retained.contains(file) {
                info!(period, "extending lock for {file}");

                client
                    .put_object_retention(file, &retention)
                    .await
                    .map_err(|source| BackupError::SetRetention {
                        key: file.clone(),
                        source,
                    })?;
                let sidecar = format!("{file}{SIDECAR_SUFFIX}");
                client
                    .put_object_retention(&sidecar, &retention)
                    .await
                    .map_err(|source| BackupError::SetRetention {
                        key: sidecar.clone(),
                        source,
                    })?;
            }
        }
    }

    // Delete everything whose stem fell out of retention, delete markers
    // included. The original key (sidecar suffix and all) is submitted.
    let all_retained = retained.all();
    let mut to_delete: Vec<ObjectIdentifier> = Vec::new();

    let entries = listing
        .versions
        .iter()
        .map(|v| (&v.key, &v.version_id))
        .chain(listing.delete_markers.iter().map(|m| (&m.key, &m.version_id)));
    for (key, version_id) in entries {
        let stem = key.strip_suffix(SIDECAR_SUFFIX).unwrap_or(key);
        if !all_retained.iter().any(|r| r == stem) {
            info!("{key}::{version_id} not retained, deleting");
            to_delete.push(ObjectIdentifier {
                key: key.clone(),
                version_id: Some(version_id.clone()),
            });
        }
    }

    if !to_delete.is_empty() {
        let result = client
            .delete_objects(&to_delete)
            .await
            .map_err(BackupError::DeleteObjects)?;
        for error in &result.errors {
            warn!(
                key = %error.key,
                version = %error.version_id.as_deref().unwrap_or(""),
                message = %error.message,
                "could not delete file"
            );
        }
    }

    Ok(())
}

/// Derives the remote object name from the input path and backup instant.
///
/// The first dot-segment of the file name is replaced by the UTC date, so
/// `archive.tar.age` backed up on 2025-03-05 becomes `2025-03-05.tar.age`.
/// A name without a dot keeps a trailing dot.
fn backup_name(file_path: &Path, at: DateTime<Utc>) -> Result<String, BackupError> {
    let base = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BackupError::InvalidFilePath(file_path.display().to_string()))?;

    let tail: Vec<&str> = base.split('.').skip(1).collect();
    Ok(format!("{}.{}", at.format("%Y-%m-%d"), tail.join(".")))
}

/// Picks the lock for a fresh upload from the tiers that retain it, daily
/// taking precedence over monthly over yearly. Returns None when the
/// winning tier does not lock.
fn upload_retention(
    schedule: &RetentionSchedule,
    retained: &crate::retention::RetainedFiles,
    backup_name: &str,
    at: DateTime<Utc>,
) -> Option<ObjectLockRetention> {
    let contains = |files: &[String]| files.iter().any(|f| f == backup_name);
    let lock_hours = if contains(&retained.daily) {
        schedule.daily_lock.lock_hours
    } else if contains(&retained.monthly) {
        schedule.monthly_lock.lock_hours
    } else if contains(&retained.yearly) {
        schedule.yearly_lock.lock_hours
    } else {
        0
    };

    (lock_hours > 0).then(|| compliance_until(at, lock_hours))
}

fn compliance_until(at: DateTime<Utc>, lock_hours: u32) -> ObjectLockRetention {
    ObjectLockRetention {
        mode: RetentionMode::Compliance,
        until: at + Duration::hours(i64::from(lock_hours)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_name_strips_first_segment() {
        let at = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap();
        let at = DateTime::from_naive_utc_and_offset(at, Utc);
        let prefix = at.format("%Y-%m-%d").to_string();

        let name = backup_name(Path::new("/tmp/archive.tar.age"), at).unwrap();
        assert_eq!(name, format!("{prefix}.tar.age"));

        // A dotless name keeps a trailing dot.
        let name = backup_name(Path::new("/tmp/archive"), at).unwrap();
        assert_eq!(name, format!("{prefix}."));
    }
}
