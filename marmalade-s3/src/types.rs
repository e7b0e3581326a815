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

//! Wire-level types for the supported S3 operations.

use chrono::{DateTime, Utc};
use std::fmt;

/// One object version from a `ListObjectVersions` response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// One delete marker from a `ListObjectVersions` response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteMarkerInfo {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// Parsed `ListObjectVersions` response.
#[derive(Debug, Clone, Default)]
pub struct ListObjectVersionsResult {
    pub versions: Vec<VersionInfo>,
    pub delete_markers: Vec<DeleteMarkerInfo>,
    pub is_truncated: bool,
    pub next_key_marker: Option<String>,
    pub next_version_id_marker: Option<String>,
}

/// Identifies a version to delete. Without a version id the server
/// inserts a delete marker instead of removing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    pub key: String,
    pub version_id: Option<String>,
}

/// A successfully deleted entry from a `DeleteObjects` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedObject {
    pub key: String,
    pub version_id: Option<String>,
}

/// A per-object failure from a `DeleteObjects` response. These do not fail
/// the request; locked objects are the expected cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteError {
    pub key: String,
    pub version_id: Option<String>,
    pub code: String,
    pub message: String,
}

/// Parsed `DeleteObjects` response.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectsResult {
    pub deleted: Vec<DeletedObject>,
    pub errors: Vec<DeleteError>,
}

/// Object Lock retention mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionMode {
    /// Retention can be lifted with special permission.
    Governance,
    /// Retention cannot be shortened or removed by anyone until expiry.
    Compliance,
}

impl RetentionMode {
    /// Returns the S3 API string representation of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::Governance => "GOVERNANCE",
            RetentionMode::Compliance => "COMPLIANCE",
        }
    }

    /// Parses a retention mode from its S3 API string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "GOVERNANCE" => Some(RetentionMode::Governance),
            "COMPLIANCE" => Some(RetentionMode::Compliance),
            _ => None,
        }
    }
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A retention period to attach to an upload or apply to an existing
/// version. Servers accept extensions of an existing period but reject
/// attempts to shorten one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLockRetention {
    pub mode: RetentionMode,
    pub until: DateTime<Utc>,
}
