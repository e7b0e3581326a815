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

//! Error types for the backup run.

use marmalade_s3::S3ClientError;
use thiserror::Error;

/// Errors that can end a backup run.
///
/// Each variant names the stage that failed. Per-object deletion failures
/// are not represented here; they are logged and the run continues.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The input file could not be read.
    #[error("read file: {0}")]
    ReadFile(#[from] std::io::Error),

    /// The input path has no usable file name.
    #[error("invalid file path: {0}")]
    InvalidFilePath(String),

    /// Listing the bucket failed.
    #[error("list object versions: {0}")]
    ListObjectVersions(#[source] S3ClientError),

    /// The listing did not fit in a single page. Proceeding on a partial
    /// view would delete objects the run never saw.
    #[error("list object versions: listing is truncated, bucket exceeds one page")]
    TruncatedListing,

    /// Uploading the sidecar digest failed.
    #[error("put object hash: {0}")]
    PutObjectHash(#[source] S3ClientError),

    /// Uploading the backup object failed.
    #[error("put object: {0}")]
    PutObject(#[source] S3ClientError),

    /// Extending a lock failed.
    #[error("set retention {key}: {source}")]
    SetRetention {
        key: String,
        #[source]
        source: S3ClientError,
    },

    /// The batch delete request itself failed.
    #[error("delete objects: {0}")]
    DeleteObjects(#[source] S3ClientError),
}
