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

//! Minimal S3 client: SigV4 signing plus the four operations needed to
//! maintain a versioned, object-locked backup bucket.

pub mod client;
pub mod error;
mod retry;
pub mod sigv4;
pub mod types;
pub mod xml;

pub use client::{Client, Config};
pub use error::S3ClientError;
pub use types::{
    DeleteError, DeleteMarkerInfo, DeleteObjectsResult, DeletedObject, ListObjectVersionsResult,
    ObjectIdentifier, ObjectLockRetention, RetentionMode, VersionInfo,
};
