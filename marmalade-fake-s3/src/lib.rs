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

//! An in-process fake S3 server for integration tests.
//!
//! Speaks enough of the S3 wire protocol to exercise a real client over
//! HTTP: versioned puts, the versions listing, Object Lock retention with
//! COMPLIANCE enforcement, batch deletion with per-item errors, and
//! SigV4 verification of every incoming request. The clock is movable so
//! tests can let locks expire without sleeping.
//!
//! ```no_run
//! # async fn example() {
//! let fake = marmalade_fake_s3::FakeS3::new("my-bucket", "keyid", "shh");
//! let endpoint = fake.start_server().await;
//! // point a client at `endpoint` with insecure (plain HTTP) addressing
//! # }
//! ```

mod server;
mod sigv4;
mod xml;

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use sigv4::Credentials;

/// Retention applied to a stored version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retention {
    /// `COMPLIANCE` or `GOVERNANCE`.
    pub mode: String,
    pub until: DateTime<Utc>,
}

/// One stored version, delete markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub content: Vec<u8>,
    pub last_modified: DateTime<Utc>,
    pub storage_class: String,
    pub delete_marker: bool,
    pub retention: Option<Retention>,
}

pub(crate) struct BucketState {
    pub(crate) bucket: String,
    pub(crate) credentials: Credentials,
    now: Option<DateTime<Utc>>,
    next_version: u64,
    pub(crate) objects: Vec<ObjectVersion>,
    pub(crate) force_truncated: bool,
}

pub(crate) type SharedState = Arc<Mutex<BucketState>>;

impl BucketState {
    /// The server clock: pinned when a test set it, wall time otherwise.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Version ids are `v1`, `v2`, ... in arrival order, shared between
    /// object versions and delete markers.
    pub(crate) fn next_version_id(&mut self) -> String {
        self.next_version += 1;
        format!("v{}", self.next_version)
    }

    /// Whether `entry` is the newest stored entry for its key.
    pub(crate) fn is_latest(&self, entry: &ObjectVersion) -> bool {
        let sequence = |version_id: &str| -> u64 {
            version_id
                .strip_prefix('v')
                .and_then(|n| n.parse().ok())
                .unwrap_or(0)
        };

        self.objects
            .iter()
            .filter(|o| o.key == entry.key)
            .all(|o| sequence(&o.version_id) <= sequence(&entry.version_id))
    }
}

/// A fake S3 server holding a single bucket in memory.
#[derive(Clone)]
pub struct FakeS3 {
    state: SharedState,
}

impl FakeS3 {
    /// Creates a fake bucket. Requests must be signed with the given key
    /// pair or they are rejected with 403.
    pub fn new(bucket: &str, key_id: &str, key_secret: &str) -> Self {
        FakeS3 {
            state: Arc::new(Mutex::new(BucketState {
                bucket: bucket.to_string(),
                credentials: Credentials {
                    key_id: key_id.to_string(),
                    key_secret: key_secret.to_string(),
                },
                now: None,
                next_version: 0,
                objects: Vec::new(),
                force_truncated: false,
            })),
        }
    }

    /// Binds to an ephemeral local port and serves in the background.
    /// Returns the endpoint as `host:port`.
    pub async fn start_server(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake s3 listener");
        let addr = listener.local_addr().expect("fake s3 local addr");

        let app = server::router(self.state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake s3");
        });

        addr.to_string()
    }

    /// Pins the server clock, used for lock enforcement and timestamps.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.lock().now = Some(now);
    }

    /// Every listing response will claim it is truncated. Lets tests
    /// exercise the more-than-one-page path without hundreds of objects.
    pub fn set_force_truncated(&self, force: bool) {
        self.lock().force_truncated = force;
    }

    /// Drops all stored versions and resets the version counter.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.objects.clear();
        state.next_version = 0;
    }

    /// All stored versions of `key` in arrival order, delete markers
    /// included.
    pub fn get_versions(&self, key: &str) -> Vec<ObjectVersion> {
        self.lock()
            .objects
            .iter()
            .filter(|o| o.key == key)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BucketState> {
        self.state.lock().expect("fake s3 state poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ids_are_sequential() {
        let fake = FakeS3::new("b", "k", "s");
        let mut state = fake.lock();
        assert_eq!(state.next_version_id(), "v1");
        assert_eq!(state.next_version_id(), "v2");
    }

    #[test]
    fn test_is_latest() {
        let fake = FakeS3::new("b", "k", "s");
        {
            let mut state = fake.lock();
            for version_id in ["v1", "v2"] {
                state.objects.push(ObjectVersion {
                    key: "a.txt".to_string(),
                    version_id: version_id.to_string(),
                    content: Vec::new(),
                    last_modified: Utc::now(),
                    storage_class: "STANDARD".to_string(),
                    delete_marker: false,
                    retention: None,
                });
            }
        }

        let versions = fake.get_versions("a.txt");
        let state = fake.lock();
        assert!(!state.is_latest(&versions[0]));
        assert!(state.is_latest(&versions[1]));
    }
}
